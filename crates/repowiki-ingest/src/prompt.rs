//! Prompt templates for file and folder summaries.

use crate::schema::{format_instructions, FileSchema, FolderSchema};

const FILE_INSTRUCTION: &str = "You are documenting a source code repository for new contributors. \
Read the file below and explain what it does, how it fits into the project and which parts of it matter most. \
Line numbers are given in `# Lines a - b` headers; use them for code block references. \
Do not describe the headers themselves.";

const FOLDER_INSTRUCTION: &str = "You are documenting a source code repository for new contributors. \
Below are summaries of the files and subfolders of one folder. \
Combine them into a description of the folder: its purpose, its main components and how they relate. \
Mention the most important files by name.";

/// Repository coordinates included in every prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoContext {
    pub owner: String,
    pub repo: String,
    pub commit_sha: String,
}

impl RepoContext {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        commit_sha: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            commit_sha: commit_sha.into(),
        }
    }
}

/// Prompt for one file; `code` is the line-annotated content.
pub fn file_prompt(ctx: &RepoContext, path: &str, code: &str) -> String {
    format!(
        "The following instruction is given:\n{}\n{}\n\
         The given repository owner is {} with repository name of {}\n\
         The commit SHA referenced is {}\n\
         The path of the file is {}\n\
         Below is the code for your task: {}",
        FILE_INSTRUCTION,
        format_instructions::<FileSchema>(),
        ctx.owner,
        ctx.repo,
        ctx.commit_sha,
        path,
        code
    )
}

/// Prompt for one folder; `summaries` is the concatenation of rendered units.
pub fn folder_prompt(ctx: &RepoContext, path: &str, summaries: &str) -> String {
    format!(
        "The following instruction is given:\n{}\n{}\n\
         The given repository owner is {} with repository name of {}\n\
         The commit SHA referenced is {}\n\
         The path of the folder is {}\n\
         Below are the summaries for the codebase:\n{}",
        FOLDER_INSTRUCTION,
        format_instructions::<FolderSchema>(),
        ctx.owner,
        ctx.repo,
        ctx.commit_sha,
        display_path(path),
        summaries
    )
}

/// Repository-relative path as shown to readers (`/` for the root).
pub(crate) fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_prompt_layout() {
        let ctx = RepoContext::new("octo", "wiki", "abc123");
        let prompt = file_prompt(&ctx, "src/main.rs", "# Lines 1 - 1\nfn main() {}\n\n");

        let instruction = prompt.find(FILE_INSTRUCTION).unwrap();
        let format = prompt.find("JSON schema").unwrap();
        let repo = prompt.find("owner is octo with repository name of wiki").unwrap();
        let sha = prompt.find("commit SHA referenced is abc123").unwrap();
        let path = prompt.find("path of the file is src/main.rs").unwrap();
        let code = prompt.find("fn main() {}").unwrap();

        assert!(instruction < format && format < repo && repo < sha && sha < path && path < code);
    }

    #[test]
    fn test_folder_prompt_root_path() {
        let ctx = RepoContext::new("octo", "wiki", "abc123");
        let prompt = folder_prompt(&ctx, "", "Summary of file a.ts:\nA\n\n");
        assert!(prompt.contains("The path of the folder is /\n"));
        assert!(prompt.ends_with("Summary of file a.ts:\nA\n\n"));
    }
}
