//! Core domain types for Repowiki.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for persisted rows.
pub type RecordId = String;

/// Generate a new unique ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Last segment of a slash-separated repository path (`""` for the root).
pub fn path_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// A request to build the documentation tree of one repository.
///
/// Identity is the `(owner, repo)` pair; `enqueued_at` is informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionJob {
    pub owner: String,
    pub repo: String,
    pub enqueued_at: DateTime<Utc>,
}

impl IngestionJob {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            enqueued_at: Utc::now(),
        }
    }

    /// Parse an `owner/repo` slug.
    pub fn parse(slug: &str) -> Option<Self> {
        let (owner, repo) = slug.trim().trim_end_matches('/').split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(Self::new(owner, repo))
    }

    /// Whether both jobs target the same repository. GitHub names ignore case.
    pub fn same_repository(&self, other: &IngestionJob) -> bool {
        self.owner.eq_ignore_ascii_case(&other.owner) && self.repo.eq_ignore_ascii_case(&other.repo)
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl std::fmt::Display for IngestionJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A directory of the fetched repository tree.
///
/// `files` hold full repository-relative paths; the root node has an empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    pub path: String,
    pub files: Vec<String>,
    pub subdirectories: Vec<DirectoryNode>,
}

impl DirectoryNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            files: vec![],
            subdirectories: vec![],
        }
    }

    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files.push(path.into());
        self
    }

    pub fn with_subdirectory(mut self, node: DirectoryNode) -> Self {
        self.subdirectories.push(node);
        self
    }

    /// Folder name (last path segment, empty for the root).
    pub fn name(&self) -> &str {
        path_name(&self.path)
    }

    /// Number of files in this node and all of its descendants.
    pub fn total_files(&self) -> usize {
        self.files.len()
            + self
                .subdirectories
                .iter()
                .map(DirectoryNode::total_files)
                .sum::<usize>()
    }
}

/// Repository metadata as reported by the source host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryDetails {
    pub owner: String,
    pub repo: String,
    pub url: String,
    pub language: Option<String>,
    pub description: Option<String>,
    pub stars: i64,
    pub forks: i64,
    pub topics: Vec<String>,
    pub default_branch: String,
    pub commit_sha: String,
    pub commit_at: DateTime<Utc>,
}

/// Remaining request quota of the source host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

/// A stored repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: RecordId,
    pub url: String,
    pub owner: String,
    pub repo: String,
    pub language: Option<String>,
    pub description: Option<String>,
    pub default_branch: String,
    pub stars: i64,
    pub forks: i64,
    pub topics: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl RepositoryRecord {
    pub fn from_details(details: &RepositoryDetails) -> Self {
        Self {
            id: new_id(),
            url: details.url.clone(),
            owner: details.owner.clone(),
            repo: details.repo.clone(),
            language: details.language.clone(),
            description: details.description.clone(),
            default_branch: details.default_branch.clone(),
            stars: details.stars,
            forks: details.forks,
            topics: details.topics.clone(),
            created_at: Utc::now(),
        }
    }
}

/// A stored branch snapshot (one commit of one repository).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRecord {
    pub id: RecordId,
    pub repository_id: RecordId,
    pub name: String,
    pub last_commit_sha: String,
    pub commit_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl BranchRecord {
    pub fn new(
        repository_id: RecordId,
        name: impl Into<String>,
        last_commit_sha: impl Into<String>,
        commit_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            repository_id,
            name: name.into(),
            last_commit_sha: last_commit_sha.into(),
            commit_at,
            created_at: Utc::now(),
        }
    }
}

/// A stored folder. `summary` stays `None` only while its subtree is ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: RecordId,
    pub branch_id: RecordId,
    pub parent_folder_id: Option<RecordId>,
    pub name: String,
    pub path: String,
    pub summary: Option<String>,
    pub usage: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FolderRecord {
    pub fn new(branch_id: RecordId, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: new_id(),
            branch_id,
            parent_folder_id: None,
            name: path_name(&path).to_string(),
            path,
            summary: None,
            usage: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_parent(mut self, parent_folder_id: Option<RecordId>) -> Self {
        self.parent_folder_id = parent_folder_id;
        self
    }
}

/// A stored file. Only ever created with its summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: RecordId,
    pub folder_id: RecordId,
    pub name: String,
    pub path: String,
    pub content: String,
    pub summary: String,
    pub usage: String,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(
        folder_id: RecordId,
        path: impl Into<String>,
        content: impl Into<String>,
        summary: impl Into<String>,
        usage: impl Into<String>,
    ) -> Self {
        let path = path.into();
        Self {
            id: new_id(),
            folder_id,
            name: path_name(&path).to_string(),
            path,
            content: content.into(),
            summary: summary.into(),
            usage: usage.into(),
            created_at: Utc::now(),
        }
    }
}

/// Kind of entity a [`SummaryUnit`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    File,
    Folder,
}

impl SummaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryKind::File => "file",
            SummaryKind::Folder => "folder",
        }
    }
}

impl std::fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A labeled block of generated summary text, fed into the parent's prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryUnit {
    pub kind: SummaryKind,
    pub name: String,
    pub summary: String,
}

impl SummaryUnit {
    pub fn file(name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            kind: SummaryKind::File,
            name: name.into(),
            summary: summary.into(),
        }
    }

    pub fn folder(name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            kind: SummaryKind::Folder,
            name: name.into(),
            summary: summary.into(),
        }
    }

    /// Prompt text of this unit.
    pub fn render(&self) -> String {
        format!("Summary of {} {}:\n{}\n\n", self.kind, self.name, self.summary)
    }

    /// Length of [`render`](Self::render) in characters.
    pub fn char_len(&self) -> usize {
        self.render().chars().count()
    }
}

/// Result of summarizing one folder subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSummary {
    pub path: String,
    pub summary: String,
}

/// Statistics about the database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub total_repositories: i64,
    pub total_branches: i64,
    pub total_folders: i64,
    pub pending_folders: i64,
    pub total_files: i64,
    pub database_size_bytes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_parse() {
        let job = IngestionJob::parse("rust-lang/cargo").unwrap();
        assert_eq!(job.owner, "rust-lang");
        assert_eq!(job.repo, "cargo");
        assert_eq!(job.to_string(), "rust-lang/cargo");

        assert!(IngestionJob::parse("cargo").is_none());
        assert!(IngestionJob::parse("/cargo").is_none());
        assert!(IngestionJob::parse("a/b/c").is_none());
    }

    #[test]
    fn test_job_identity_ignores_timestamp() {
        let a = IngestionJob::new("o", "r");
        let mut b = IngestionJob::new("o", "r");
        b.enqueued_at = a.enqueued_at - chrono::Duration::hours(1);
        assert!(a.same_repository(&b));
        assert!(!a.same_repository(&IngestionJob::new("o", "other")));
    }

    #[test]
    fn test_job_identity_ignores_case() {
        let job = IngestionJob::new("octo", "wiki");
        assert!(job.same_repository(&IngestionJob::new("Octo", "Wiki")));
        assert!(!job.same_repository(&IngestionJob::new("octo", "wikis")));
    }

    #[test]
    fn test_summary_unit_render() {
        let unit = SummaryUnit::file("main.rs", "Entry point.");
        assert_eq!(unit.render(), "Summary of file main.rs:\nEntry point.\n\n");
        assert_eq!(unit.char_len(), unit.render().chars().count());

        let unit = SummaryUnit::folder("lib", "Library code.");
        assert!(unit.render().starts_with("Summary of folder lib:"));
    }

    #[test]
    fn test_directory_node() {
        let tree = DirectoryNode::new("")
            .with_file("a.ts")
            .with_subdirectory(DirectoryNode::new("src/lib").with_file("src/lib/c.ts"));

        assert_eq!(tree.name(), "");
        assert_eq!(tree.subdirectories[0].name(), "lib");
        assert_eq!(tree.total_files(), 2);
    }

    #[test]
    fn test_record_names_from_path() {
        let folder = FolderRecord::new("b".into(), "src/utils");
        assert_eq!(folder.name, "utils");
        assert!(folder.summary.is_none());

        let file = FileRecord::new(folder.id.clone(), "src/utils/io.rs", "", "s", "u");
        assert_eq!(file.name, "io.rs");
    }
}
