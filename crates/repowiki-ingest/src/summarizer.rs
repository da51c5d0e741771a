//! Structured summarization of files and folders.

use crate::code_splitter::CodeSplitter;
use crate::prompt::{file_prompt, folder_prompt, RepoContext};
use crate::schema::{parse_response, FileSchema, FolderSchema, StructuredOutput};
use repowiki_core::SummaryUnit;
use repowiki_llm::{LlmError, LlmProvider};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why a single summarization attempt produced nothing.
#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Nothing to summarize")]
    EmptyInput,

    #[error("Response does not match the schema: {0}")]
    SchemaValidation(String),

    #[error("LLM provider failed: {0}")]
    Provider(#[from] LlmError),
}

/// Builds prompts, calls the model and validates its answers.
#[derive(Clone)]
pub struct Summarizer {
    provider: Arc<dyn LlmProvider>,
    splitter: CodeSplitter,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            splitter: CodeSplitter::default(),
        }
    }

    /// Summarize one file from its (possibly truncated) content.
    pub async fn summarize_file(
        &self,
        ctx: &RepoContext,
        path: &str,
        content: &str,
    ) -> Result<FileSchema, SummaryError> {
        if content.trim().is_empty() {
            return Err(SummaryError::EmptyInput);
        }

        let code = self.splitter.annotate(path, content);
        self.generate(&file_prompt(ctx, path, &code)).await
    }

    /// Summarize one folder from the summaries of its children.
    pub async fn summarize_folder(
        &self,
        ctx: &RepoContext,
        path: &str,
        units: &[SummaryUnit],
    ) -> Result<FolderSchema, SummaryError> {
        if units.is_empty() {
            return Err(SummaryError::EmptyInput);
        }

        let summaries: String = units.iter().map(SummaryUnit::render).collect();
        self.generate(&folder_prompt(ctx, path, &summaries)).await
    }

    async fn generate<T: StructuredOutput>(&self, prompt: &str) -> Result<T, SummaryError> {
        debug!(
            "Sending {} prompt chars to {}",
            prompt.chars().count(),
            self.provider.model()
        );
        let response = self.provider.run(prompt, &[]).await?;
        parse_response(&response).map_err(SummaryError::SchemaValidation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedProvider, VALID_RESPONSE};

    fn ctx() -> RepoContext {
        RepoContext::new("octo", "wiki", "abc123")
    }

    #[tokio::test]
    async fn test_summarize_file() {
        let provider = ScriptedProvider::always(VALID_RESPONSE);
        let summarizer = Summarizer::new(provider.clone());

        let result = summarizer
            .summarize_file(&ctx(), "src/a.ts", "export const a = 1;")
            .await
            .unwrap();
        assert_eq!(result.usage, "Testing");

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("# Lines 1 - 1\nexport const a = 1;"));
    }

    #[tokio::test]
    async fn test_summarize_folder_renders_units_in_order() {
        let provider = ScriptedProvider::always(VALID_RESPONSE);
        let summarizer = Summarizer::new(provider.clone());
        let units = vec![SummaryUnit::file("a.ts", "A"), SummaryUnit::folder("lib", "L")];

        summarizer.summarize_folder(&ctx(), "", &units).await.unwrap();

        let prompt = &provider.prompts()[0];
        assert!(prompt.ends_with("Summary of file a.ts:\nA\n\nSummary of folder lib:\nL\n\n"));
    }

    #[tokio::test]
    async fn test_empty_input_skips_provider() {
        let provider = ScriptedProvider::always(VALID_RESPONSE);
        let summarizer = Summarizer::new(provider.clone());

        let file = summarizer.summarize_file(&ctx(), "a.ts", "  \n").await;
        assert!(matches!(file, Err(SummaryError::EmptyInput)));

        let folder = summarizer.summarize_folder(&ctx(), "", &[]).await;
        assert!(matches!(folder, Err(SummaryError::EmptyInput)));

        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_error_kinds() {
        let summarizer = Summarizer::new(ScriptedProvider::always("I cannot help with that."));
        let result = summarizer.summarize_file(&ctx(), "a.ts", "x").await;
        assert!(matches!(result, Err(SummaryError::SchemaValidation(_))));

        let summarizer = Summarizer::new(ScriptedProvider::failing());
        let result = summarizer.summarize_file(&ctx(), "a.ts", "x").await;
        assert!(matches!(result, Err(SummaryError::Provider(_))));
    }
}
