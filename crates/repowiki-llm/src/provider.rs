//! Provider abstraction and selection.

use crate::error::{LlmError, LlmResult};
use crate::ollama::OllamaClient;
use crate::openai::OpenAiClient;
use crate::types::HistoryItem;
use async_trait::async_trait;
use repowiki_config::{LlmConfig, LlmProviderKind};
use std::sync::Arc;
use tracing::info;

/// A chat model that turns a prompt into a text completion.
///
/// Implementations perform a single request; retrying is left to callers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn run(&self, prompt: &str, history: &[HistoryItem]) -> LlmResult<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Build the provider selected by `[llm] provider`.
pub fn provider_from_config(config: &LlmConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    if config.model.trim().is_empty() {
        return Err(LlmError::InvalidConfig("llm.model is not set".to_string()));
    }

    info!(
        "Using {} provider with model {}",
        config.provider.as_str(),
        config.model
    );

    let provider: Arc<dyn LlmProvider> = match config.provider {
        LlmProviderKind::Ollama => Arc::new(OllamaClient::from_config(config)?),
        LlmProviderKind::OpenAi => Arc::new(OpenAiClient::from_config(config)?),
    };

    Ok(provider)
}
