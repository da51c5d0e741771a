//! Ollama HTTP client.

use crate::error::{check_status, LlmError, LlmResult};
use crate::provider::LlmProvider;
use crate::types::*;
use async_trait::async_trait;
use repowiki_config::LlmConfig;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Client for Ollama's chat API.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    model: String,
    params: SamplingParams,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new client from configuration.
    pub fn from_config(config: &LlmConfig) -> LlmResult<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            params: SamplingParams::from(config),
            timeout,
        })
    }

    /// Check if the Ollama server is available.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.host);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn chat_request(&self, prompt: &str, history: &[HistoryItem]) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.model.clone(),
            messages: build_messages(prompt, history),
            stream: false,
            options: OllamaOptions::from(self.params),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaClient {
    async fn run(&self, prompt: &str, history: &[HistoryItem]) -> LlmResult<String> {
        let url = format!("{}/api/chat", self.host);
        debug!(
            "Chat with model {} ({} prompt chars)",
            self.model,
            prompt.chars().count()
        );

        let request = self.chat_request(prompt, history);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::from_send(e, &self.host, self.timeout.as_secs()))?;

        let response = check_status(response, &self.model).await?;
        let chat: OllamaChatResponse = response.json().await?;

        chat.message
            .map(|m| m.content)
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
