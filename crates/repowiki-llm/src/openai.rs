//! OpenAI-compatible chat completions client.

use crate::error::{check_status, LlmError, LlmResult};
use crate::provider::LlmProvider;
use crate::types::*;
use async_trait::async_trait;
use repowiki_config::LlmConfig;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Client for `/chat/completions` style APIs (OpenAI, DeepSeek, ...).
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    params: SamplingParams,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn from_config(config: &LlmConfig) -> LlmResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LlmError::InvalidConfig("llm.api_key is required for openai".to_string()))?;

        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: config.host.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            params: SamplingParams::from(config),
            timeout,
        })
    }

    fn chat_request(&self, prompt: &str, history: &[HistoryItem]) -> OpenAiChatRequest {
        OpenAiChatRequest {
            model: self.model.clone(),
            messages: build_messages(prompt, history),
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            top_p: self.params.top_p,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn run(&self, prompt: &str, history: &[HistoryItem]) -> LlmResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Chat completion with model {}", self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.chat_request(prompt, history))
            .send()
            .await
            .map_err(|e| LlmError::from_send(e, &self.base_url, self.timeout.as_secs()))?;

        let response = check_status(response, &self.model).await?;
        let completion: OpenAiChatResponse = response.json().await?;

        first_content(completion).ok_or(LlmError::EmptyResponse)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn first_content(completion: OpenAiChatResponse) -> Option<String> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
}
