//! Error types for LLM operations.

use thiserror::Error;

/// Errors that can occur when calling a chat-completion API.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Unable to reach the provider.
    #[error("LLM server is not reachable at {host}")]
    ServerNotRunning { host: String },

    /// Request timeout.
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The requested model is not available.
    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The provider answered without any message content.
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Classify a failed request the way the CLI reports it.
    pub(crate) fn from_send(err: reqwest::Error, host: &str, timeout_secs: u64) -> Self {
        if err.is_connect() {
            LlmError::ServerNotRunning {
                host: host.to_string(),
            }
        } else if err.is_timeout() {
            LlmError::Timeout {
                seconds: timeout_secs,
            }
        } else {
            LlmError::Http(err)
        }
    }
}

/// Turn a non-success response into an error.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
) -> LlmResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    if status.as_u16() == 404 || (text.contains("model") && text.contains("not found")) {
        return Err(LlmError::ModelNotFound {
            model: model.to_string(),
        });
    }

    Err(LlmError::ApiError {
        status: status.as_u16(),
        message: text,
    })
}
