//! Repowiki LLM - Chat-completion providers for summary generation.
//!
//! The ingestion pipeline only sees the [`LlmProvider`] trait. Two HTTP
//! implementations are shipped: [`OllamaClient`] for a local Ollama server
//! and [`OpenAiClient`] for any OpenAI-compatible endpoint (DeepSeek included).

mod error;
mod ollama;
mod openai;
mod provider;
mod types;

pub use error::{LlmError, LlmResult};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use provider::{provider_from_config, LlmProvider};
pub use types::*;
