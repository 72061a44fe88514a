//! Abstractions for generating answers via language-model providers.
//!
//! Both adapters issue HTTP requests directly with `reqwest` and apply the configured timeout.
//! A provider that answers successfully but without any text yields `Ok(None)`; turning that
//! into a user-facing sentinel is the caller's business.

mod ollama;
mod openai;

use crate::config::{CompletionConfig, CompletionProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use ollama::OllamaCompletionClient;
pub use openai::ChatCompletionClient;

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum CompletionClientError {
    /// Client could not be constructed from configuration.
    #[error("Completion client misconfigured: {0}")]
    Misconfigured(String),
    /// Provider could not be reached.
    #[error("Completion provider unavailable: {0}")]
    Unavailable(String),
    /// Provider did not answer within the configured timeout.
    #[error("Completion request timed out after {0}s")]
    Timeout(u64),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Fully assembled prompt.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Interface implemented by completion providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate text for the prompt. `Ok(None)` means the provider produced no usable text.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<Option<String>, CompletionClientError>;
}

/// Build the completion client selected by the configuration.
pub fn build_completion_client(
    config: &CompletionConfig,
) -> Result<Arc<dyn CompletionClient>, CompletionClientError> {
    tracing::debug!(
        provider = ?config.provider,
        model = %config.model,
        "Building completion client"
    );
    let client: Arc<dyn CompletionClient> = match config.provider {
        CompletionProvider::Groq | CompletionProvider::OpenAI => {
            Arc::new(ChatCompletionClient::new(config)?)
        }
        CompletionProvider::Ollama => Arc::new(OllamaCompletionClient::new(config)?),
    };
    Ok(client)
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, CompletionClientError> {
    reqwest::Client::builder()
        .user_agent("docqa/completion")
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|error| CompletionClientError::Misconfigured(error.to_string()))
}

fn map_transport_error(
    error: reqwest::Error,
    endpoint: &str,
    timeout_secs: u64,
) -> CompletionClientError {
    if error.is_timeout() {
        CompletionClientError::Timeout(timeout_secs)
    } else {
        CompletionClientError::Unavailable(format!("failed to reach {endpoint}: {error}"))
    }
}

fn usable_text(text: Option<String>) -> Option<String> {
    text.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
