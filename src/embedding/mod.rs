//! Embedding client abstraction and adapters.
//!
//! The pipeline only ever sees [`EmbeddingClient`]; which backend sits behind it is decided once
//! from [`EmbeddingConfig`]. Every HTTP backend applies the configured request timeout so a
//! stalled provider cannot hang a request.

mod hashed;
mod ollama;
mod openai;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use hashed::HashingEmbedder;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Client could not be constructed from configuration.
    #[error("Embedding client misconfigured: {0}")]
    Misconfigured(String),
    /// Provider could not be reached.
    #[error("Embedding provider unavailable: {0}")]
    Unavailable(String),
    /// Provider did not answer within the configured timeout.
    #[error("Embedding request timed out after {0}s")]
    Timeout(u64),
    /// Provider answered with a non-success status.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider response could not be decoded.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector per supplied text, in input order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Build the embedding client selected by the configuration.
pub fn build_embedding_client(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
    tracing::debug!(
        provider = ?config.provider,
        model = %config.model,
        dimension = config.dimension,
        "Building embedding client"
    );
    let client: Arc<dyn EmbeddingClient> = match config.provider {
        EmbeddingProvider::OpenAI => Arc::new(OpenAiEmbedder::new(config)?),
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbedder::new(config)?),
        EmbeddingProvider::Hashed => Arc::new(HashingEmbedder::new(config.dimension)),
    };
    Ok(client)
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, EmbeddingClientError> {
    reqwest::Client::builder()
        .user_agent("docqa/embeddings")
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|error| EmbeddingClientError::Misconfigured(error.to_string()))
}

pub(crate) fn map_transport_error(
    error: reqwest::Error,
    endpoint: &str,
    timeout_secs: u64,
) -> EmbeddingClientError {
    if error.is_timeout() {
        EmbeddingClientError::Timeout(timeout_secs)
    } else {
        EmbeddingClientError::Unavailable(format!("failed to reach {endpoint}: {error}"))
    }
}
