use super::{EmbeddingClient, EmbeddingClientError, http_client, map_transport_error};
use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Embedding client backed by a local Ollama runtime (`/api/embed`).
pub struct OllamaEmbedder {
    http: Client,
    base_url: String,
    model: String,
    batch_size: usize,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    /// Build a client pointed at the configured Ollama base URL.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingClientError> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
            timeout_secs: config.timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url.trim_end_matches('/'))
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .json(&json!({ "model": self.model, "input": inputs }))
            .send()
            .await
            .map_err(|error| map_transport_error(error, &endpoint, self.timeout_secs))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(EmbeddingClientError::Unavailable(format!(
                "Ollama endpoint {endpoint} returned 404"
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "Ollama embedding request failed");
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Ollama returned {status}"
            )));
        }

        let body: OllamaEmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if body.embeddings.len() != inputs.len() {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "Ollama returned {} embeddings for {} inputs",
                body.embeddings.len(),
                inputs.len()
            )));
        }
        Ok(body.embeddings)
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedder {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingProvider;
    use httpmock::{Method::POST, MockServer};

    fn config(base_url: String) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: EmbeddingProvider::Ollama,
            base_url,
            api_key: None,
            model: "nomic-embed-text".into(),
            dimension: 2,
            batch_size: 16,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn returns_vectors_from_embed_endpoint() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .body_contains("nomic-embed-text");
                then.status(200).json_body(json!({
                    "embeddings": [[0.5, 0.5], [1.0, 0.0]]
                }));
            })
            .await;

        let client = OllamaEmbedder::new(&config(server.base_url())).expect("client");
        let vectors = client
            .generate_embeddings(vec!["one".into(), "two".into()])
            .await
            .expect("embeddings");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![0.5, 0.5], vec![1.0, 0.0]]);
    }

    #[tokio::test]
    async fn missing_endpoint_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(404);
            })
            .await;

        let client = OllamaEmbedder::new(&config(server.base_url())).expect("client");
        let error = client
            .generate_embeddings(vec!["one".into()])
            .await
            .unwrap_err();
        assert!(matches!(error, EmbeddingClientError::Unavailable(_)));
    }
}
