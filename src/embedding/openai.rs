//! OpenAI-compatible `/embeddings` client.

use super::{EmbeddingClient, EmbeddingClientError, http_client, map_transport_error};
use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Embeddings client that talks to OpenAI-compatible endpoints.
pub struct OpenAiEmbedder {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    batch_size: usize,
    timeout_secs: u64,
}

impl OpenAiEmbedder {
    /// Build a client from configuration. An API key is mandatory.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingClientError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                EmbeddingClientError::Misconfigured("missing EMBEDDING_API_KEY".to_string())
            })?;
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
            timeout_secs: config.timeout_secs,
        })
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&request)
            .send()
            .await
            .map_err(|error| map_transport_error(error, &self.endpoint, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "Embedding provider returned an error");
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "provider returned {status}"
            )));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!("failed to decode response: {error}"))
        })?;
        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != inputs.len() {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "provider returned {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }
        Ok(parsed
            .data
            .into_iter()
            .map(|entry| entry.embedding)
            .collect())
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedder {
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

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingProvider;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;
    use std::time::Duration;

    fn config(base_url: String, batch_size: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: EmbeddingProvider::OpenAI,
            base_url,
            api_key: Some("sk-test".into()),
            model: "text-embedding-3-small".into(),
            dimension: 3,
            batch_size,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn batches_requests_and_restores_index_order() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embeddings")
                    .header("authorization", "Bearer sk-test")
                    .body_contains("\"alpha\"");
                then.status(200).json_body(json!({
                    "data": [
                        { "index": 1, "embedding": [0.0, 1.0, 0.0] },
                        { "index": 0, "embedding": [1.0, 0.0, 0.0] }
                    ]
                }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings").body_contains("\"gamma\"");
                then.status(200).json_body(json!({
                    "data": [ { "index": 0, "embedding": [0.0, 0.0, 1.0] } ]
                }));
            })
            .await;

        let client = OpenAiEmbedder::new(&config(server.base_url(), 2)).expect("client");
        let vectors = client
            .generate_embeddings(vec!["alpha".into(), "beta".into(), "gamma".into()])
            .await
            .expect("embeddings");

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(
            vectors,
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0]
            ]
        );
    }

    #[tokio::test]
    async fn error_status_becomes_generation_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(503).body("overloaded");
            })
            .await;

        let client = OpenAiEmbedder::new(&config(server.base_url(), 8)).expect("client");
        let error = client
            .generate_embeddings(vec!["alpha".into()])
            .await
            .unwrap_err();
        assert!(
            matches!(error, EmbeddingClientError::GenerationFailed(ref message) if message.contains("503"))
        );
    }

    #[tokio::test]
    async fn count_mismatch_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        let client = OpenAiEmbedder::new(&config(server.base_url(), 8)).expect("client");
        let error = client
            .generate_embeddings(vec!["alpha".into()])
            .await
            .unwrap_err();
        assert!(matches!(error, EmbeddingClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .json_body(json!({ "data": [] }));
            })
            .await;

        let mut settings = config(server.base_url(), 8);
        settings.timeout_secs = 1;
        let client = OpenAiEmbedder::new(&settings).expect("client");
        let error = client
            .generate_embeddings(vec!["alpha".into()])
            .await
            .unwrap_err();
        assert!(matches!(error, EmbeddingClientError::Timeout(1)));
    }

    #[test]
    fn api_key_is_required() {
        let mut settings = config("http://localhost".into(), 8);
        settings.api_key = None;
        assert!(matches!(
            OpenAiEmbedder::new(&settings),
            Err(EmbeddingClientError::Misconfigured(_))
        ));
    }
}
