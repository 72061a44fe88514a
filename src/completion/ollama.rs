use super::{
    CompletionClient, CompletionClientError, CompletionRequest, http_client, map_transport_error,
    usable_text,
};
use crate::config::CompletionConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Completion client issuing non-streaming `/api/generate` calls to Ollama.
pub struct OllamaCompletionClient {
    http: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaCompletionClient {
    /// Build a client pointed at the configured Ollama base URL.
    pub fn new(config: &CompletionConfig) -> Result<Self, CompletionClientError> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: Option<String>,
    done: bool,
}

#[async_trait]
impl CompletionClient for OllamaCompletionClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<Option<String>, CompletionClientError> {
        let endpoint = self.endpoint();
        let payload = json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            }
        });

        let response = self
            .http
            .post(&endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_transport_error(error, &endpoint, self.timeout_secs))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CompletionClientError::Unavailable(format!(
                "Ollama endpoint {endpoint} returned 404"
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "Ollama completion request failed");
            return Err(CompletionClientError::GenerationFailed(format!(
                "Ollama returned {status}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            CompletionClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(CompletionClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(usable_text(body.response))
    }
}
