//! OpenAI-compatible chat-completions adapter (Groq, OpenAI).

use super::{
    CompletionClient, CompletionClientError, CompletionRequest, http_client, map_transport_error,
    usable_text,
};
use crate::config::CompletionConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Chat-completions client for Groq, OpenAI and other compatible servers.
pub struct ChatCompletionClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl ChatCompletionClient {
    /// Build a client from configuration. An API key is mandatory.
    pub fn new(config: &CompletionConfig) -> Result<Self, CompletionClientError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                CompletionClientError::Misconfigured("missing completion API key".to_string())
            })?;
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<Option<String>, CompletionClientError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|error| map_transport_error(error, &self.endpoint, self.timeout_secs))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %text, "Chat completion request failed");
            return Err(CompletionClientError::GenerationFailed(format!(
                "provider returned {status}"
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|error| {
            CompletionClientError::InvalidResponse(format!(
                "failed to decode chat response: {error}"
            ))
        })?;

        Ok(usable_text(
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content),
        ))
    }
}
