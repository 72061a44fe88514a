//! Grounded answer generation from retrieved chunks.

use super::types::ScoredChunk;
use crate::completion::{CompletionClient, CompletionClientError, CompletionRequest};
use std::sync::Arc;

/// Answer returned when the provider succeeds without producing any text.
pub const NO_ANSWER: &str = "No answer generated.";

const INSTRUCTION: &str = "You are a helpful assistant that answers questions based on the provided context.\n\
Use only the context below to answer the question accurately and concisely. \
If the context does not contain the answer, say that it is not covered.";

const CLOSING: &str = "Provide a clear and helpful answer based on the context provided.";

/// Turns a question plus its retrieved context into a prompt and asks the completion service.
pub struct AnswerSynthesizer {
    completion: Arc<dyn CompletionClient>,
    max_tokens: usize,
    temperature: f32,
}

impl AnswerSynthesizer {
    /// Build a synthesizer with fixed output bound and sampling temperature.
    pub fn new(completion: Arc<dyn CompletionClient>, max_tokens: usize, temperature: f32) -> Self {
        Self {
            completion,
            max_tokens,
            temperature,
        }
    }

    /// Generate the answer for `question` grounded in `context`.
    pub async fn synthesize(
        &self,
        question: &str,
        context: &[ScoredChunk],
    ) -> Result<String, CompletionClientError> {
        let request = CompletionRequest {
            prompt: build_prompt(question, context),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let answer = self.completion.complete(request).await?;
        Ok(answer.unwrap_or_else(|| NO_ANSWER.to_string()))
    }
}

/// Assemble the grounding prompt: instruction, chunk texts in retrieval order, then the question.
pub fn build_prompt(question: &str, context: &[ScoredChunk]) -> String {
    let context_text = context
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{INSTRUCTION}\n\n<context>\n{context_text}\n</context>\n\nQuestion: {question}\n\n{CLOSING}"
    )
}
