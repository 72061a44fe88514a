//! Per-request orchestration: chunk, index, then answer every question.
//!
//! Request lifecycle:
//! `Start -> Chunked -> Indexed -> Answering -> Completed`, with `Failed` reachable from the
//! first two transitions only. Once the index exists, a failing question is recorded as a
//! placeholder answer and the batch carries on.

use super::chunking::split_units;
use super::index::VectorIndex;
use super::retriever::Retriever;
use super::synthesizer::AnswerSynthesizer;
use super::types::{AnswerError, PipelineError, PipelineOutput, TextUnit};
use crate::completion::CompletionClient;
use crate::config::{Config, PipelineSettings};
use crate::embedding::EmbeddingClient;
use futures_util::{StreamExt, stream};
use std::sync::Arc;

/// Stages a request moves through, used for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Text units acquired, nothing processed yet.
    Start,
    /// Units split into chunks.
    Chunked,
    /// Chunks embedded into a vector index.
    Indexed,
    /// Questions being retrieved and answered.
    Answering,
    /// Every question has an outcome.
    Completed,
    /// Request aborted before any answer was produced.
    Failed,
}

/// Answering pipeline shared by all requests. Holds no per-request state.
pub struct Pipeline {
    embedder: Arc<dyn EmbeddingClient>,
    synthesizer: AnswerSynthesizer,
    settings: PipelineSettings,
    dimension: usize,
}

impl Pipeline {
    /// Assemble a pipeline from its collaborators and parameters.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        synthesizer: AnswerSynthesizer,
        settings: PipelineSettings,
        dimension: usize,
    ) -> Self {
        Self {
            embedder,
            synthesizer,
            settings,
            dimension,
        }
    }

    /// Assemble a pipeline using the parameters from `config`.
    pub fn from_config(
        config: &Config,
        embedder: Arc<dyn EmbeddingClient>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        let synthesizer = AnswerSynthesizer::new(
            completion,
            config.completion.max_tokens,
            config.completion.temperature,
        );
        Self::new(
            embedder,
            synthesizer,
            config.pipeline,
            config.embedding.dimension,
        )
    }

    /// Answer `questions` about the document made of `units`.
    ///
    /// Returns exactly one answer per question, in question order, unless the document yields no
    /// chunks or the index cannot be built.
    pub async fn run(
        &self,
        units: Vec<TextUnit>,
        questions: &[String],
    ) -> Result<PipelineOutput, PipelineError> {
        tracing::debug!(stage = ?PipelineStage::Start, units = units.len(), "Pipeline started");

        let chunks = split_units(
            &units,
            self.settings.chunk_size,
            self.settings.chunk_overlap,
        )?;
        if chunks.is_empty() {
            tracing::warn!(stage = ?PipelineStage::Failed, "Document produced no chunks");
            return Err(PipelineError::EmptyDocument);
        }
        let chunk_count = chunks.len();
        tracing::debug!(stage = ?PipelineStage::Chunked, chunks = chunk_count, "Document chunked");

        let index = VectorIndex::build(chunks, self.embedder.as_ref(), self.dimension)
            .await
            .map_err(|error| {
                tracing::error!(stage = ?PipelineStage::Failed, error = %error, "Index build failed");
                PipelineError::Embedding(error)
            })?;
        tracing::debug!(stage = ?PipelineStage::Indexed, entries = index.len(), "Document indexed");

        let retriever = Retriever::new(&index, self.embedder.as_ref());
        tracing::debug!(
            stage = ?PipelineStage::Answering,
            questions = questions.len(),
            concurrency = self.settings.answer_concurrency,
            "Answering questions"
        );

        let mut slots: Vec<Option<String>> = vec![None; questions.len()];
        let mut failed_questions = 0;
        let retriever = &retriever;
        let pending: Vec<_> = questions
            .iter()
            .enumerate()
            .map(|(position, question)| async move {
                (position, self.answer_one(retriever, question).await)
            })
            .collect();
        let mut outcomes =
            stream::iter(pending).buffer_unordered(self.settings.answer_concurrency.max(1));

        while let Some((position, outcome)) = outcomes.next().await {
            let answer = match outcome {
                Ok(answer) => answer,
                Err(error) => {
                    failed_questions += 1;
                    tracing::warn!(question_index = position, error = %error, "Question failed");
                    error_answer(&error)
                }
            };
            slots[position] = Some(answer);
        }

        let answers: Vec<String> = slots.into_iter().map(Option::unwrap_or_default).collect();
        tracing::info!(
            stage = ?PipelineStage::Completed,
            chunks = chunk_count,
            answers = answers.len(),
            failed = failed_questions,
            "Pipeline completed"
        );

        Ok(PipelineOutput {
            answers,
            chunk_count,
            failed_questions,
        })
    }

    async fn answer_one(
        &self,
        retriever: &Retriever<'_>,
        question: &str,
    ) -> Result<String, AnswerError> {
        let context = retriever.retrieve(question, self.settings.top_k).await?;
        let answer = self.synthesizer.synthesize(question, &context).await?;
        Ok(answer)
    }
}

/// Placeholder recorded for a question whose answer could not be produced.
pub fn error_answer(error: &AnswerError) -> String {
    format!("Error processing question: {error}")
}
