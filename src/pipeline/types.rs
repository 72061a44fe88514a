//! Core data types and error definitions for the answering pipeline.

use crate::completion::CompletionClientError;
use crate::embedding::EmbeddingClientError;
use std::sync::Arc;
use thiserror::Error;

/// One logical unit of a source document, e.g. a PDF page or a whole text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit {
    /// Extracted text.
    pub text: String,
    /// Where the text came from (URL or file name).
    pub source: String,
}

impl TextUnit {
    /// Create a unit from text and a source label.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}

/// Bounded text segment derived from a [`TextUnit`], the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text, at most the configured chunk size in characters.
    pub text: String,
    /// Position of the originating unit in the request's unit list.
    pub unit_index: usize,
    /// Source label of the originating unit.
    pub source: Arc<str>,
    /// Position of this chunk within its unit, starting at zero.
    pub sequence: usize,
}

/// A retrieved chunk together with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// Cosine similarity between the query and the chunk vector.
    pub score: f32,
    /// Retrieved chunk.
    pub chunk: Chunk,
}

/// Chunks retrieved for one question, most similar first.
pub type RetrievalResult = Vec<ScoredChunk>;

/// Errors produced while splitting text into chunks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// Chunk size of zero can never be satisfied.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for new content in every chunk.
    #[error("chunk overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidOverlap {
        /// Requested overlap.
        overlap: usize,
        /// Requested chunk size.
        chunk_size: usize,
    },
}

/// Errors produced while building or querying the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Embedding provider failed.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned vectors that cannot be used.
    #[error("Malformed embedding output: {0}")]
    MalformedEmbedding(String),
    /// Vector dimension does not match the index.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the index vectors.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
    /// Query issued against an index holding no entries.
    #[error("Vector index is empty")]
    EmptyIndex,
}

/// Failure to answer one question. Recovered locally by the orchestrator.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// Question could not be embedded or matched against the index.
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] IndexError),
    /// Completion provider failed.
    #[error("{0}")]
    Completion(#[from] CompletionClientError),
}

/// Request-fatal pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Chunking parameters are invalid.
    #[error("Invalid chunking parameters: {0}")]
    Chunking(#[from] ChunkingError),
    /// Document produced no chunks.
    #[error("No valid documents to process")]
    EmptyDocument,
    /// Index build failed; no answers can be produced.
    #[error("Failed to index document: {0}")]
    Embedding(#[source] IndexError),
}

/// Result of a completed pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// One answer per question, in question order.
    pub answers: Vec<String>,
    /// Number of chunks indexed for the document.
    pub chunk_count: usize,
    /// Number of answers that are error placeholders.
    pub failed_questions: usize,
}
