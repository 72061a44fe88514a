//! Retrieval-augmented answering over a single document.
//!
//! The modules are layered bottom-up: [`chunking`] turns text units into chunks, [`index`] embeds
//! them into a request-scoped [`VectorIndex`], [`retriever`] finds the closest chunks for a
//! question, [`synthesizer`] asks the completion service for a grounded answer, and
//! [`orchestrator`] drives all of it for a batch of questions.

pub mod chunking;
pub mod index;
pub mod orchestrator;
pub mod retriever;
pub mod synthesizer;
pub mod types;

pub use chunking::{split_text, split_units};
pub use index::VectorIndex;
pub use orchestrator::{Pipeline, PipelineStage, error_answer};
pub use retriever::Retriever;
pub use synthesizer::{AnswerSynthesizer, NO_ANSWER, build_prompt};
pub use types::{
    AnswerError, Chunk, ChunkingError, IndexError, PipelineError, PipelineOutput,
    RetrievalResult, ScoredChunk, TextUnit,
};
