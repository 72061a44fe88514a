#![deny(missing_docs)]

//! Core library for the document Q&A server.

/// Document download, format detection and text extraction.
pub mod acquisition;
/// HTTP routing and REST handlers.
pub mod api;
/// Completion client abstraction and adapters.
pub mod completion;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Answering activity counters.
pub mod metrics;
/// Chunking, indexing, retrieval and answer synthesis.
pub mod pipeline;
/// Service facade used by the HTTP surface.
pub mod service;
