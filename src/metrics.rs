use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing answering activity since startup.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_processed: AtomicU64,
    chunks_indexed: AtomicU64,
    questions_answered: AtomicU64,
    questions_failed: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed request: its chunk count and per-question outcomes.
    pub fn record_request(&self, chunk_count: u64, answered: u64, failed: u64) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
        self.questions_answered
            .fetch_add(answered, Ordering::Relaxed);
        self.questions_failed.fetch_add(failed, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            questions_failed: self.questions_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Requests that reached a built index.
    pub documents_processed: u64,
    /// Total chunks embedded across those requests.
    pub chunks_indexed: u64,
    /// Questions that received a generated answer.
    pub questions_answered: u64,
    /// Questions that received an error placeholder instead.
    pub questions_failed: u64,
}
