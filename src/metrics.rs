use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing tutor activity since startup.
#[derive(Default)]
pub struct UsageMetrics {
    documents_summarized: AtomicU64,
    chunks_summarized: AtomicU64,
    summarization_failures: AtomicU64,
    chat_turns: AtomicU64,
    chat_failures: AtomicU64,
}

impl UsageMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a summarized document and the number of model calls spent on it.
    pub fn record_summary(&self, model_calls: u64) {
        self.documents_summarized.fetch_add(1, Ordering::Relaxed);
        self.chunks_summarized
            .fetch_add(model_calls, Ordering::Relaxed);
    }

    /// Record a summarization that failed and returned nothing.
    pub fn record_summary_failure(&self) {
        self.summarization_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one answered chat turn.
    pub fn record_chat_turn(&self) {
        self.chat_turns.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one chat turn that could not be answered.
    pub fn record_chat_failure(&self) {
        self.chat_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
            summarization_failures: self.summarization_failures.load(Ordering::Relaxed),
            chat_turns: self.chat_turns.load(Ordering::Relaxed),
            chat_failures: self.chat_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of usage counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents summarized successfully.
    pub documents_summarized: u64,
    /// Chunk-level model calls made by successful summaries.
    pub chunks_summarized: u64,
    /// Summaries that failed.
    pub summarization_failures: u64,
    /// Chat turns answered.
    pub chat_turns: u64,
    /// Chat turns that failed.
    pub chat_failures: u64,
}
