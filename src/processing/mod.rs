//! Notes summarization pipeline: chunking, per-chunk summaries, and joining.

pub mod chunking;
mod service;
pub mod types;

pub use service::{SummarizationService, SummarizerApi};
pub use types::{ChunkingError, ProcessingError, SummaryOutcome};
