//! Core data types and error definitions for the summarization pipeline.

use crate::summarization::SummarizationClientError;
use anyhow::Error as TokenizerError;
use thiserror::Error;

/// Errors produced while splitting raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Summarizer configured an impossible chunk budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Tokenizer resources were unavailable for the configured encoding.
    #[error("failed to initialize tokenizer '{encoding}': {source}")]
    Tokenizer {
        /// Encoding we attempted to load.
        encoding: String,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: TokenizerError,
    },
}

/// Errors emitted by the chunk-and-summarize pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The document had no text worth summarizing; the model was not called.
    #[error("no content to summarize")]
    NoContent,
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// A chunk could not be summarized, so the whole document failed.
    #[error("chunk {chunk} of {total} failed: {source}")]
    Summarization {
        /// One-based index of the failing chunk.
        chunk: usize,
        /// Number of chunks in the failing pass.
        total: usize,
        /// Provider error for that chunk.
        #[source]
        source: SummarizationClientError,
    },
}

/// Result of a completed summarization produced by [`crate::processing::SummarizationService::summarize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutcome {
    /// Final summary text.
    pub summary: String,
    /// Number of chunks the source document was split into.
    pub chunk_count: usize,
    /// Number of summarize-and-join passes that ran.
    pub passes: usize,
    /// Total provider calls across every pass.
    pub model_calls: usize,
}
