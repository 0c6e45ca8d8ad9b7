//! Chunking helpers for the notes summarizer.
//!
//! Two strategies are available:
//!
//! - Characters (default): fixed-size, contiguous, non-overlapping slices counted in Unicode
//!   scalar values. The slices concatenate back to the exact input.
//! - Tokens: semantic segments from `semchunk-rs`, bounded by a `tiktoken-rs` token budget, with
//!   an optional sliding token overlap so that ideas spanning a boundary appear in both chunks.
//!   When the configured encoding is unknown the counter falls back to whitespace tokens.

use crate::config::{ChunkStrategy, SummarizerSettings};
use anyhow::Error as TokenizerError;
use semchunk_rs::Chunker;
use std::sync::Arc;
use tiktoken_rs::{CoreBPE, cl100k_base, o200k_base, p50k_base, p50k_edit, r50k_base};

use super::types::ChunkingError;

type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Split `text` according to the configured strategy.
///
/// Returns an empty vector for empty input.
pub(crate) fn chunk_document(
    text: &str,
    settings: &SummarizerSettings,
) -> Result<Vec<String>, ChunkingError> {
    match settings.strategy {
        ChunkStrategy::Characters => Ok(chunk_by_chars(text, settings.chunk_size)?
            .into_iter()
            .map(str::to_string)
            .collect()),
        ChunkStrategy::Tokens => {
            if settings.chunk_size == 0 {
                return Err(ChunkingError::InvalidChunkSize);
            }
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }
            let counter = build_token_counter(&settings.tokenizer);
            Ok(chunk_by_tokens(
                text,
                settings.chunk_size,
                settings.chunk_overlap,
                counter,
            ))
        }
    }
}

/// Partition `text` into `ceil(len / chunk_size)` slices of `chunk_size` characters.
///
/// Every slice but the last holds exactly `chunk_size` characters and the slices borrow from
/// `text`, so joining them reproduces the input byte for byte.
pub fn chunk_by_chars(text: &str, chunk_size: usize) -> Result<Vec<&str>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (offset, _) in text.char_indices() {
        if count == chunk_size {
            chunks.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }

    Ok(chunks)
}

/// Build a token counter for the given tiktoken encoding name.
///
/// Unknown or broken encodings fall back to a whitespace counter; the fallback is logged at
/// `warn` so summaries keep flowing.
fn build_token_counter(encoding: &str) -> TokenCounter {
    match build_tiktoken_counter(encoding) {
        Ok(counter) => counter,
        Err(error) => {
            tracing::warn!(
                encoding,
                error = %error,
                "Tokenizer unavailable; falling back to whitespace counter"
            );
            default_token_counter()
        }
    }
}

fn build_tiktoken_counter(encoding: &str) -> Result<TokenCounter, ChunkingError> {
    let name = encoding.trim();
    let bpe = encoding_from_name(name)
        .ok_or_else(|| ChunkingError::Tokenizer {
            encoding: name.to_string(),
            source: anyhow::anyhow!("unknown encoding"),
        })?
        .map_err(|source| ChunkingError::Tokenizer {
            encoding: name.to_string(),
            source,
        })?;
    let bpe = Arc::new(bpe);

    Ok(Arc::new(move |segment: &str| {
        bpe.encode_ordinary(segment).len()
    }))
}

fn encoding_from_name(name: &str) -> Option<Result<CoreBPE, TokenizerError>> {
    match name {
        "cl100k_base" => Some(cl100k_base()),
        "o200k_base" => Some(o200k_base()),
        "p50k_base" => Some(p50k_base()),
        "p50k_edit" => Some(p50k_edit()),
        "r50k_base" | "gpt2" => Some(r50k_base()),
        _ => None,
    }
}

fn default_token_counter() -> TokenCounter {
    Arc::new(|segment: &str| {
        let tokens = segment.split_whitespace().count();
        if tokens == 0 && !segment.is_empty() {
            1
        } else {
            tokens
        }
    })
}

fn chunk_by_tokens(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    token_counter: TokenCounter,
) -> Vec<String> {
    let counter_for_chunker = token_counter.clone();
    let chunker = Chunker::new(
        chunk_size,
        Box::new(move |segment: &str| counter_for_chunker.as_ref()(segment)),
    );
    let base_chunks = chunker.chunk(text);
    apply_overlap(base_chunks, chunk_size, overlap, &token_counter)
}

/// Prefix each chunk with the token-limited tail of its predecessor.
///
/// The overlapped chunk never exceeds `chunk_size`; excess is trimmed from the front.
fn apply_overlap(
    chunks: Vec<String>,
    chunk_size: usize,
    overlap: usize,
    token_counter: &TokenCounter,
) -> Vec<String> {
    let effective_overlap = overlap.min(chunk_size.saturating_sub(1));
    if chunks.len() < 2 || effective_overlap == 0 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut previous: Option<String> = None;
    for current in chunks {
        match previous.as_deref() {
            Some(prior) => overlapped.push(build_overlapped_chunk(
                prior,
                &current,
                effective_overlap,
                chunk_size,
                token_counter,
            )),
            None => overlapped.push(current.clone()),
        }
        previous = Some(current);
    }

    overlapped
}

fn build_overlapped_chunk(
    previous: &str,
    current: &str,
    overlap: usize,
    chunk_size: usize,
    token_counter: &TokenCounter,
) -> String {
    let tail = longest_suffix_within(previous, overlap, token_counter);
    let mut combined = String::with_capacity(tail.len() + current.len() + 1);

    if !tail.is_empty() {
        combined.push_str(tail);
        if !ends_with_whitespace(tail) && !starts_with_whitespace(current) {
            combined.push(' ');
        }
    }

    combined.push_str(current);
    longest_suffix_within(&combined, chunk_size, token_counter).to_string()
}

/// Longest whitespace-trimmed suffix of `text` whose token count fits `budget`.
fn longest_suffix_within<'a>(text: &'a str, budget: usize, token_counter: &TokenCounter) -> &'a str {
    if budget == 0 {
        return "";
    }

    for (start, _) in text.char_indices() {
        let candidate = text[start..].trim_start();
        if token_counter.as_ref()(candidate) <= budget {
            return candidate;
        }
    }

    ""
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_whitespace)
}

fn ends_with_whitespace(text: &str) -> bool {
    text.chars().next_back().is_some_and(char::is_whitespace)
}
