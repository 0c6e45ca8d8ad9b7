#![deny(missing_docs)]

//! Core library for the AI Tutor study companion.

/// Chatbot backends and conversation transcripts.
pub mod chat;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction for uploaded notes.
pub mod extraction;
mod http;
/// Structured logging and tracing setup.
pub mod logging;
/// Usage counters.
pub mod metrics;
/// Chunk-and-summarize pipeline.
pub mod processing;
/// Per-visitor session state.
pub mod session;
/// Summarization provider clients.
pub mod summarization;
/// HTTP routing and page handlers.
pub mod web;
