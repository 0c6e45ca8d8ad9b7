//! Tracing configuration and log routing.
//!
//! The tutor logs to stdout using a compact formatter, and optionally to a file. The file path is
//! taken from `--log-file`, then `AI_TUTOR_LOG_FILE`, and otherwise defaults to
//! `logs/ai-tutor.log`. Model calls can hold a request open for a long time, so the file layer
//! writes through a non‑blocking appender.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "ai-tutor.log";

/// Where and whether to write the file log.
#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Explicit log file path; wins over `AI_TUTOR_LOG_FILE`.
    pub log_file: Option<PathBuf>,
    /// Skip the file layer entirely and log to stdout only.
    pub stdout_only: bool,
}

/// Configure tracing subscribers for stdout and optional file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stdout layer and, unless disabled, a file layer.
/// - Uses a global guard to keep the non‑blocking writer alive for the process lifetime.
pub fn init_tracing(options: &LoggingOptions) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let writer = if options.stdout_only {
        None
    } else {
        configure_file_writer(resolve_log_path(options).as_deref())
    };

    if let Some(writer) = writer {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

fn resolve_log_path(options: &LoggingOptions) -> Option<PathBuf> {
    options.log_file.clone().or_else(|| {
        std::env::var("AI_TUTOR_LOG_FILE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
    })
}

/// Build a non‑blocking writer for file logging.
///
/// Returns `None` when the logs directory cannot be created or the target file cannot be opened.
fn configure_file_writer(path: Option<&Path>) -> Option<NonBlocking> {
    if let Some(path) = path {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                let _ = LOG_GUARD.set(guard);
                Some(non_blocking)
            }
            Err(err) => {
                eprintln!("Failed to open log file {}: {err}", path.display());
                None
            }
        }
    } else {
        if let Err(err) = std::fs::create_dir_all(DEFAULT_LOG_DIR) {
            eprintln!("Failed to create logs directory: {err}");
            return None;
        }
        let file_appender = tracing_appender::rolling::never(DEFAULT_LOG_DIR, DEFAULT_LOG_FILE);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);
        Some(non_blocking)
    }
}
