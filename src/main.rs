use aitutor::{
    chat, config, logging, metrics::UsageMetrics, processing::SummarizationService,
    summarization, web,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "ai-tutor", about = "Serve the AI Tutor study companion", version)]
struct Cli {
    /// Port to listen on; overrides `SERVER_PORT`.
    #[arg(long)]
    port: Option<u16>,
    /// Append logs to this file instead of `logs/ai-tutor.log`.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Log to stdout only.
    #[arg(long)]
    no_file_log: bool,
    /// Validate configuration and exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&logging::LoggingOptions {
        log_file: cli.log_file.clone(),
        stdout_only: cli.no_file_log,
    });

    let config = match config::load_config() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(error = %error, "Configuration rejected");
            return Err(error).context("failed to load configuration");
        }
    };
    if cli.check_config {
        println!("Configuration OK");
        return Ok(());
    }

    let metrics = Arc::new(UsageMetrics::new());
    let chat_client =
        chat::build_chat_client(&config).context("failed to initialize chat client")?;
    let summarization_client = summarization::build_summarization_client(&config)
        .context("failed to initialize summarization client")?;
    let summarizer = Arc::new(SummarizationService::new(
        summarization_client,
        config.summarizer.clone(),
        metrics.clone(),
    ));

    let state = web::AppState::new(chat_client, summarizer, metrics, config.quiz_form_url.clone())
        .context("failed to compile page templates")?
        .with_session_idle_timeout(config.session_idle_timeout);
    state.sessions.spawn_sweeper();
    let app = web::create_router(state);

    let (listener, port) = bind_listener(cli.port.or(config.server_port))
        .await
        .context("failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn bind_listener(port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 8501..=8599;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 8501-8599",
    ))
}
