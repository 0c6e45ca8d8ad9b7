//! HTTP surface for the AI Tutor.
//!
//! The router serves five HTML pages behind a shared sidebar layout, plus two JSON/plain
//! endpoints for operators:
//!
//! - `GET /` and `POST /profile` – Home page with the student dashboard form.
//! - `GET /chat` and `POST /chat` – Chatbot transcript and one turn per submission.
//! - `GET /summarizer`, `POST /summarizer/upload`, `POST /summarizer/summarize` – Upload notes,
//!   preview the extracted text, then generate a chunked summary.
//! - `GET /quiz` – Embedded external quiz form. It stores nothing, so it opens no session.
//! - `GET /resources` and `POST /resources` – Saved book and paper links.
//! - `GET /metrics` – Usage counters.
//! - `GET /health` – Liveness probe.
//!
//! Every stateful page handler receives the visitor's [`crate::session::Session`] through the
//! [`ActiveSession`] extractor. Model failures are rendered inline on the page that triggered
//! them; only template failures become HTTP 500.

mod pages;
mod render;
mod session;

pub use render::Renderer;
pub use session::{ActiveSession, SESSION_COOKIE};

use crate::{
    chat::ChatClient, metrics::UsageMetrics, processing::SummarizerApi, session::SessionStore,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;

/// Largest accepted request body, sized for PDF uploads.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Live visitor sessions.
    pub sessions: Arc<SessionStore>,
    /// Chatbot backend.
    pub chat: Arc<dyn ChatClient>,
    /// Notes summarization pipeline.
    pub summarizer: Arc<dyn SummarizerApi>,
    /// Usage counters.
    pub metrics: Arc<UsageMetrics>,
    /// HTML template renderer.
    pub renderer: Arc<Renderer>,
    /// Quiz form embedded on the quiz page.
    pub quiz_form_url: Arc<str>,
}

impl AppState {
    /// Assemble the router state with a fresh session store and compiled templates.
    pub fn new(
        chat: Arc<dyn ChatClient>,
        summarizer: Arc<dyn SummarizerApi>,
        metrics: Arc<UsageMetrics>,
        quiz_form_url: impl Into<String>,
    ) -> Result<Self, minijinja::Error> {
        Ok(Self {
            sessions: Arc::new(SessionStore::new()),
            chat,
            summarizer,
            metrics,
            renderer: Arc::new(Renderer::new()?),
            quiz_form_url: Arc::from(quiz_form_url.into()),
        })
    }

    /// End visitor sessions after `timeout` without a request.
    pub fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.sessions = Arc::new(SessionStore::with_idle_timeout(timeout));
        self
    }
}

/// Build the HTTP router serving the tutor pages.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/profile", post(pages::save_profile))
        .route("/chat", get(pages::chat).post(pages::send_chat))
        .route("/summarizer", get(pages::summarizer))
        .route("/summarizer/upload", post(pages::upload_notes))
        .route("/summarizer/summarize", post(pages::summarize_notes))
        .route("/quiz", get(pages::quiz))
        .route(
            "/resources",
            get(pages::resources).post(pages::save_resources),
        )
        .route("/metrics", get(pages::metrics))
        .route("/health", get(pages::health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Failure that prevents a page from rendering at all.
pub(crate) struct AppError(minijinja::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Failed to render page");
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

impl From<minijinja::Error> for AppError {
    fn from(inner: minijinja::Error) -> Self {
        Self(inner)
    }
}
