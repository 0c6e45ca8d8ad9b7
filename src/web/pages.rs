//! Page handlers. Each one locks the visitor's session, applies the submitted action, and
//! re-renders the page with an inline status message.

use super::render::Flash;
use super::session::{ActiveSession, Page};
use super::{AppError, AppState};
use crate::extraction::{DocumentKind, extract_text_blocking};
use crate::metrics::MetricsSnapshot;
use crate::processing::ProcessingError;
use crate::session::{PendingDocument, Resources, Session, StudentProfile};
use axum::{
    Form, Json,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartError},
    response::Html,
};
use minijinja::context;
use serde::{Deserialize, Serialize};

const PREVIEW_CHARS: usize = 1000;
const EMPTY_DOCUMENT_WARNING: &str =
    "Could not extract text from the file. It might be empty or an image-based PDF.";

#[derive(Deserialize)]
pub(super) struct ProfileForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    enrollment: String,
    #[serde(default)]
    college: String,
    #[serde(default)]
    semester: String,
}

#[derive(Deserialize)]
pub(super) struct ChatForm {
    #[serde(default)]
    prompt: String,
}

#[derive(Deserialize)]
pub(super) struct ResourcesForm {
    #[serde(default)]
    books: String,
    #[serde(default)]
    papers: String,
}

pub(super) async fn home(
    State(state): State<AppState>,
    session: ActiveSession,
) -> Result<Page, AppError> {
    let guard = session.handle.lock().await;
    render_home(&state, &session, &guard, None)
}

pub(super) async fn save_profile(
    State(state): State<AppState>,
    session: ActiveSession,
    Form(form): Form<ProfileForm>,
) -> Result<Page, AppError> {
    let mut guard = session.handle.lock().await;
    guard.profile = Some(StudentProfile {
        name: form.name,
        enrollment: form.enrollment,
        college: form.college,
        semester: form.semester,
    });
    tracing::info!(session = %session.id, "Student details saved");
    render_home(
        &state,
        &session,
        &guard,
        Some(Flash::success("Details saved successfully!")),
    )
}

fn render_home(
    state: &AppState,
    session: &ActiveSession,
    current: &Session,
    flash: Option<Flash>,
) -> Result<Page, AppError> {
    let form = current.profile.clone().unwrap_or_default();
    let profile_json = current.profile.as_ref().map(pretty_json);
    let body = state.renderer.render(
        "home.html",
        context! { active => "home", form, profile_json, flash },
    )?;
    Ok(session.page(body))
}

#[derive(Serialize)]
struct MessageView<'a> {
    role: &'static str,
    text: &'a str,
}

pub(super) async fn chat(
    State(state): State<AppState>,
    session: ActiveSession,
) -> Result<Page, AppError> {
    let guard = session.handle.lock().await;
    render_chat(&state, &session, &guard, None, None)
}

pub(super) async fn send_chat(
    State(state): State<AppState>,
    session: ActiveSession,
    Form(form): Form<ChatForm>,
) -> Result<Page, AppError> {
    let mut guard = session.handle.lock().await;
    let prompt = form.prompt.trim();
    if prompt.is_empty() {
        return render_chat(&state, &session, &guard, None, None);
    }

    match guard.chat.send_message(state.chat.as_ref(), prompt).await {
        Ok(_) => {
            state.metrics.record_chat_turn();
            render_chat(&state, &session, &guard, None, None)
        }
        Err(error) => {
            state.metrics.record_chat_failure();
            tracing::warn!(session = %session.id, error = %error, "Chat turn failed");
            render_chat(
                &state,
                &session,
                &guard,
                Some(prompt),
                Some(Flash::error(format!(
                    "Error: Could not connect to the chat model. {error}"
                ))),
            )
        }
    }
}

fn render_chat(
    state: &AppState,
    session: &ActiveSession,
    current: &Session,
    failed_prompt: Option<&str>,
    flash: Option<Flash>,
) -> Result<Page, AppError> {
    let messages: Vec<MessageView<'_>> = current
        .chat
        .history()
        .iter()
        .map(|turn| MessageView {
            role: turn.role.display_name(),
            text: &turn.text,
        })
        .collect();
    let body = state.renderer.render(
        "chat.html",
        context! { active => "chat", messages, failed_prompt, flash },
    )?;
    Ok(session.page(body))
}

#[derive(Serialize)]
struct DocumentView<'a> {
    file_name: &'a str,
    preview: String,
}

pub(super) async fn summarizer(
    State(state): State<AppState>,
    session: ActiveSession,
) -> Result<Page, AppError> {
    let guard = session.handle.lock().await;
    render_summarizer(&state, &session, guard.pending_document.as_ref(), None, None)
}

/// File part pulled out of the upload form.
struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty());
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        if file_name.is_none() && bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(Upload {
            file_name,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}

pub(super) async fn upload_notes(
    State(state): State<AppState>,
    session: ActiveSession,
    mut multipart: Multipart,
) -> Result<Page, AppError> {
    let upload = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            let guard = session.handle.lock().await;
            return render_summarizer(
                &state,
                &session,
                guard.pending_document.as_ref(),
                None,
                Some(Flash::warning("Choose a PDF or TXT file to upload.")),
            );
        }
        Err(error) => {
            tracing::warn!(session = %session.id, error = %error, "Upload could not be read");
            return render_summarizer(
                &state,
                &session,
                None,
                None,
                Some(Flash::error(format!("Failed to process the file: {error}"))),
            );
        }
    };

    let file_name = upload
        .file_name
        .clone()
        .unwrap_or_else(|| "upload".to_string());
    let extracted = match DocumentKind::detect(
        upload.content_type.as_deref(),
        upload.file_name.as_deref(),
    ) {
        Ok(kind) => extract_text_blocking(upload.bytes.to_vec(), kind).await,
        Err(error) => Err(error),
    };

    let mut guard = session.handle.lock().await;
    match extracted {
        Ok(text) if text.trim().is_empty() => {
            guard.pending_document = None;
            render_summarizer(
                &state,
                &session,
                None,
                None,
                Some(Flash::warning(EMPTY_DOCUMENT_WARNING)),
            )
        }
        Ok(text) => {
            tracing::info!(
                session = %session.id,
                file = %file_name,
                characters = text.chars().count(),
                "Notes extracted"
            );
            guard.pending_document = Some(PendingDocument { file_name, text });
            render_summarizer(&state, &session, guard.pending_document.as_ref(), None, None)
        }
        Err(error) => {
            tracing::warn!(session = %session.id, file = %file_name, error = %error, "Extraction failed");
            guard.pending_document = None;
            render_summarizer(
                &state,
                &session,
                None,
                None,
                Some(Flash::error(format!("Failed to process the file: {error}"))),
            )
        }
    }
}

pub(super) async fn summarize_notes(
    State(state): State<AppState>,
    session: ActiveSession,
) -> Result<Page, AppError> {
    let guard = session.handle.lock().await;
    let Some(document) = guard.pending_document.as_ref() else {
        return render_summarizer(
            &state,
            &session,
            None,
            None,
            Some(Flash::warning("Upload a PDF or TXT file first.")),
        );
    };

    match state.summarizer.summarize(&document.text).await {
        Ok(outcome) => render_summarizer(
            &state,
            &session,
            Some(document),
            Some(&outcome.summary),
            None,
        ),
        Err(ProcessingError::NoContent) => render_summarizer(
            &state,
            &session,
            Some(document),
            None,
            Some(Flash::warning(EMPTY_DOCUMENT_WARNING)),
        ),
        Err(error) => {
            tracing::warn!(session = %session.id, error = %error, "Summarization failed");
            render_summarizer(
                &state,
                &session,
                Some(document),
                None,
                Some(Flash::error(format!(
                    "An error occurred during summarization: {error}"
                ))),
            )
        }
    }
}

fn render_summarizer(
    state: &AppState,
    session: &ActiveSession,
    document: Option<&PendingDocument>,
    summary: Option<&str>,
    flash: Option<Flash>,
) -> Result<Page, AppError> {
    let document = document.map(|document| DocumentView {
        file_name: &document.file_name,
        preview: document.text.chars().take(PREVIEW_CHARS).collect(),
    });
    let body = state.renderer.render(
        "summarizer.html",
        context! { active => "summarizer", document, summary, flash },
    )?;
    Ok(session.page(body))
}

pub(super) async fn quiz(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let body = state.renderer.render(
        "quiz.html",
        context! { active => "quiz", quiz_form_url => state.quiz_form_url.as_ref() },
    )?;
    Ok(Html(body))
}

pub(super) async fn resources(
    State(state): State<AppState>,
    session: ActiveSession,
) -> Result<Page, AppError> {
    let guard = session.handle.lock().await;
    render_resources(&state, &session, &guard.resources, None)
}

pub(super) async fn save_resources(
    State(state): State<AppState>,
    session: ActiveSession,
    Form(form): Form<ResourcesForm>,
) -> Result<Page, AppError> {
    let mut guard = session.handle.lock().await;
    guard.resources = Resources {
        book_links: form.books,
        paper_links: form.papers,
    };
    tracing::info!(session = %session.id, "Resources saved");
    render_resources(
        &state,
        &session,
        &guard.resources,
        Some(Flash::success("Resources saved!")),
    )
}

fn render_resources(
    state: &AppState,
    session: &ActiveSession,
    resources: &Resources,
    flash: Option<Flash>,
) -> Result<Page, AppError> {
    let body = state.renderer.render(
        "resources.html",
        context! {
            active => "resources",
            resources,
            resources_json => pretty_json(resources),
            flash,
        },
    )?;
    Ok(session.page(body))
}

#[derive(Serialize)]
pub(super) struct MetricsResponse {
    #[serde(flatten)]
    usage: MetricsSnapshot,
    active_sessions: usize,
}

pub(super) async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        usage: state.metrics.snapshot(),
        active_sessions: state.sessions.len().await,
    })
}

pub(super) async fn health() -> &'static str {
    "ok"
}

fn pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
