use super::AppState;
use crate::session::SessionHandle;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
        request::Parts,
    },
    response::{Html, IntoResponse, Response},
};
use std::convert::Infallible;
use uuid::Uuid;

/// Cookie carrying the visitor's session id.
pub const SESSION_COOKIE: &str = "ai_tutor_session";

/// The visitor's session, resolved from the cookie or freshly created.
pub struct ActiveSession {
    /// Session identifier.
    pub id: Uuid,
    /// Lockable session state.
    pub handle: SessionHandle,
    is_new: bool,
}

#[async_trait]
impl FromRequestParts<AppState> for ActiveSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let requested = session_id_from_headers(&parts.headers);
        let (id, handle, is_new) = state.sessions.get_or_create(requested).await;
        Ok(Self { id, handle, is_new })
    }
}

impl ActiveSession {
    /// Wrap rendered HTML, attaching the session cookie when the session is new.
    pub(crate) fn page(&self, body: String) -> Page {
        Page {
            body,
            set_cookie: self.is_new.then(|| session_cookie(&self.id)),
        }
    }
}

/// Rendered HTML page plus the optional session cookie.
pub(crate) struct Page {
    body: String,
    set_cookie: Option<String>,
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        let mut response = Html(self.body).into_response();
        if let Some(cookie) = self.set_cookie {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(error) => tracing::warn!(error = %error, "Invalid session cookie value"),
            }
        }
        response
    }
}

fn session_cookie(id: &Uuid) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

/// Find a well-formed session id among the request's `Cookie` headers.
pub(crate) fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}
