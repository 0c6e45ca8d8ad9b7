//! Chatbot backends and the per-session conversation transcript.
//!
//! Two backends implement [`ChatClient`]:
//!
//! - [`GeminiChatClient`] sends the whole append-only transcript to the hosted generative API and
//!   returns the model's continuation.
//! - [`ExtractiveQaClient`] answers only the latest question by selecting a span from a fixed
//!   study context through a hosted extractive question-answering model.
//!
//! [`ChatSession`] owns the transcript. A turn is recorded only when the backend answers, so a
//! failed request leaves the conversation exactly as it was.

mod extractive;
mod gemini;

pub use extractive::{ExtractiveQaClient, STUDY_CONTEXT};
pub use gemini::GeminiChatClient;

use crate::config::{ChatProvider, Config};
use crate::http::model_client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by chat backends.
#[derive(Debug, Error)]
pub enum ChatClientError {
    /// Backend could not be reached or is not configured.
    #[error("Chat provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Backend returned an error status.
    #[error("Chat request failed: {0}")]
    GenerationFailed(String),
    /// Backend response could not be interpreted.
    #[error("Malformed chat response: {0}")]
    InvalidResponse(String),
    /// No user question was supplied.
    #[error("conversation has no user message to answer")]
    EmptyConversation,
}

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The student.
    User,
    /// The chat backend.
    Model,
}

impl ChatRole {
    /// Label used when rendering the transcript.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "assistant",
        }
    }
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who wrote the message.
    pub role: ChatRole,
    /// Message text.
    pub text: String,
}

impl ChatTurn {
    /// Build a user-authored turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    /// Build a model-authored turn.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Interface implemented by chat backends.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Produce the reply to the last user turn of `history`.
    async fn reply(&self, history: &[ChatTurn]) -> Result<String, ChatClientError>;
}

/// Append-only conversation transcript for one student session.
#[derive(Debug, Default, Clone)]
pub struct ChatSession {
    history: Vec<ChatTurn>,
}

impl ChatSession {
    /// Start an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages exchanged so far, oldest first.
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Send `prompt` to `client` and record the exchange when it succeeds.
    pub async fn send_message(
        &mut self,
        client: &dyn ChatClient,
        prompt: &str,
    ) -> Result<String, ChatClientError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ChatClientError::EmptyConversation);
        }

        self.history.push(ChatTurn::user(prompt));
        match client.reply(&self.history).await {
            Ok(answer) => {
                self.history.push(ChatTurn::model(answer.clone()));
                Ok(answer)
            }
            Err(error) => {
                self.history.pop();
                Err(error)
            }
        }
    }
}

/// Build the chat backend selected by configuration.
pub fn build_chat_client(config: &Config) -> Result<Arc<dyn ChatClient>, ChatClientError> {
    let http = model_client("chat", config.model_request_timeout).map_err(|error| {
        ChatClientError::ProviderUnavailable(format!("failed to construct HTTP client: {error}"))
    })?;

    let client: Arc<dyn ChatClient> = match config.chat_provider {
        ChatProvider::Gemini => {
            let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                ChatClientError::ProviderUnavailable("GEMINI_API_KEY is not set".into())
            })?;
            Arc::new(GeminiChatClient::new(
                http,
                config.gemini_base_url.clone(),
                config.gemini_model.clone(),
                api_key,
            ))
        }
        ChatProvider::Extractive => {
            let client = ExtractiveQaClient::new(
                http,
                config.huggingface_base_url.clone(),
                config.qa_model.clone(),
                config.huggingface_api_token.clone(),
            );
            match &config.qa_context {
                Some(context) => Arc::new(client.with_context(context.clone())),
                None => Arc::new(client),
            }
        }
    };
    tracing::info!(provider = ?config.chat_provider, "Chat client initialized");
    Ok(client)
}

/// Latest user-authored message in `history`.
pub(crate) fn last_user_message(history: &[ChatTurn]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|turn| turn.role == ChatRole::User)
        .map(|turn| turn.text.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct EchoClient {
        calls: Mutex<Vec<Vec<ChatTurn>>>,
        fail: bool,
    }

    impl EchoClient {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl ChatClient for EchoClient {
        async fn reply(&self, history: &[ChatTurn]) -> Result<String, ChatClientError> {
            self.calls.lock().expect("lock").push(history.to_vec());
            if self.fail {
                return Err(ChatClientError::GenerationFailed("offline".into()));
            }
            let question = last_user_message(history).unwrap_or_default();
            Ok(format!("echo: {question}"))
        }
    }

    #[tokio::test]
    async fn successful_turns_append_user_and_model_messages() {
        let client = EchoClient::new(false);
        let mut session = ChatSession::new();

        session.send_message(&client, "What is DNA?").await.expect("reply");
        session.send_message(&client, " And RNA? ").await.expect("reply");

        assert_eq!(
            session.history(),
            &[
                ChatTurn::user("What is DNA?"),
                ChatTurn::model("echo: What is DNA?"),
                ChatTurn::user("And RNA?"),
                ChatTurn::model("echo: And RNA?"),
            ]
        );
        // the backend sees the full running transcript every turn
        let calls = client.calls.lock().expect("lock");
        assert_eq!(calls[0].len(), 1);
        assert_eq!(calls[1].len(), 3);
    }

    #[tokio::test]
    async fn failed_turn_leaves_history_unchanged() {
        let client = EchoClient::new(true);
        let mut session = ChatSession::new();

        let error = session.send_message(&client, "Hello?").await.unwrap_err();

        assert!(matches!(error, ChatClientError::GenerationFailed(_)));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected_without_calling_backend() {
        let client = EchoClient::new(false);
        let mut session = ChatSession::new();

        let error = session.send_message(&client, "   ").await.unwrap_err();

        assert!(matches!(error, ChatClientError::EmptyConversation));
        assert!(client.calls.lock().expect("lock").is_empty());
    }

    #[test]
    fn model_role_is_shown_as_assistant() {
        assert_eq!(ChatRole::Model.display_name(), "assistant");
        assert_eq!(ChatRole::User.display_name(), "user");
    }
}
