use super::{ChatClient, ChatClientError, ChatTurn, last_user_message};
use crate::http::endpoint;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Static context the extractive backend answers from.
///
/// It carries no course material; the extractive backend is a stand-in for a real retrieval
/// system.
pub const STUDY_CONTEXT: &str = "The AI Tutor app supports IGNOU students. The AI Chatbot \
answers study questions. The Notes Summarizer condenses PDF or text study material into key \
points. The Quiz Section lets students test their knowledge with an interactive quiz. The \
Resources page keeps links to book PDFs and previous year question papers. Regular revision, \
solving previous year papers and submitting assignments on time help students prepare for \
term-end examinations.";

/// Extractive question answering through the Hugging Face Inference API.
pub struct ExtractiveQaClient {
    http: Client,
    base_url: String,
    model: String,
    api_token: Option<String>,
    context: String,
}

#[derive(Debug, Deserialize)]
struct AnswerSpan {
    answer: String,
    #[serde(default)]
    score: f32,
}

impl ExtractiveQaClient {
    /// Create a client answering from [`STUDY_CONTEXT`].
    pub fn new(http: Client, base_url: String, model: String, api_token: Option<String>) -> Self {
        Self {
            http,
            base_url,
            model,
            api_token,
            context: STUDY_CONTEXT.to_string(),
        }
    }

    /// Replace the context answers are selected from (`QA_CONTEXT`).
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    fn endpoint(&self) -> String {
        endpoint(&self.base_url, &format!("models/{}", self.model))
    }
}

#[async_trait]
impl ChatClient for ExtractiveQaClient {
    async fn reply(&self, history: &[ChatTurn]) -> Result<String, ChatClientError> {
        let question = last_user_message(history).ok_or(ChatClientError::EmptyConversation)?;

        let payload = json!({
            "inputs": { "question": question, "context": self.context },
            "options": { "wait_for_model": true }
        });
        let mut builder = self.http.post(self.endpoint()).json(&payload);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|error| {
            ChatClientError::ProviderUnavailable(format!(
                "failed to reach Hugging Face at {}: {error}",
                self.base_url
            ))
        })?;

        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatClientError::ProviderUnavailable(format!(
                "model {} returned {status}: {body}",
                self.model
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatClientError::GenerationFailed(format!(
                "Hugging Face returned {status}: {body}"
            )));
        }

        let span: AnswerSpan = response.json().await.map_err(|error| {
            ChatClientError::InvalidResponse(format!("failed to decode answer span: {error}"))
        })?;
        tracing::debug!(score = span.score, "Extractive answer selected");

        let answer = span.answer.trim();
        if answer.is_empty() {
            return Err(ChatClientError::InvalidResponse(
                "model returned an empty answer span".into(),
            ));
        }
        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::build_chat_client;
    use crate::config::Config;
    use httpmock::{Method::POST, MockServer};

    fn client(base_url: String) -> ExtractiveQaClient {
        ExtractiveQaClient::new(
            Client::builder()
                .user_agent("ai-tutor-test")
                .build()
                .expect("client"),
            base_url,
            "deepset/roberta-base-squad2".into(),
            None,
        )
    }

    #[tokio::test]
    async fn answers_latest_question_from_fixed_context() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/deepset/roberta-base-squad2")
                    .json_body_partial(
                        r#"{"inputs": {"question": "What does the summarizer do?", "context": "Short context."}}"#,
                    );
                then.status(200).json_body(json!({
                    "answer": " condenses notes ",
                    "score": 0.87,
                    "start": 10,
                    "end": 25
                }));
            })
            .await;

        let history = vec![
            ChatTurn::user("hello"),
            ChatTurn::model("hi"),
            ChatTurn::user("What does the summarizer do?"),
        ];
        let answer = client(server.base_url())
            .with_context("Short context.")
            .reply(&history)
            .await
            .expect("answer");

        mock.assert_async().await;
        assert_eq!(answer, "condenses notes");
    }

    #[tokio::test]
    async fn configured_context_replaces_builtin_study_context() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/deepset/roberta-base-squad2")
                    .json_body_partial(
                        r#"{"inputs": {"question": "What does Ohm's law relate?", "context": "Ohm's law relates voltage and current."}}"#,
                    );
                then.status(200)
                    .json_body(json!({ "answer": "voltage and current", "score": 0.9 }));
            })
            .await;

        let config = Config::from_lookup(|key| match key {
            "CHAT_PROVIDER" => Some("extractive".into()),
            "HUGGINGFACE_BASE_URL" => Some(server.base_url()),
            "QA_CONTEXT" => Some("Ohm's law relates voltage and current.".into()),
            _ => None,
        })
        .expect("config");
        let client = build_chat_client(&config).expect("client");

        let answer = client
            .reply(&[ChatTurn::user("What does Ohm's law relate?")])
            .await
            .expect("answer");

        mock.assert_async().await;
        assert_eq!(answer, "voltage and current");
    }

    #[tokio::test]
    async fn history_without_question_is_rejected() {
        let error = client("http://127.0.0.1:9".into())
            .reply(&[ChatTurn::model("Hello!")])
            .await
            .unwrap_err();
        assert!(matches!(error, ChatClientError::EmptyConversation));
    }

    #[tokio::test]
    async fn loading_model_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(503).body("loading");
            })
            .await;

        let error = client(server.base_url())
            .reply(&[ChatTurn::user("Why?")])
            .await
            .unwrap_err();
        assert!(matches!(error, ChatClientError::ProviderUnavailable(_)));
    }
}
