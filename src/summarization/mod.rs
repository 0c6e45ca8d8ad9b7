//! Abstractions for generating abstractive summaries via hosted or local providers.
//!
//! The notes summarizer calls one of these clients once per chunk. The Hugging Face client talks
//! to the Inference API summarization pipeline (the default `facebook/bart-large-cnn` model takes
//! explicit `min_length`/`max_length` bounds); the Ollama client prompts a local runtime and maps
//! the same bounds into the prompt.

use crate::config::{Config, SummarizationProvider};
use crate::http::{endpoint, model_client};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced while attempting abstractive summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable or reported that the model is not ready.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the summarization provider for a single chunk.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Chunk of source text to condense.
    pub text: String,
    /// Minimum summary length requested from the model.
    pub min_length: usize,
    /// Maximum summary length requested from the model.
    pub max_length: usize,
}

/// Interface implemented by abstractive summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Generate a summary of `request.text` within the requested length bounds.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// Build the summarization client selected by configuration.
pub fn build_summarization_client(
    config: &Config,
) -> Result<Arc<dyn SummarizationClient>, SummarizationClientError> {
    let client: Arc<dyn SummarizationClient> = match config.summarization_provider {
        SummarizationProvider::HuggingFace => Arc::new(HuggingFaceSummarizationClient {
            http: build_http(config)?,
            base_url: config.huggingface_base_url.clone(),
            model: config.summarization_model.clone(),
            api_token: config.huggingface_api_token.clone(),
        }),
        SummarizationProvider::Ollama => Arc::new(OllamaSummarizationClient {
            http: build_http(config)?,
            base_url: config.ollama_url.clone(),
            model: config.summarization_model.clone(),
        }),
    };
    tracing::info!(
        provider = ?config.summarization_provider,
        model = %config.summarization_model,
        "Summarization client initialized"
    );
    Ok(client)
}

fn build_http(config: &Config) -> Result<Client, SummarizationClientError> {
    model_client("summary", config.model_request_timeout).map_err(|error| {
        SummarizationClientError::ProviderUnavailable(format!(
            "failed to construct HTTP client: {error}"
        ))
    })
}

struct HuggingFaceSummarizationClient {
    http: Client,
    base_url: String,
    model: String,
    api_token: Option<String>,
}

impl HuggingFaceSummarizationClient {
    fn endpoint(&self) -> String {
        endpoint(&self.base_url, &format!("models/{}", self.model))
    }
}

#[derive(Debug, Deserialize)]
struct HuggingFaceSummary {
    summary_text: String,
}

#[async_trait]
impl SummarizationClient for HuggingFaceSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "inputs": request.text,
            "parameters": {
                "min_length": request.min_length,
                "max_length": request.max_length,
                "do_sample": false,
            },
            "options": { "wait_for_model": true }
        });

        let mut builder = self.http.post(self.endpoint()).json(&payload);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|error| {
            SummarizationClientError::ProviderUnavailable(format!(
                "failed to reach Hugging Face at {}: {error}",
                self.base_url
            ))
        })?;

        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "model {} returned {status}: {body}",
                self.model
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Hugging Face returned {status}: {body}"
            )));
        }

        let summaries: Vec<HuggingFaceSummary> = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Hugging Face response: {error}"
            ))
        })?;

        summaries
            .into_iter()
            .next()
            .map(|summary| summary.summary_text.trim().to_string())
            .ok_or_else(|| {
                SummarizationClientError::InvalidResponse("response contained no summary".into())
            })
    }
}

struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaSummarizationClient {
    fn endpoint(&self) -> String {
        endpoint(&self.base_url, "api/generate")
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

fn build_ollama_prompt(request: &SummarizationRequest) -> String {
    format!(
        "System: You condense study notes for university students. Keep facts, definitions and \
         key terms. Do not add information that is not in the notes. Write between {} and {} \
         words as a single paragraph.\n\nNotes:\n{}",
        request.min_length,
        request.max_length,
        request.text.trim()
    )
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": build_ollama_prompt(&request),
            "stream": false,
            "options": {
                // Lower temperature for deterministic summaries.
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn test_http() -> Client {
        Client::builder()
            .user_agent("ai-tutor-test")
            .build()
            .expect("client")
    }

    fn request() -> SummarizationRequest {
        SummarizationRequest {
            text: "Photosynthesis converts light into chemical energy.".into(),
            min_length: 40,
            max_length: 150,
        }
    }

    #[tokio::test]
    async fn huggingface_client_sends_length_bounds() {
        let server = MockServer::start_async().await;
        let client = HuggingFaceSummarizationClient {
            http: test_http(),
            base_url: server.base_url(),
            model: "facebook/bart-large-cnn".into(),
            api_token: Some("hf-token".into()),
        };

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/facebook/bart-large-cnn")
                    .header("authorization", "Bearer hf-token")
                    .json_body_partial(
                        r#"{"parameters": {"min_length": 40, "max_length": 150, "do_sample": false}}"#,
                    );
                then.status(200)
                    .json_body(json!([{ "summary_text": " Plants make energy. " }]));
            })
            .await;

        let summary = client.generate_summary(request()).await.expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "Plants make energy.");
    }

    #[tokio::test]
    async fn huggingface_client_reports_loading_model_as_unavailable() {
        let server = MockServer::start_async().await;
        let client = HuggingFaceSummarizationClient {
            http: test_http(),
            base_url: server.base_url(),
            model: "facebook/bart-large-cnn".into(),
            api_token: None,
        };

        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/facebook/bart-large-cnn");
                then.status(503)
                    .json_body(json!({ "error": "Model is currently loading" }));
            })
            .await;

        let error = client.generate_summary(request()).await.unwrap_err();
        assert!(matches!(error, SummarizationClientError::ProviderUnavailable(message) if message.contains("loading")));
    }

    #[tokio::test]
    async fn huggingface_client_rejects_empty_result() {
        let server = MockServer::start_async().await;
        let client = HuggingFaceSummarizationClient {
            http: test_http(),
            base_url: server.base_url(),
            model: "m".into(),
            api_token: None,
        };

        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/m");
                then.status(200).json_body(json!([]));
            })
            .await;

        let error = client.generate_summary(request()).await.unwrap_err();
        assert!(matches!(error, SummarizationClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn ollama_client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient {
            http: test_http(),
            base_url: server.base_url(),
            model: "llama3".into(),
        };

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .body_contains("between 40 and 150 words");
                then.status(200).json_body(json!({
                    "response": "Summary text",
                    "done": true
                }));
            })
            .await;

        let summary = client.generate_summary(request()).await.expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "Summary text");
    }

    #[tokio::test]
    async fn ollama_client_handles_error_status() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient {
            http: test_http(),
            base_url: server.base_url(),
            model: "llama3".into(),
        };

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client.generate_summary(request()).await.unwrap_err();
        assert!(matches!(error, SummarizationClientError::GenerationFailed(message) if message.contains("500")));
    }
}
