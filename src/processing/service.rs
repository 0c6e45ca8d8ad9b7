//! Summarization service coordinating chunking and per-chunk provider calls.

use crate::{
    config::SummarizerSettings,
    metrics::UsageMetrics,
    processing::{
        chunking::chunk_document,
        types::{ProcessingError, SummaryOutcome},
    },
    summarization::{SummarizationClient, SummarizationRequest},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Coordinates the chunk-and-summarize pipeline.
///
/// The service owns a shared handle to the summarization client and the metrics registry.
/// Construct it once near process start and share it through an `Arc`.
pub struct SummarizationService {
    client: Arc<dyn SummarizationClient>,
    settings: SummarizerSettings,
    metrics: Arc<UsageMetrics>,
}

/// Abstraction over the summarization pipeline used by the web surface.
#[async_trait]
pub trait SummarizerApi: Send + Sync {
    /// Reduce `text` to a summary, failing as a whole if any chunk fails.
    async fn summarize(&self, text: &str) -> Result<SummaryOutcome, ProcessingError>;
}

impl SummarizationService {
    /// Build a service around an already-constructed summarization client.
    pub fn new(
        client: Arc<dyn SummarizationClient>,
        settings: SummarizerSettings,
        metrics: Arc<UsageMetrics>,
    ) -> Self {
        Self {
            client,
            settings,
            metrics,
        }
    }

    /// Chunk `text`, summarize each chunk in order, and join the summaries with a space.
    ///
    /// When more than one pass is allowed and the joined summary would still need several
    /// chunks, the joined summary is fed back through the pipeline.
    pub async fn summarize(&self, text: &str) -> Result<SummaryOutcome, ProcessingError> {
        let result = self.run_passes(text).await;
        match &result {
            Ok(outcome) => self.metrics.record_summary(outcome.model_calls as u64),
            Err(ProcessingError::NoContent) => {}
            Err(_) => self.metrics.record_summary_failure(),
        }
        result
    }

    async fn run_passes(&self, text: &str) -> Result<SummaryOutcome, ProcessingError> {
        if text.trim().is_empty() {
            tracing::debug!("Skipping summarization of empty document");
            return Err(ProcessingError::NoContent);
        }

        let mut chunks = chunk_document(text, &self.settings)?;
        if chunks.is_empty() {
            return Err(ProcessingError::NoContent);
        }
        let chunk_count = chunks.len();
        tracing::info!(
            chunk_count,
            chunk_size = self.settings.chunk_size,
            strategy = ?self.settings.strategy,
            characters = text.chars().count(),
            "Summarizing document"
        );

        let mut passes = 0;
        let mut model_calls = 0;
        let summary = loop {
            passes += 1;
            model_calls += chunks.len();
            let joined = self.summarize_chunks(&chunks).await?.join(" ");

            if passes >= self.settings.max_passes {
                break joined;
            }
            let next = chunk_document(&joined, &self.settings)?;
            if next.len() <= 1 {
                break joined;
            }
            tracing::debug!(
                pass = passes,
                next_chunks = next.len(),
                "Joined summary still spans several chunks; reducing again"
            );
            chunks = next;
        };

        tracing::info!(chunk_count, passes, model_calls, "Document summarized");
        Ok(SummaryOutcome {
            summary,
            chunk_count,
            passes,
            model_calls,
        })
    }

    async fn summarize_chunks(&self, chunks: &[String]) -> Result<Vec<String>, ProcessingError> {
        let total = chunks.len();
        let mut summaries = Vec::with_capacity(total);
        for (index, chunk) in chunks.iter().enumerate() {
            tracing::debug!(chunk = index + 1, total, "Summarizing chunk");
            let summary = self
                .client
                .generate_summary(SummarizationRequest {
                    text: chunk.clone(),
                    min_length: self.settings.min_length,
                    max_length: self.settings.max_length,
                })
                .await
                .map_err(|source| {
                    tracing::warn!(chunk = index + 1, total, error = %source, "Chunk summarization failed");
                    ProcessingError::Summarization {
                        chunk: index + 1,
                        total,
                        source,
                    }
                })?;
            summaries.push(summary);
        }
        Ok(summaries)
    }
}

#[async_trait]
impl SummarizerApi for SummarizationService {
    async fn summarize(&self, text: &str) -> Result<SummaryOutcome, ProcessingError> {
        SummarizationService::summarize(self, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarization::SummarizationClientError;
    use std::sync::Mutex;

    /// Records every chunk it sees and answers with a deterministic label.
    #[derive(Default)]
    struct ScriptedClient {
        seen: Mutex<Vec<String>>,
        fail_on_call: Option<usize>,
        reply_len: Option<usize>,
    }

    impl ScriptedClient {
        fn seen(&self) -> Vec<String> {
            self.seen.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl SummarizationClient for ScriptedClient {
        async fn generate_summary(
            &self,
            request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            let mut seen = self.seen.lock().expect("lock");
            seen.push(request.text.clone());
            let call = seen.len();
            if self.fail_on_call == Some(call) {
                return Err(SummarizationClientError::GenerationFailed("boom".into()));
            }
            Ok(match self.reply_len {
                Some(len) => "s".repeat(len),
                None => format!("S{call}({})", request.text.chars().count()),
            })
        }
    }

    fn service(client: Arc<ScriptedClient>, settings: SummarizerSettings) -> SummarizationService {
        SummarizationService::new(client, settings, Arc::new(UsageMetrics::new()))
    }

    fn settings(chunk_size: usize) -> SummarizerSettings {
        SummarizerSettings {
            chunk_size,
            ..SummarizerSettings::default()
        }
    }

    #[tokio::test]
    async fn joins_chunk_summaries_in_order_with_single_space() {
        let client = Arc::new(ScriptedClient::default());
        let service = service(client.clone(), settings(1000));

        let outcome = service.summarize(&"A".repeat(2500)).await.expect("summary");

        assert_eq!(outcome.summary, "S1(1000) S2(1000) S3(500)");
        assert_eq!(outcome.chunk_count, 3);
        assert_eq!(outcome.passes, 1);
        assert_eq!(outcome.model_calls, 3);
        let lengths: Vec<usize> = client.seen().iter().map(String::len).collect();
        assert_eq!(lengths, vec![1000, 1000, 500]);
    }

    #[tokio::test]
    async fn empty_text_short_circuits_without_model_call() {
        let client = Arc::new(ScriptedClient::default());
        let service = service(client.clone(), settings(1000));

        for text in ["", "   \n\t  "] {
            let error = service.summarize(text).await.unwrap_err();
            assert!(matches!(error, ProcessingError::NoContent));
        }
        assert!(client.seen().is_empty());
        assert_eq!(service.metrics.snapshot().summarization_failures, 0);
    }

    #[tokio::test]
    async fn any_chunk_failure_fails_the_whole_document() {
        let client = Arc::new(ScriptedClient {
            fail_on_call: Some(2),
            ..ScriptedClient::default()
        });
        let service = service(client.clone(), settings(10));

        let error = service.summarize(&"b".repeat(35)).await.unwrap_err();

        assert!(matches!(
            error,
            ProcessingError::Summarization { chunk: 2, total: 4, .. }
        ));
        // the pipeline stops at the first failure
        assert_eq!(client.seen().len(), 2);
        let snapshot = service.metrics.snapshot();
        assert_eq!(snapshot.summarization_failures, 1);
        assert_eq!(snapshot.documents_summarized, 0);
    }

    #[tokio::test]
    async fn extra_passes_reduce_long_joined_summaries() {
        let client = Arc::new(ScriptedClient {
            reply_len: Some(6),
            ..ScriptedClient::default()
        });
        let service = service(
            client.clone(),
            SummarizerSettings {
                max_passes: 3,
                ..settings(10)
            },
        );

        // 40 chars -> 4 chunks -> "ssssss ssssss ssssss ssssss" (27 chars, 3 chunks)
        // -> 3 summaries joined (20 chars, 2 chunks) -> third pass stops at the limit.
        let outcome = service.summarize(&"c".repeat(40)).await.expect("summary");

        assert_eq!(outcome.chunk_count, 4);
        assert_eq!(outcome.passes, 3);
        assert_eq!(outcome.model_calls, 4 + 3 + 2);
        assert_eq!(outcome.summary, "ssssss ssssss");
        assert_eq!(service.metrics.snapshot().chunks_summarized, 9);
    }

    #[tokio::test]
    async fn extra_passes_stop_once_summary_fits_one_chunk() {
        let client = Arc::new(ScriptedClient {
            reply_len: Some(3),
            ..ScriptedClient::default()
        });
        let service = service(
            client.clone(),
            SummarizerSettings {
                max_passes: 5,
                ..settings(10)
            },
        );

        let outcome = service.summarize(&"d".repeat(20)).await.expect("summary");

        assert_eq!(outcome.passes, 1);
        assert_eq!(outcome.summary, "sss sss");
    }

    #[tokio::test]
    async fn forwards_length_bounds_to_provider() {
        struct BoundsClient;

        #[async_trait]
        impl SummarizationClient for BoundsClient {
            async fn generate_summary(
                &self,
                request: SummarizationRequest,
            ) -> Result<String, SummarizationClientError> {
                Ok(format!("{}-{}", request.min_length, request.max_length))
            }
        }

        let service = SummarizationService::new(
            Arc::new(BoundsClient),
            SummarizerSettings::default(),
            Arc::new(UsageMetrics::new()),
        );
        let outcome = service.summarize("Short notes.").await.expect("summary");
        assert_eq!(outcome.summary, "40-150");
    }
}
