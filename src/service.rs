//! Question-answering service joining document acquisition, the answering pipeline and metrics.
//!
//! The HTTP surface only talks to [`DocumentQa`], so handlers can be exercised against a stub and
//! the real [`QaService`] can be assembled once at startup and shared through an `Arc`.

use crate::acquisition::{
    AcquisitionError, DocumentFetcher, DocumentKind, HttpDocumentFetcher, extract_units,
};
use crate::completion::build_completion_client;
use crate::config::Config;
use crate::embedding::build_embedding_client;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::pipeline::{Pipeline, PipelineError, TextUnit};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

/// File received through the upload endpoint.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied file name, used for format detection and as the unit source.
    pub file_name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Errors surfaced by the question-answering service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Document could not be downloaded or parsed.
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    /// None of the uploaded files contained readable text in a supported format.
    #[error("No valid documents to process")]
    NoUsableDocuments,
    /// Pipeline aborted before producing answers.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// Service could not be assembled from configuration.
    #[error("Failed to initialize service: {0}")]
    Initialization(String),
}

/// Operations exposed to the HTTP surface.
#[async_trait]
pub trait DocumentQa: Send + Sync {
    /// Download the document at `url` and answer every question about it, in order.
    async fn answer_from_url(
        &self,
        url: &str,
        questions: &[String],
    ) -> Result<Vec<String>, ServiceError>;

    /// Answer every question about the combined text of the uploaded files, in order.
    async fn answer_from_uploads(
        &self,
        files: Vec<UploadedFile>,
        questions: &[String],
    ) -> Result<Vec<String>, ServiceError>;

    /// Current activity counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Production [`DocumentQa`] implementation.
pub struct QaService {
    fetcher: Arc<dyn DocumentFetcher>,
    pipeline: Pipeline,
    metrics: Arc<PipelineMetrics>,
}

impl QaService {
    /// Assemble a service from explicit collaborators.
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, pipeline: Pipeline) -> Self {
        Self {
            fetcher,
            pipeline,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Build the HTTP fetcher, provider clients and pipeline described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        tracing::info!("Initializing embedding client");
        let embedder = build_embedding_client(&config.embedding)
            .map_err(|error| ServiceError::Initialization(error.to_string()))?;
        tracing::info!("Initializing completion client");
        let completion = build_completion_client(&config.completion)
            .map_err(|error| ServiceError::Initialization(error.to_string()))?;
        let fetcher = HttpDocumentFetcher::new(config.document_fetch_timeout_secs)
            .map_err(|error| ServiceError::Initialization(error.to_string()))?;

        let pipeline = Pipeline::from_config(config, embedder, completion);
        Ok(Self::new(Arc::new(fetcher), pipeline))
    }

    async fn answer_units(
        &self,
        units: Vec<TextUnit>,
        questions: &[String],
    ) -> Result<Vec<String>, ServiceError> {
        let output = self.pipeline.run(units, questions).await?;
        let failed = output.failed_questions as u64;
        let answered = output.answers.len() as u64 - failed;
        self.metrics
            .record_request(output.chunk_count as u64, answered, failed);
        Ok(output.answers)
    }
}

#[async_trait]
impl DocumentQa for QaService {
    async fn answer_from_url(
        &self,
        url: &str,
        questions: &[String],
    ) -> Result<Vec<String>, ServiceError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("qa_request", %request_id, questions = questions.len());
        async move {
            tracing::info!("Answering questions about a remote document");
            let units = self.fetcher.fetch(url).await.map_err(|error| {
                tracing::warn!(error = %error, "Document acquisition failed");
                error
            })?;
            tracing::debug!(units = units.len(), "Document acquired");
            self.answer_units(units, questions).await
        }
        .instrument(span)
        .await
    }

    async fn answer_from_uploads(
        &self,
        files: Vec<UploadedFile>,
        questions: &[String],
    ) -> Result<Vec<String>, ServiceError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "qa_request",
            %request_id,
            files = files.len(),
            questions = questions.len()
        );
        async move {
            let mut units = Vec::new();
            for UploadedFile { file_name, bytes } in files {
                let Some(kind) = DocumentKind::from_file_name(&file_name) else {
                    tracing::debug!(file = %file_name, "Skipping unsupported upload");
                    continue;
                };
                match extract_units(bytes, kind, &file_name).await {
                    Ok(extracted) => units.extend(extracted),
                    Err(error) => {
                        tracing::warn!(file = %file_name, error = %error, "Skipping unreadable upload");
                    }
                }
            }
            if units.is_empty() {
                return Err(ServiceError::NoUsableDocuments);
            }
            tracing::debug!(units = units.len(), "Uploads extracted");
            self.answer_units(units, questions).await
        }
        .instrument(span)
        .await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionClient, CompletionClientError, CompletionRequest};
    use crate::config::PipelineSettings;
    use crate::embedding::HashingEmbedder;
    use crate::pipeline::AnswerSynthesizer;

    struct StaticFetcher {
        result: fn() -> Result<Vec<TextUnit>, AcquisitionError>,
    }

    #[async_trait]
    impl DocumentFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<TextUnit>, AcquisitionError> {
            (self.result)()
        }
    }

    struct QuestionEcho;

    #[async_trait]
    impl CompletionClient for QuestionEcho {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<Option<String>, CompletionClientError> {
            let question = request
                .prompt
                .split("Question: ")
                .nth(1)
                .and_then(|rest| rest.lines().next())
                .unwrap_or_default();
            if question.contains("unanswerable") {
                return Err(CompletionClientError::Timeout(60));
            }
            Ok(Some(format!("re: {question}")))
        }
    }

    fn service(result: fn() -> Result<Vec<TextUnit>, AcquisitionError>) -> QaService {
        let pipeline = Pipeline::new(
            Arc::new(HashingEmbedder::new(32)),
            AnswerSynthesizer::new(Arc::new(QuestionEcho), 128, 0.5),
            PipelineSettings {
                chunk_size: 200,
                chunk_overlap: 20,
                top_k: 3,
                answer_concurrency: 2,
            },
            32,
        );
        QaService::new(Arc::new(StaticFetcher { result }), pipeline)
    }

    fn policy_units() -> Result<Vec<TextUnit>, AcquisitionError> {
        Ok(vec![TextUnit::new(
            "Grace period is thirty days. Maternity cover starts after two years.",
            "https://example.com/policy.txt",
        )])
    }

    fn questions(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[tokio::test]
    async fn url_requests_answer_in_order_and_record_metrics() {
        let service = service(policy_units);

        let answers = service
            .answer_from_url(
                "https://example.com/policy.txt",
                &questions(&["grace period?", "unanswerable?", "maternity?"]),
            )
            .await
            .expect("answers");

        assert_eq!(answers.len(), 3);
        assert_eq!(answers[0], "re: grace period?");
        assert!(answers[1].starts_with("Error processing question:"));
        assert_eq!(answers[2], "re: maternity?");

        let snapshot = service.metrics_snapshot();
        assert_eq!(snapshot.documents_processed, 1);
        assert_eq!(snapshot.chunks_indexed, 1);
        assert_eq!(snapshot.questions_answered, 2);
        assert_eq!(snapshot.questions_failed, 1);
    }

    #[tokio::test]
    async fn acquisition_failures_propagate() {
        let service = service(|| Err(AcquisitionError::Status(404)));
        let error = service
            .answer_from_url("https://example.com/missing.pdf", &questions(&["q"]))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ServiceError::Acquisition(AcquisitionError::Status(404))
        ));
        assert_eq!(service.metrics_snapshot(), MetricsSnapshot::default());
    }

    #[tokio::test]
    async fn empty_remote_documents_are_rejected() {
        let service = service(|| Ok(Vec::new()));
        let error = service
            .answer_from_url("https://example.com/scan.pdf", &questions(&["q"]))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ServiceError::Pipeline(PipelineError::EmptyDocument)
        ));
    }

    #[tokio::test]
    async fn uploads_skip_unsupported_files() {
        let service = service(policy_units);
        let files = vec![
            UploadedFile {
                file_name: "photo.png".into(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            },
            UploadedFile {
                file_name: "policy.txt".into(),
                bytes: b"Grace period is thirty days.".to_vec(),
            },
        ];

        let answers = service
            .answer_from_uploads(files, &questions(&["grace period?"]))
            .await
            .expect("answers");

        assert_eq!(answers, vec!["re: grace period?"]);
    }

    #[tokio::test]
    async fn uploads_without_usable_text_are_rejected() {
        let service = service(policy_units);
        let files = vec![
            UploadedFile {
                file_name: "photo.png".into(),
                bytes: vec![1, 2, 3],
            },
            UploadedFile {
                file_name: "blank.txt".into(),
                bytes: b"   \n".to_vec(),
            },
            UploadedFile {
                file_name: "broken.docx".into(),
                bytes: b"not a zip".to_vec(),
            },
        ];

        let error = service
            .answer_from_uploads(files, &questions(&["q"]))
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::NoUsableDocuments));
    }
}
