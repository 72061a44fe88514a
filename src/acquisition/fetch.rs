use super::{AcquisitionError, DocumentKind, extract_units};
use crate::pipeline::TextUnit;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Source of document text for URL-based requests.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Download the document at `url` and extract its text units.
    async fn fetch(&self, url: &str) -> Result<Vec<TextUnit>, AcquisitionError>;
}

/// Fetcher downloading documents over HTTP(S) with a fixed timeout.
pub struct HttpDocumentFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpDocumentFetcher {
    /// Build a fetcher whose downloads give up after `timeout_secs`.
    pub fn new(timeout_secs: u64) -> Result<Self, AcquisitionError> {
        let client = reqwest::Client::builder()
            .user_agent("docqa/fetch")
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|error| AcquisitionError::Unreachable(error.to_string()))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<TextUnit>, AcquisitionError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|error| AcquisitionError::InvalidUrl(format!("{url}: {error}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AcquisitionError::InvalidUrl(format!(
                "{url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }

        tracing::debug!(host = parsed.host_str().unwrap_or_default(), "Downloading document");
        let response = self.client.get(parsed).send().await.map_err(|error| {
            if error.is_timeout() {
                AcquisitionError::Timeout(self.timeout_secs)
            } else {
                AcquisitionError::Unreachable(error.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Document host returned an error status");
            return Err(AcquisitionError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let kind = DocumentKind::detect(url, content_type.as_deref());
        let bytes = response.bytes().await.map_err(|error| {
            if error.is_timeout() {
                AcquisitionError::Timeout(self.timeout_secs)
            } else {
                AcquisitionError::Unreachable(error.to_string())
            }
        })?;
        tracing::debug!(kind = %kind, bytes = bytes.len(), "Document downloaded");

        extract_units(bytes.to_vec(), kind, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::extract::tests::{docx_bytes, paragraphs_xml};
    use httpmock::{Method::GET, MockServer};

    #[tokio::test]
    async fn downloads_plain_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/policy.txt");
                then.status(200)
                    .header("content-type", "text/plain; charset=utf-8")
                    .body("Grace period is thirty days.");
            })
            .await;

        let url = server.url("/policy.txt");
        let units = HttpDocumentFetcher::new(5)
            .expect("fetcher")
            .fetch(&url)
            .await
            .expect("units");

        mock.assert_async().await;
        assert_eq!(units, vec![TextUnit::new("Grace period is thirty days.", url)]);
    }

    #[tokio::test]
    async fn content_type_selects_docx_extraction() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/download");
                then.status(200)
                    .header(
                        "content-type",
                        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                    )
                    .body(docx_bytes(&paragraphs_xml(&["Clause one."])));
            })
            .await;

        let units = HttpDocumentFetcher::new(5)
            .expect("fetcher")
            .fetch(&server.url("/download"))
            .await
            .expect("units");

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, "Clause one.\n");
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.pdf");
                then.status(404);
            })
            .await;

        let error = HttpDocumentFetcher::new(5)
            .expect("fetcher")
            .fetch(&server.url("/missing.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(error, AcquisitionError::Status(404)));
    }

    #[tokio::test]
    async fn rejects_non_http_references() {
        let fetcher = HttpDocumentFetcher::new(5).expect("fetcher");
        assert!(matches!(
            fetcher.fetch("not a url").await,
            Err(AcquisitionError::InvalidUrl(_))
        ));
        assert!(matches!(
            fetcher.fetch("file:///etc/passwd").await,
            Err(AcquisitionError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_hard_error() {
        let error = HttpDocumentFetcher::new(2)
            .expect("fetcher")
            .fetch("http://127.0.0.1:1/policy.txt")
            .await
            .unwrap_err();
        assert!(matches!(error, AcquisitionError::Unreachable(_)));
    }
}
