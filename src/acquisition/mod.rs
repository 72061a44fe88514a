//! Document acquisition: download or accept a document and turn it into text units.
//!
//! Nothing here knows about chunks or embeddings. The pipeline only sees the
//! `Vec<TextUnit>` produced by [`DocumentFetcher::fetch`] or [`extract_units`].

mod extract;
mod fetch;

use std::fmt;
use thiserror::Error;

pub use extract::extract_units;
pub use fetch::{DocumentFetcher, HttpDocumentFetcher};

/// Document formats the service can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// Plain text, decoded as UTF-8.
    Text,
}

impl DocumentKind {
    /// Map a file extension (without the dot, any case) to a supported kind.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    /// Kind of an uploaded file, judged by its name. `None` means the file is not supported.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, extension) = file_name.rsplit_once('.')?;
        Self::from_extension(extension)
    }

    /// Kind of a downloaded document.
    ///
    /// The URL path extension wins (query string and fragment ignored), then the response
    /// `Content-Type`; anything unrecognised is treated as plain text.
    pub fn detect(url: &str, content_type: Option<&str>) -> Self {
        let from_path = reqwest::Url::parse(url).ok().and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
                .and_then(|name| Self::from_file_name(&name))
        });
        if let Some(kind) = from_path {
            return kind;
        }

        match content_type.map(str::to_ascii_lowercase) {
            Some(value) if value.contains("pdf") => Self::Pdf,
            Some(value) if value.contains("word") || value.contains("docx") => Self::Docx,
            _ => Self::Text,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Text => "text",
        };
        f.write_str(label)
    }
}

/// Errors raised while obtaining document text.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Document reference is not an absolute http(s) URL.
    #[error("Invalid document URL: {0}")]
    InvalidUrl(String),
    /// Document host could not be reached.
    #[error("Failed to download document: {0}")]
    Unreachable(String),
    /// Download did not finish within the configured timeout.
    #[error("Document download timed out after {0}s")]
    Timeout(u64),
    /// Document host answered with a non-success status.
    #[error("Document host responded with status {0}")]
    Status(u16),
    /// Bytes were received but could not be parsed as the detected format.
    #[error("Failed to extract text from {kind} document: {reason}")]
    Extraction {
        /// Format the bytes were parsed as.
        kind: DocumentKind,
        /// Parser failure description.
        reason: String,
    },
}
