//! Error type rendered by the HTTP handlers as `{"error": ...}` bodies.

use crate::pipeline::PipelineError;
use crate::service::ServiceError;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use serde_json::json;

const INTERNAL_ERROR: &str = "Internal server error";

/// Error type returned by every handler, rendered as `{ "error": message }`.
#[derive(Debug)]
pub enum AppError {
    /// Missing or wrong bearer token.
    Unauthorized,
    /// Malformed or incomplete request.
    BadRequest(String),
    /// Failure reported by the question-answering service.
    Service(ServiceError),
}

impl From<ServiceError> for AppError {
    fn from(inner: ServiceError) -> Self {
        Self::Service(inner)
    }
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Invalid or missing bearer token".to_string(),
            ),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Service(ServiceError::Acquisition(error)) => {
                (StatusCode::BAD_REQUEST, error.to_string())
            }
            Self::Service(error @ ServiceError::NoUsableDocuments)
            | Self::Service(error @ ServiceError::Pipeline(PipelineError::EmptyDocument)) => {
                (StatusCode::BAD_REQUEST, error.to_string())
            }
            Self::Service(ServiceError::Pipeline(PipelineError::Embedding(error))) => {
                tracing::error!(error = %error, "Request failed while indexing the document");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to index document".to_string(),
                )
            }
            Self::Service(error) => {
                tracing::error!(error = %error, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let mut response = (status, Json(json!({ "error": message }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
