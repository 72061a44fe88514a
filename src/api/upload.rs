//! `POST /upload-and-ask`: multipart files plus a `questions` form field.

use super::{AppError, RunResponse};
use crate::service::{DocumentQa, UploadedFile};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use std::sync::Arc;

const QUESTIONS_FIELD: &str = "questions";

/// Answer questions about one or more uploaded documents.
///
/// Every part carrying a file name is treated as a document; unsupported formats are skipped by
/// the service. The `questions` part is either a JSON array of strings or a comma-separated list.
pub(super) async fn upload_and_ask<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RunResponse>, AppError>
where
    S: DocumentQa,
{
    let mut multipart =
        multipart.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let mut files = Vec::new();
    let mut raw_questions = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::BadRequest(error.body_text()))?
    {
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let bytes = field
                .bytes()
                .await
                .map_err(|error| AppError::BadRequest(error.body_text()))?;
            tracing::debug!(file = %file_name, bytes = bytes.len(), "Received upload");
            files.push(UploadedFile {
                file_name,
                bytes: bytes.to_vec(),
            });
        } else if field.name() == Some(QUESTIONS_FIELD) {
            raw_questions = Some(
                field
                    .text()
                    .await
                    .map_err(|error| AppError::BadRequest(error.body_text()))?,
            );
        }
    }

    let raw_questions =
        raw_questions.ok_or_else(|| AppError::BadRequest("Missing questions field".into()))?;
    let questions = parse_questions(&raw_questions)?;
    if questions.is_empty() {
        return Err(AppError::BadRequest("No questions provided".into()));
    }
    if files.is_empty() {
        return Err(AppError::BadRequest("No files provided".into()));
    }

    tracing::info!(
        files = files.len(),
        questions = questions.len(),
        "Upload request received"
    );
    let answers = service.answer_from_uploads(files, &questions).await?;
    Ok(Json(RunResponse { answers }))
}

/// Parse the `questions` form value.
pub(super) fn parse_questions(raw: &str) -> Result<Vec<String>, AppError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        return serde_json::from_str::<Vec<String>>(trimmed).map_err(|error| {
            AppError::BadRequest(format!("Invalid questions format: {error}"))
        });
    }
    Ok(trimmed
        .split(',')
        .map(str::trim)
        .filter(|question| !question.is_empty())
        .map(str::to_string)
        .collect())
}
