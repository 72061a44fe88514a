//! HTTP surface for the document Q&A service.
//!
//! Routes:
//!
//! - `GET /` – Health payload, no authentication.
//! - `POST /hackrx/run` – Download the document at `documents` and answer `questions`.
//! - `POST /upload-and-ask` – Multipart upload of one or more files plus a `questions` field.
//! - `GET /metrics` – Request, chunk and answer counters since startup.
//!
//! Everything except the health check requires `Authorization: Bearer <API_BEARER_TOKEN>`.
//! Errors are always JSON `{ "error": message }`.

mod auth;
mod error;
mod upload;

pub use error::AppError;

use crate::config::Config;
use crate::metrics::MetricsSnapshot;
use crate::service::DocumentQa;
use auth::BearerGate;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    middleware,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Settings the router needs from the service configuration.
#[derive(Clone)]
pub struct ApiSettings {
    /// Secret every protected request must present.
    pub bearer_token: String,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
}

impl ApiSettings {
    /// Extract router settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            bearer_token: config.api_token.clone(),
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }
}

/// Build the HTTP router exposing the question-answering API.
pub fn create_router<S>(service: Arc<S>, settings: ApiSettings) -> Router
where
    S: DocumentQa + 'static,
{
    let gate = BearerGate::new(&settings.bearer_token);
    let protected = Router::new()
        .route("/hackrx/run", post(run_questions::<S>))
        .route("/upload-and-ask", post(upload::upload_and_ask::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route_layer(middleware::from_fn_with_state(gate, auth::require_bearer));

    Router::new()
        .route("/", get(health))
        .merge(protected)
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Request body for `POST /hackrx/run`.
#[derive(Deserialize)]
struct RunRequest {
    /// URL of the document to answer from.
    #[serde(default)]
    documents: String,
    /// Questions to answer, in order.
    #[serde(default)]
    questions: Vec<String>,
}

/// Response body shared by both answering endpoints.
#[derive(Debug, Serialize)]
pub(crate) struct RunResponse {
    answers: Vec<String>,
}

async fn health() -> Json<Value> {
    Json(json!({
        "message": "Document Q&A API is running",
        "status": "healthy"
    }))
}

/// Answer questions about a remote document.
async fn run_questions<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<RunResponse>, AppError>
where
    S: DocumentQa,
{
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let RunRequest {
        documents,
        questions,
    } = request;
    let url = documents.trim();
    if url.is_empty() {
        return Err(AppError::BadRequest("No document URL provided".into()));
    }
    if questions.is_empty() {
        return Err(AppError::BadRequest("No questions provided".into()));
    }

    tracing::info!(questions = questions.len(), "Run request received");
    let answers = service.answer_from_url(url, &questions).await?;
    Ok(Json(RunResponse { answers }))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: DocumentQa,
{
    Json(service.metrics_snapshot())
}
