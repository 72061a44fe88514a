//! Bearer-token gate for the protected routes.

use super::error::AppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Holds the digest of the configured token; the plain secret is not kept around.
#[derive(Clone)]
pub(crate) struct BearerGate {
    digest: Arc<[u8]>,
}

impl BearerGate {
    pub(crate) fn new(token: &str) -> Self {
        Self {
            digest: Arc::from(Sha256::digest(token.as_bytes()).as_slice()),
        }
    }

    fn admits(&self, presented: &str) -> bool {
        Sha256::digest(presented.as_bytes()).as_slice() == &*self.digest
    }
}

/// Reject the request with 401 unless it carries `Authorization: Bearer <token>`.
pub(crate) async fn require_bearer(
    State(gate): State<BearerGate>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token);
    let authorized = presented.is_some_and(|token| gate.admits(token));

    if authorized {
        return next.run(request).await;
    }
    tracing::warn!(
        path = %request.uri().path(),
        token_present = presented.is_some(),
        "Rejected request with missing or invalid bearer token"
    );
    AppError::Unauthorized.into_response()
}

/// Token from an `Authorization` value; the scheme name is case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}
