use crate::errors::Error;
use crate::metrics::UNAUTHORIZED_TOTAL;
use crate::rest::{AppError, AppState};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

/// Single shared-secret bearer authentication.
#[derive(Clone)]
pub struct ApiKeyAuth {
    expected_key: Arc<str>,
}

impl ApiKeyAuth {
    pub fn new(api_key: &str) -> Self {
        Self {
            expected_key: Arc::from(api_key),
        }
    }

    pub fn validate_bearer(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == &*self.expected_key)
    }
}

/// Middleware guarding the `/api/v1` routes.
pub async fn require_bearer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.auth.validate_bearer(req.headers()) {
        UNAUTHORIZED_TOTAL.inc();
        warn!(uri = %req.uri(), "rejected request without valid bearer token");
        return Err(state.reject(Error::Unauthorized));
    }
    Ok(next.run(req).await)
}
