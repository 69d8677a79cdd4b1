//! Fallback for unmatched routes.

use crate::errors::ErrorEnvelope;
use axum::{http::StatusCode, response::Response};

/// 404 with the standard error envelope.
pub async fn not_found() -> Response {
    ErrorEnvelope::new(StatusCode::NOT_FOUND, "resource was not found")
        .into_response_with(StatusCode::NOT_FOUND)
}
