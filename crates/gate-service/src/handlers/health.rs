//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - checks the identity provider's key set can be fetched

use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

/// Readiness probe body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
}

/// Liveness probe handler.
///
/// Does NOT check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Fetches the key set once. Returns 200 if it can be fetched, 503 otherwise.
/// The fetch error is logged server-side only.
#[tracing::instrument(skip_all, name = "gate.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.pipeline.check_key_set().await {
        Ok(key_count) => {
            tracing::debug!(target: "gate.health", key_count, "Readiness check passed");
            (StatusCode::OK, Json(ReadinessResponse { status: "ready" }))
        }
        Err(e) => {
            tracing::warn!(target: "gate.health", error = %e, "Readiness check failed: key set unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                }),
            )
        }
    }
}
