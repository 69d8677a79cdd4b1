//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! This endpoint is unauthenticated to allow Prometheus to scrape metrics.
//! Labels are bounded and carry no token contents or subjects.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// # Response
///
/// Returns 200 OK with Prometheus text format:
/// ```text
/// # TYPE gate_auth_decisions_total counter
/// gate_auth_decisions_total{outcome="allowed"} 42
/// ```
#[tracing::instrument(skip_all, name = "gate.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
