//! Metrics definitions for the gate.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gate_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: 5 values (known routes plus `/other`)
//! - `status`: 3 values (success, error, timeout)
//! - `outcome`: `allowed` plus one label per rejection/fault variant

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("gate_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // JWKS fetch is bounded by the fetch timeout (max 60s)
        .set_buckets_for_metric(
            Matcher::Prefix("gate_jwks_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `gate_http_requests_total`, `gate_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("gate_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("gate_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path to a bounded endpoint label.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/v1/me" => "/api/v1/me",
        _ => "/other",
    }
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Record the outcome of one authorization check.
///
/// Metric: `gate_auth_decisions_total`
/// Labels: `outcome` ("allowed" or a rejection label such as "token_expired")
pub fn record_auth_decision(outcome: &'static str) {
    counter!("gate_auth_decisions_total", "outcome" => outcome).increment(1);
}

/// Record one JWKS fetch.
///
/// Metric: `gate_jwks_fetch_total`, `gate_jwks_fetch_duration_seconds`
/// Labels: `status` ("success" or "error")
pub fn record_jwks_fetch(status: &'static str, duration: Duration) {
    histogram!("gate_jwks_fetch_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());

    counter!("gate_jwks_fetch_total", "status" => status).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These execute the recording functions against the global no-op recorder.
    // Values are not inspected.

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, Duration::from_millis(5));
        record_http_request("GET", "/api/v1/me", 200, Duration::from_millis(50));
        record_http_request("GET", "/api/v1/me", 401, Duration::from_millis(10));
        record_http_request("GET", "/api/v1/me", 504, Duration::from_secs(30));
        record_http_request("GET", "/nope", 404, Duration::from_millis(1));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(400), "error");
        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(503), "error");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
    }

    #[test]
    fn test_normalize_endpoint_known_paths() {
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/ready"), "/ready");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(normalize_endpoint("/api/v1/me"), "/api/v1/me");
    }

    #[test]
    fn test_normalize_endpoint_unknown_paths() {
        assert_eq!(normalize_endpoint("/"), "/other");
        assert_eq!(normalize_endpoint("/api/v1/pedals/42"), "/other");
        assert_eq!(normalize_endpoint("/api/v1/me/"), "/other");
    }

    #[test]
    fn test_record_auth_and_jwks_metrics() {
        record_auth_decision("allowed");
        record_auth_decision("token_expired");
        record_jwks_fetch("success", Duration::from_millis(40));
        record_jwks_fetch("error", Duration::from_secs(10));
    }
}
