//! HTTP middleware for the gate.
//!
//! # Components
//!
//! - `auth` - Permission middleware for protected routes
//! - `error_envelope` - JSON envelopes for 405s and caught panics
//! - `http_metrics` - Request metrics for every response

pub mod auth;
pub mod error_envelope;
pub mod http_metrics;

pub use auth::{require_permission, ClaimsExt, PermissionGate};
pub use error_envelope::{method_not_allowed_envelope, panic_envelope};
pub use http_metrics::http_metrics_middleware;
