//! HTTP request handlers for the gate.

pub mod fallback;
pub mod health;
pub mod me;
pub mod metrics;

pub use fallback::not_found;
pub use health::{health_check, readiness_check};
pub use me::get_me;
pub use metrics::metrics_handler;
