//! Observability module: metric definitions and recorder setup.

pub mod metrics;
