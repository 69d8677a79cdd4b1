//! Gate Service Library
//!
//! Bearer-token authentication and permission enforcement for an HTTP API.
//! Every protected request is checked in four stages before its handler runs:
//!
//! ```text
//! Authorization header -> JWKS key by kid -> RS256 verify + claims -> required permission
//! ```
//!
//! Collaborators either call `auth::AuthPipeline` directly or wrap their
//! routers with `routes::protect`.
//!
//! # Modules
//!
//! - `auth` - The authentication pipeline and its stages
//! - `config` - Service configuration from environment
//! - `errors` - Rejections and faults with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Permission and metrics middleware
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
