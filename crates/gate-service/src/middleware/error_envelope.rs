//! Error envelopes for responses produced outside the handlers.
//!
//! Axum answers an unsupported method with an empty 405, and a panicking
//! handler never reaches `GateError`. Both are rewritten here so every error
//! a client sees carries the `{error, success, message}` body.

use crate::errors::{ErrorEnvelope, GateError};
use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;

/// Replace the router's bare 405 with the error envelope.
///
/// The `Allow` header is kept. A 405 that already has a body type is passed
/// through untouched.
pub async fn method_not_allowed_envelope(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if response.status() != StatusCode::METHOD_NOT_ALLOWED
        || response.headers().contains_key(header::CONTENT_TYPE)
    {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut envelope = ErrorEnvelope::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        .into_response_with(StatusCode::METHOD_NOT_ALLOWED);

    if let Some(allow) = allow {
        envelope.headers_mut().insert(header::ALLOW, allow);
    }

    envelope
}

/// Render a caught handler panic as the 500 envelope.
///
/// The panic payload is logged, never returned to the client.
pub fn panic_envelope(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");

    tracing::error!(target: "gate.middleware.errors", detail = %detail, "Handler panicked");

    GateError::Internal.into_response()
}
