//! Gate error types.
//!
//! `AuthError` is the rejection taxonomy of the authentication pipeline. Every
//! variant carries a fixed client-facing message and status code.
//!
//! `GateError` wraps `AuthError` together with the faults that are NOT
//! rejections (key set unreachable, internal errors). All of them render to
//! the same JSON envelope via the `IntoResponse` impl:
//!
//! ```json
//! {"error": 401, "success": false, "message": "Token expired"}
//! ```
//!
//! 5xx bodies carry generic messages. The actual cause is logged server-side.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Typed rejection raised by one of the pipeline stages.
///
/// The `Display` text of each variant is the exact message returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No header present")]
    MissingHeader,

    #[error("Malformed header")]
    MalformedHeader,

    #[error("No kid in header")]
    MissingKid,

    #[error("Cannot find key")]
    KeyNotFound,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid claims")]
    InvalidClaims,

    #[error("Cannot parse token")]
    CannotParseToken,

    #[error("Permissions not in payload")]
    PermissionsMissing,

    #[error("Required permission not in permissions list")]
    PermissionDenied,
}

impl AuthError {
    /// Returns the HTTP status code for this rejection.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MissingHeader
            | AuthError::MalformedHeader
            | AuthError::MissingKid
            | AuthError::TokenExpired
            | AuthError::InvalidClaims
            | AuthError::PermissionDenied => 401,
            AuthError::KeyNotFound
            | AuthError::CannotParseToken
            | AuthError::PermissionsMissing => 400,
        }
    }

    /// Bounded label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::MissingKid => "missing_kid",
            AuthError::KeyNotFound => "key_not_found",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims => "invalid_claims",
            AuthError::CannotParseToken => "cannot_parse_token",
            AuthError::PermissionsMissing => "permissions_missing",
            AuthError::PermissionDenied => "permission_denied",
        }
    }
}

/// Gate error type.
///
/// Maps to HTTP status codes:
/// - Auth: the rejection's own status (400 or 401)
/// - KeySetUnavailable: 503 Service Unavailable
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Key set unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl GateError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GateError::Auth(err) => err.status_code(),
            GateError::KeySetUnavailable(_) => 503,
            GateError::Internal => 500,
        }
    }

    /// Bounded outcome label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            GateError::Auth(err) => err.label(),
            GateError::KeySetUnavailable(_) => "key_set_unavailable",
            GateError::Internal => "internal",
        }
    }

    /// Returns the rejection if this error is one.
    pub fn as_auth(&self) -> Option<AuthError> {
        match self {
            GateError::Auth(err) => Some(*err),
            _ => None,
        }
    }
}

/// JSON body shared by every error response.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: u16,
    pub success: bool,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: status.as_u16(),
            success: false,
            message: message.into(),
        }
    }

    /// Render the envelope with `status`.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            GateError::Auth(err) => (
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::UNAUTHORIZED),
                err.to_string(),
            ),
            GateError::KeySetUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "gate.availability", reason = %reason, "Key set unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service unavailable".to_string(),
                )
            }
            GateError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        let mut response = ErrorEnvelope::new(status, message).into_response_with(status);

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"api\", error=\"invalid_token\""),
            );
        }

        response
    }
}
