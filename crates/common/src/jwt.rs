//! JWT utilities shared across services.
//!
//! This module provides the pieces of JWT handling that run before any
//! cryptographic verification:
//! - Size limits for DoS prevention
//! - Leeway bounds for expiry validation
//! - Key ID extraction from the unverified JWT header
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing in this module verifies a signature. A `kid` obtained here is only
//!   a lookup hint into a trusted key set; the token MUST still be verified.
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_kid, JwtValidationError};
//!
//! match extract_kid(token) {
//!     Ok(Some(kid)) => { /* look the key up in the JWKS */ }
//!     Ok(None) => { /* kid present but not a string: matches no key */ }
//!     Err(JwtValidationError::MissingKid) => { /* reject: no kid */ }
//!     Err(_) => { /* reject: unparseable token */ }
//! }
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any base64 decoding or
/// cryptographic operations.
///
/// - Typical RS256 access tokens are 700-1200 bytes
/// - Identity-provider tokens with many permissions rarely exceed 4KB
/// - Checked BEFORE base64 decode and signature verification
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Maximum allowed leeway for `exp`/`nbf` validation (10 minutes).
///
/// Prevents misconfiguration from turning expiry checks into no-ops.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while reading the unverified JWT header.
///
/// Detailed causes are logged at debug level; the variants only carry what a
/// caller needs to pick the right rejection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("Token exceeds maximum allowed size")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("Token is not a well-formed JWT")]
    MalformedToken,

    /// Token header has no `kid` field.
    #[error("Token header has no kid")]
    MissingKid,
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the token signature
/// - The `kid` value should only be used for key lookup in a trusted JWKS
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - Not three dot-separated parts, bad base64url, or the
///   header is not a JSON object
/// - `MissingKid` - Header has no `kid` field
///
/// A `kid` that is present but not a JSON string yields `Ok(None)`. Strings,
/// including the empty string, are returned as-is.
pub fn extract_kid(token: &str) -> Result<Option<String>, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    let (Some(header_part), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    if !header.is_object() {
        tracing::debug!(target: "common.jwt", "JWT header is not a JSON object");
        return Err(JwtValidationError::MalformedToken);
    }

    let kid = header.get("kid").ok_or(JwtValidationError::MissingKid)?;

    Ok(kid.as_str().map(ToString::to_string))
}
