//! Bearer token extraction from the `Authorization` header.

use crate::errors::AuthError;
use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Extract the raw bearer token from request headers.
///
/// Expected format:
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// The scheme is matched case-insensitively and the value must split into
/// exactly two whitespace-separated parts. The token is returned verbatim.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or_else(|| {
        tracing::debug!(target: "gate.auth.header", "Missing Authorization header");
        AuthError::MissingHeader
    })?;

    let value = value.to_str().map_err(|_| {
        tracing::debug!(target: "gate.auth.header", "Authorization header is not visible ASCII");
        AuthError::MalformedHeader
    })?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => {
            tracing::debug!(target: "gate.auth.header", "Invalid Authorization header format");
            Err(AuthError::MalformedHeader)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            extract_bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingHeader)
        );
    }

    #[test]
    fn test_valid_bearer_header() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(extract_bearer_token(&headers), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        for scheme in ["bearer", "BEARER", "BeArEr"] {
            let headers = headers_with(&format!("{} tok", scheme));
            assert_eq!(extract_bearer_token(&headers), Ok("tok"), "scheme {scheme}");
        }
    }

    #[test]
    fn test_wrong_scheme_is_malformed() {
        let headers = headers_with("Basic dXNlcjpwYXNz");
        assert_eq!(
            extract_bearer_token(&headers),
            Err(AuthError::MalformedHeader)
        );
    }

    #[test]
    fn test_missing_token_is_malformed() {
        for value in ["Bearer", "Bearer ", ""] {
            let headers = headers_with(value);
            assert_eq!(
                extract_bearer_token(&headers),
                Err(AuthError::MalformedHeader),
                "value {value:?}"
            );
        }
    }

    #[test]
    fn test_extra_parts_are_malformed() {
        let headers = headers_with("Bearer abc def");
        assert_eq!(
            extract_bearer_token(&headers),
            Err(AuthError::MalformedHeader)
        );
    }

    #[test]
    fn test_token_only_is_malformed() {
        let headers = headers_with("abc.def.ghi");
        assert_eq!(
            extract_bearer_token(&headers),
            Err(AuthError::MalformedHeader)
        );
    }

    #[test]
    fn test_token_returned_verbatim() {
        // No decoding or trimming of the token itself
        let headers = headers_with("Bearer a-b_c.D+E/F==.x");
        assert_eq!(extract_bearer_token(&headers), Ok("a-b_c.D+E/F==.x"));
    }

    #[test]
    fn test_non_ascii_header_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap(),
        );
        assert_eq!(
            extract_bearer_token(&headers),
            Err(AuthError::MalformedHeader)
        );
    }
}
