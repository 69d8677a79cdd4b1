//! Current caller handler.

use crate::auth::ClaimSet;
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET /api/v1/me
///
/// Echoes the verified claim set exactly as the identity provider issued it.
/// Requires the permission middleware.
///
/// ## Response
///
/// ```json
/// {
///   "iss": "https://tenant.auth0.com/",
///   "sub": "auth0|abc123",
///   "aud": "pedalsdbapi",
///   "exp": 1700086400,
///   "permissions": ["get:me"]
/// }
/// ```
#[instrument(skip_all, name = "gate.handlers.me")]
pub async fn get_me(Extension(claims): Extension<ClaimSet>) -> Json<ClaimSet> {
    tracing::debug!(target: "gate.handlers.me", "Returning caller claims");
    Json(claims)
}
