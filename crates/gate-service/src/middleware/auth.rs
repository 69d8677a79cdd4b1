//! Permission middleware for protected routes.
//!
//! Runs the auth pipeline for the route's required permission and injects the
//! verified `ClaimSet` into request extensions. Rejections are rendered by
//! `GateError`'s `IntoResponse` impl and the inner handler never runs.

use crate::auth::{AuthPipeline, ClaimSet};
use crate::errors::GateError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the permission middleware.
#[derive(Clone)]
pub struct PermissionGate {
    /// Shared auth pipeline.
    pub pipeline: Arc<AuthPipeline>,

    /// Permission every request through this gate must carry.
    pub permission: Arc<str>,
}

impl PermissionGate {
    pub fn new(pipeline: Arc<AuthPipeline>, permission: impl Into<Arc<str>>) -> Self {
        Self {
            pipeline,
            permission: permission.into(),
        }
    }
}

/// Middleware that admits only requests granting the gate's permission.
///
/// # Response
///
/// - 400/401 with the JSON error envelope on rejection
/// - 503 if the key set cannot be fetched
/// - Otherwise the inner handler's response, with `ClaimSet` in extensions
#[instrument(skip_all, name = "gate.middleware.auth")]
pub async fn require_permission(
    State(gate): State<PermissionGate>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, GateError> {
    let claims = gate
        .pipeline
        .authorize(req.headers(), &gate.permission)
        .await?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extension trait for reading the verified claims from a request.
pub trait ClaimsExt {
    /// Returns `None` if the permission middleware was not applied.
    fn claims(&self) -> Option<&ClaimSet>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn claims(&self) -> Option<&ClaimSet> {
        self.extensions().get::<ClaimSet>()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::{JwksResponse, KeySetSource, TokenVerifier};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    struct EmptySource;

    #[async_trait]
    impl KeySetSource for EmptySource {
        async fn key_set(&self) -> Result<Arc<JwksResponse>, GateError> {
            Ok(Arc::new(JwksResponse { keys: vec![] }))
        }
    }

    async fn handler(req: Request) -> &'static str {
        if req.claims().is_some() {
            "claims"
        } else {
            "no claims"
        }
    }

    fn test_app() -> Router {
        let pipeline = Arc::new(AuthPipeline::new(
            Arc::new(EmptySource),
            TokenVerifier::new("https://idp.example.com/", "pedalsdbapi", 0),
        ));
        let gate = PermissionGate::new(pipeline, "get:pedals");

        Router::new()
            .route("/pedals", get(handler))
            .route_layer(middleware::from_fn_with_state(gate, require_permission))
    }

    #[test]
    fn test_permission_gate_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<PermissionGate>();
    }

    #[tokio::test]
    async fn test_rejection_skips_handler() {
        let request = HttpRequest::builder()
            .uri("/pedals")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get("WWW-Authenticate").is_some());
    }

    #[tokio::test]
    async fn test_request_without_middleware_has_no_claims() {
        let req = HttpRequest::builder().body(Body::empty()).unwrap();
        assert!(req.claims().is_none());
    }
}
