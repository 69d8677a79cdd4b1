//! Authentication pipeline.
//!
//! Runs the four stages in order and stops at the first failure:
//!
//! ```text
//! extract_bearer_token -> KeyResolver::resolve -> TokenVerifier::verify -> check_permissions
//! ```
//!
//! The pipeline holds no per-request state. One instance is shared by every
//! request through an `Arc`.

use crate::auth::claims::ClaimSet;
use crate::auth::header::extract_bearer_token;
use crate::auth::jwks::{JwksClient, KeyResolver, KeySetSource};
use crate::auth::jwt::TokenVerifier;
use crate::auth::permissions::check_permissions;
use crate::config::Config;
use crate::errors::GateError;
use crate::observability::metrics::record_auth_decision;
use axum::http::HeaderMap;
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

/// Bearer-token authentication and permission gate.
pub struct AuthPipeline {
    resolver: KeyResolver,
    verifier: TokenVerifier,
}

impl AuthPipeline {
    /// Build a pipeline from an arbitrary key-set source.
    pub fn new(source: Arc<dyn KeySetSource>, verifier: TokenVerifier) -> Self {
        Self {
            resolver: KeyResolver::new(source),
            verifier,
        }
    }

    /// Build a pipeline that fetches keys from the configured JWKS endpoint.
    pub fn from_config(config: &Config) -> Self {
        let client = JwksClient::with_options(
            config.jwks_url.clone(),
            config.jwks_timeout,
            config.jwks_cache_ttl,
        );
        let verifier = TokenVerifier::new(
            config.issuer.clone(),
            config.api_audience.clone(),
            config.jwt_leeway_seconds,
        );

        Self::new(Arc::new(client), verifier)
    }

    /// Authenticate the request and check it grants `permission`.
    ///
    /// Returns the verified claim set unchanged.
    ///
    /// # Errors
    ///
    /// - `GateError::Auth` - the first rejection raised by any stage
    /// - `GateError::KeySetUnavailable` - the key set could not be fetched
    #[instrument(skip_all, name = "gate.auth.authorize", fields(permission = %permission))]
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        permission: &str,
    ) -> Result<ClaimSet, GateError> {
        let result = self.authorize_inner(headers, permission).await;

        match &result {
            Ok(_) => {
                record_auth_decision("allowed");
                tracing::debug!(target: "gate.auth", "Request authorized");
            }
            Err(e) => {
                record_auth_decision(e.label());
                tracing::debug!(target: "gate.auth", outcome = e.label(), "Request rejected");
            }
        }

        result
    }

    async fn authorize_inner(
        &self,
        headers: &HeaderMap,
        permission: &str,
    ) -> Result<ClaimSet, GateError> {
        let token = extract_bearer_token(headers)?;
        let claims = self.authenticate_token(token).await?;
        check_permissions(permission, &claims)?;
        Ok(claims)
    }

    /// Resolve the key for `token` and verify it. No permission check.
    ///
    /// # Errors
    ///
    /// Same as `authorize`, minus the permission rejections.
    #[instrument(skip_all, name = "gate.auth.authenticate")]
    pub async fn authenticate_token(&self, token: &str) -> Result<ClaimSet, GateError> {
        let key = self.resolver.resolve(token).await?;
        Ok(self.verifier.verify(token, key.as_ref())?)
    }

    /// Run `operation` with the verified claim set if the request grants `permission`.
    ///
    /// The operation is never invoked when any stage rejects the request.
    ///
    /// # Errors
    ///
    /// Returns the rejection or key-set fault from `authorize`.
    pub async fn guard<F, Fut, T>(
        &self,
        headers: &HeaderMap,
        permission: &str,
        operation: F,
    ) -> Result<T, GateError>
    where
        F: FnOnce(ClaimSet) -> Fut,
        Fut: Future<Output = T>,
    {
        let claims = self.authorize(headers, permission).await?;
        Ok(operation(claims).await)
    }

    /// Fetch the key set once and return how many keys it holds.
    ///
    /// # Errors
    ///
    /// Returns `GateError::KeySetUnavailable` if the fetch fails.
    pub async fn check_key_set(&self) -> Result<usize, GateError> {
        self.resolver.probe().await
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::JwksResponse;
    use crate::errors::AuthError;
    use async_trait::async_trait;
    use axum::http::{header::AUTHORIZATION, HeaderValue};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeySetSource for CountingSource {
        async fn key_set(&self) -> Result<Arc<JwksResponse>, GateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(JwksResponse { keys: vec![] }))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl KeySetSource for FailingSource {
        async fn key_set(&self) -> Result<Arc<JwksResponse>, GateError> {
            Err(GateError::KeySetUnavailable("connection refused".to_string()))
        }
    }

    fn pipeline_with(source: Arc<dyn KeySetSource>) -> AuthPipeline {
        AuthPipeline::new(
            source,
            TokenVerifier::new("https://idp.example.com/", "pedalsdbapi", 0),
        )
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    fn token_with_kid(kid: &str) -> String {
        let header = format!(r#"{{"alg":"RS256","typ":"JWT","kid":"{}"}}"#, kid);
        format!("{}.e30.sig", URL_SAFE_NO_PAD.encode(header.as_bytes()))
    }

    #[tokio::test]
    async fn test_missing_header_short_circuits() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline_with(source.clone());

        let err = pipeline
            .authorize(&HeaderMap::new(), "get:pedals")
            .await
            .unwrap_err();

        assert_eq!(err.as_auth(), Some(AuthError::MissingHeader));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_kid_is_key_not_found() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline_with(source.clone());

        let err = pipeline
            .authorize(&bearer(&token_with_kid("rotated-away")), "get:pedals")
            .await
            .unwrap_err();

        assert_eq!(err.as_auth(), Some(AuthError::KeyNotFound));
        assert_eq!(err.status_code(), 400);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_key_set_fault_is_not_a_rejection() {
        let pipeline = pipeline_with(Arc::new(FailingSource));

        let err = pipeline
            .authorize(&bearer(&token_with_kid("key-1")), "get:pedals")
            .await
            .unwrap_err();

        assert!(matches!(err, GateError::KeySetUnavailable(_)));
        assert_eq!(err.status_code(), 503);
    }

    #[tokio::test]
    async fn test_guard_does_not_invoke_operation_on_rejection() {
        let pipeline = pipeline_with(Arc::new(FailingSource));
        let invoked = AtomicBool::new(false);
        let flag = &invoked;

        let result = pipeline
            .guard(&HeaderMap::new(), "post:manufacturers", move |_claims| async move {
                flag.store(true, Ordering::SeqCst);
            })
            .await;

        assert_eq!(
            result.unwrap_err().as_auth(),
            Some(AuthError::MissingHeader)
        );
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_check_key_set_reports_fault() {
        let pipeline = pipeline_with(Arc::new(FailingSource));
        assert!(matches!(
            pipeline.check_key_set().await,
            Err(GateError::KeySetUnavailable(_))
        ));
    }

    #[test]
    fn test_from_config_uses_configured_issuer_and_audience() {
        let vars = std::collections::HashMap::from([
            ("AUTH_DOMAIN".to_string(), "idp.example.com".to_string()),
            ("API_AUDIENCE".to_string(), "pedalsdbapi".to_string()),
        ]);
        let config = Config::from_vars(&vars).unwrap();

        let pipeline = AuthPipeline::from_config(&config);

        assert_eq!(pipeline.verifier().issuer(), "https://idp.example.com/");
        assert_eq!(pipeline.verifier().audience(), "pedalsdbapi");
    }
}
