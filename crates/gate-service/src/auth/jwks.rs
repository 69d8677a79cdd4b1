//! Key resolution against the identity provider's JWKS.
//!
//! `JwksClient` fetches the JSON Web Key Set from the provider's
//! `/.well-known/jwks.json` endpoint. By default every call fetches a fresh
//! copy; a TTL can be configured to cache the key set between calls.
//!
//! `KeyResolver` reads the `kid` from the unverified token header and picks the
//! matching key out of the fetched set.
//!
//! # Failure model
//!
//! - A token without a `kid` is rejected before any network call
//! - A fetch that fails (transport, non-2xx, bad JSON) is NOT a token
//!   rejection: it surfaces as `GateError::KeySetUnavailable` (5xx)
//! - A `kid` that matches nothing resolves to `None`; the verifier turns that
//!   into a rejection
//! - Nothing is retried

use crate::errors::{AuthError, GateError};
use crate::observability::metrics::record_jwks_fetch;
use async_trait::async_trait;
use common::jwt::{extract_kid, JwtValidationError};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

/// Default fetch timeout in seconds.
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for RS256 keys).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Key use ("sig" for signing keys).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm the key is meant for.
    #[serde(default)]
    pub alg: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// The key record selected for one verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKey {
    pub kty: String,
    pub kid: String,
    pub key_use: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
}

impl From<&Jwk> for SigningKey {
    fn from(jwk: &Jwk) -> Self {
        Self {
            kty: jwk.kty.clone(),
            kid: jwk.kid.clone(),
            key_use: jwk.key_use.clone(),
            n: jwk.n.clone(),
            e: jwk.e.clone(),
        }
    }
}

/// Source of the identity provider's current key set.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Return the current key set.
    ///
    /// # Errors
    ///
    /// Returns `GateError::KeySetUnavailable` if the key set cannot be obtained.
    async fn key_set(&self) -> Result<Arc<JwksResponse>, GateError>;
}

/// Cached key set with expiry time.
struct CachedJwks {
    jwks: Arc<JwksResponse>,
    expires_at: Instant,
}

/// HTTP client for the JWKS endpoint.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Last fetched key set, only populated when `cache_ttl` is set.
    cache: RwLock<Option<CachedJwks>>,

    /// Cache TTL. `None` fetches on every call.
    cache_ttl: Option<Duration>,
}

impl JwksClient {
    /// Create a non-caching client with the default timeout.
    pub fn new(jwks_url: String) -> Self {
        Self::with_options(jwks_url, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS), None)
    }

    /// Create a client with an explicit fetch timeout and optional cache TTL.
    pub fn with_options(jwks_url: String, timeout: Duration, cache_ttl: Option<Duration>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gate.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: RwLock::new(None),
            cache_ttl,
        }
    }

    /// URL this client fetches from.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetch the key set from the endpoint.
    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<JwksResponse, GateError> {
        tracing::debug!(target: "gate.auth.jwks", url = %self.jwks_url, "Fetching JWKS");
        let start = Instant::now();

        let result = self.fetch_inner().await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_jwks_fetch(status, start.elapsed());

        result
    }

    async fn fetch_inner(&self) -> Result<JwksResponse, GateError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to fetch JWKS");
                GateError::KeySetUnavailable(format!("JWKS request failed: {}", e))
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "gate.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(GateError::KeySetUnavailable(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to parse JWKS response");
            GateError::KeySetUnavailable(format!("JWKS document is malformed: {}", e))
        })?;

        tracing::debug!(
            target: "gate.auth.jwks",
            key_count = jwks.keys.len(),
            "JWKS fetched"
        );

        Ok(jwks)
    }
}

#[async_trait]
impl KeySetSource for JwksClient {
    async fn key_set(&self) -> Result<Arc<JwksResponse>, GateError> {
        let Some(ttl) = self.cache_ttl else {
            return self.fetch().await.map(Arc::new);
        };

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    tracing::debug!(target: "gate.auth.jwks", "JWKS cache hit");
                    return Ok(Arc::clone(&cached.jwks));
                }
            }
        }

        let jwks = Arc::new(self.fetch().await?);

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            jwks: Arc::clone(&jwks),
            expires_at: Instant::now() + ttl,
        });

        Ok(jwks)
    }
}

/// Pick the key whose `kid` matches. The first match wins.
pub fn select_key(jwks: &JwksResponse, kid: &str) -> Option<SigningKey> {
    let mut matches = jwks.keys.iter().filter(|key| key.kid == kid);
    let selected = matches.next().map(SigningKey::from);

    if selected.is_some() && matches.next().is_some() {
        tracing::warn!(target: "gate.auth.jwks", kid = %kid, "Multiple JWKS entries share a kid, using the first");
    }

    selected
}

/// Resolves the signing key for a token.
#[derive(Clone)]
pub struct KeyResolver {
    source: Arc<dyn KeySetSource>,
}

impl KeyResolver {
    pub fn new(source: Arc<dyn KeySetSource>) -> Self {
        Self { source }
    }

    /// Resolve the key a token claims to be signed with.
    ///
    /// Returns `Ok(None)` when the key set has no key with the token's `kid`.
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingKid` - header has no `kid` field (no network call made)
    /// - `AuthError::CannotParseToken` - header cannot be decoded (no network call made)
    /// - `GateError::KeySetUnavailable` - key set could not be fetched
    #[instrument(skip_all)]
    pub async fn resolve(&self, token: &str) -> Result<Option<SigningKey>, GateError> {
        let kid = extract_kid(token).map_err(|e| {
            tracing::debug!(target: "gate.auth.jwks", error = %e, "Token kid extraction failed");
            match e {
                JwtValidationError::MissingKid => AuthError::MissingKid,
                JwtValidationError::TokenTooLarge | JwtValidationError::MalformedToken => {
                    AuthError::CannotParseToken
                }
            }
        })?;

        let jwks = self.source.key_set().await?;

        // A non-string kid is still fetched against but can match no entry
        let key = kid.as_deref().and_then(|kid| select_key(&jwks, kid));

        if key.is_none() {
            tracing::debug!(target: "gate.auth.jwks", kid = ?kid, "No JWKS entry matches token kid");
        }

        Ok(key)
    }

    /// Check that the key set can currently be obtained.
    pub async fn probe(&self) -> Result<usize, GateError> {
        Ok(self.source.key_set().await?.keys.len())
    }
}
