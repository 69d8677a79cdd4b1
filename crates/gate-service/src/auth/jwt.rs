//! Token verification.
//!
//! Verifies the RS256 signature of a bearer token against the key selected by
//! `KeyResolver` and validates its registered claims.
//!
//! # Security
//!
//! - Only RS256 is accepted, regardless of what the token header claims
//! - `exp`, `aud` and `iss` are required; `nbf` is honored when present
//! - Expiry is evaluated against the clock at call time, with the configured
//!   leeway (zero by default)

use crate::auth::claims::ClaimSet;
use crate::auth::jwks::SigningKey;
use crate::errors::AuthError;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::instrument;

/// Algorithms a token may be signed with.
pub const ACCEPTED_ALGORITHMS: [Algorithm; 1] = [Algorithm::RS256];

/// Claims that must be present in every token.
const REQUIRED_CLAIMS: [&str; 3] = ["exp", "aud", "iss"];

/// Verifies tokens issued by one identity provider for one audience.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    issuer: String,
    audience: String,
    leeway_seconds: u64,
}

impl TokenVerifier {
    /// Create a verifier.
    ///
    /// # Arguments
    ///
    /// * `issuer` - Expected `iss`, e.g. `https://idp.example.com/`
    /// * `audience` - Expected member of `aud`
    /// * `leeway_seconds` - Tolerance applied to `exp` and `nbf`
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>, leeway_seconds: u64) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            leeway_seconds,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` - `key` is `None`
    /// - `TokenExpired` - signature valid but `exp` has passed
    /// - `InvalidClaims` - wrong `aud` or `iss`, missing required claim, or `nbf` in the future
    /// - `CannotParseToken` - anything else (bad signature, disallowed algorithm,
    ///   undecodable token, unusable key)
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str, key: Option<&SigningKey>) -> Result<ClaimSet, AuthError> {
        let Some(key) = key else {
            tracing::debug!(target: "gate.auth.jwt", "No signing key resolved for token");
            return Err(AuthError::KeyNotFound);
        };

        let decoding_key = decoding_key_for(key)?;

        let token_data =
            decode::<ClaimSet>(token, &decoding_key, &self.validation()).map_err(|e| {
                let rejection = classify(&e);
                tracing::debug!(
                    target: "gate.auth.jwt",
                    error = %e,
                    rejection = rejection.label(),
                    "Token verification failed"
                );
                rejection
            })?;

        tracing::debug!(target: "gate.auth.jwt", kid = %key.kid, "Token verified");
        Ok(token_data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&REQUIRED_CLAIMS);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = self.leeway_seconds;
        validation
    }
}

/// Build an RSA decoding key from the selected JWK.
fn decoding_key_for(key: &SigningKey) -> Result<DecodingKey, AuthError> {
    if key.kty != "RSA" {
        tracing::warn!(target: "gate.auth.jwt", kid = %key.kid, kty = %key.kty, "Unexpected JWK key type");
        return Err(AuthError::CannotParseToken);
    }

    let (Some(n), Some(e)) = (key.n.as_deref(), key.e.as_deref()) else {
        tracing::warn!(target: "gate.auth.jwt", kid = %key.kid, "JWK missing RSA components");
        return Err(AuthError::CannotParseToken);
    };

    DecodingKey::from_rsa_components(n, e).map_err(|err| {
        tracing::warn!(target: "gate.auth.jwt", kid = %key.kid, error = %err, "Invalid RSA components");
        AuthError::CannotParseToken
    })
}

/// Map a verification failure to its rejection.
fn classify(error: &JwtError) -> AuthError {
    match error.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_) => AuthError::InvalidClaims,
        _ => AuthError::CannotParseToken,
    }
}
