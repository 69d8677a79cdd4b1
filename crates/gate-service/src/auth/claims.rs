//! Verified claim set.
//!
//! The claims the gate itself checks are typed fields. Every other claim the
//! identity provider puts in the token is kept in `extra`, so a verified
//! claim set serializes back to the payload it was decoded from.
//!
//! An explicit `null` for `sub` or `permissions` reads as absent, but the
//! `null` itself stays in `extra` and is serialized back out.
//!
//! `sub` is redacted in Debug output to keep user identifiers out of logs.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// `aud` claim: a single audience or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Default for Audience {
    fn default() -> Self {
        Audience::Multiple(Vec::new())
    }
}

impl Audience {
    /// Whether `audience` is one of the token's audiences.
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == audience,
            Audience::Multiple(auds) => auds.iter().any(|a| a == audience),
        }
    }
}

/// Decoded payload of a verified token.
///
/// `iss`, `aud` and `exp` default when absent only so that the validator, not
/// the deserializer, reports the missing claim. A `ClaimSet` handed out by the
/// verifier always has all three.
///
/// `permissions` distinguishes an absent or `null` claim (`None`) from an
/// empty list.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct ClaimSet {
    /// Issuer.
    pub iss: String,

    /// Audience(s).
    pub aud: Audience,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Subject - redacted in Debug output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Permission strings granted to the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,

    /// All other claims, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for ClaimSet {
    type Error = serde_json::Error;

    fn try_from(mut payload: Map<String, Value>) -> Result<Self, Self::Error> {
        Ok(Self {
            iss: take_or_default(&mut payload, "iss")?,
            aud: take_or_default(&mut payload, "aud")?,
            exp: take_or_default(&mut payload, "exp")?,
            sub: take_non_null(&mut payload, "sub")?,
            permissions: take_non_null(&mut payload, "permissions")?,
            extra: payload,
        })
    }
}

fn take_or_default<T>(payload: &mut Map<String, Value>, key: &str) -> Result<T, serde_json::Error>
where
    T: DeserializeOwned + Default,
{
    payload
        .remove(key)
        .map(serde_json::from_value)
        .transpose()
        .map(Option::unwrap_or_default)
}

// A null value is left in the map so it serializes back unchanged
fn take_non_null<T>(
    payload: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<T>, serde_json::Error>
where
    T: DeserializeOwned,
{
    match payload.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => payload.remove(key).map(serde_json::from_value).transpose(),
    }
}

impl fmt::Debug for ClaimSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimSet")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("permissions", &self.permissions)
            .field("extra_claims", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_claims_deserialize_identity_provider_payload() {
        let payload = json!({
            "iss": "https://idp.example.com/",
            "sub": "auth0|abc123",
            "aud": ["pedalsdbapi", "https://idp.example.com/userinfo"],
            "iat": 1_700_000_000,
            "exp": 1_700_086_400,
            "azp": "client-xyz",
            "scope": "openid profile",
            "permissions": ["get:pedals", "post:manufacturers"]
        });

        let claims: ClaimSet = serde_json::from_value(payload).unwrap();

        assert_eq!(claims.iss, "https://idp.example.com/");
        assert!(claims.aud.contains("pedalsdbapi"));
        assert!(!claims.aud.contains("other-api"));
        assert_eq!(claims.exp, 1_700_086_400);
        assert_eq!(claims.sub.as_deref(), Some("auth0|abc123"));
        assert_eq!(
            claims.permissions,
            Some(vec![
                "get:pedals".to_string(),
                "post:manufacturers".to_string()
            ])
        );
        assert_eq!(claims.extra["azp"], "client-xyz");
        assert_eq!(claims.extra["iat"], 1_700_000_000);
    }

    #[test]
    fn test_claims_serialize_back_to_issued_payload() {
        let payload = json!({
            "iss": "https://idp.example.com/",
            "sub": "auth0|abc123",
            "aud": "pedalsdbapi",
            "exp": 1_700_086_400,
            "gty": "client-credentials",
            "permissions": []
        });

        let claims: ClaimSet = serde_json::from_value(payload.clone()).unwrap();
        assert_eq!(serde_json::to_value(&claims).unwrap(), payload);
    }

    #[test]
    fn test_absent_and_empty_permissions_are_distinct() {
        let absent: ClaimSet =
            serde_json::from_value(json!({"iss": "i", "aud": "a", "exp": 1})).unwrap();
        let empty: ClaimSet =
            serde_json::from_value(json!({"iss": "i", "aud": "a", "exp": 1, "permissions": []}))
                .unwrap();

        assert_eq!(absent.permissions, None);
        assert_eq!(empty.permissions, Some(Vec::new()));
    }

    #[test]
    fn test_null_sub_and_permissions_survive_serialization() {
        let payload = json!({
            "iss": "https://idp.example.com/",
            "aud": "pedalsdbapi",
            "exp": 1_700_086_400,
            "sub": null,
            "permissions": null
        });

        let claims: ClaimSet = serde_json::from_value(payload.clone()).unwrap();

        assert_eq!(claims.sub, None);
        assert_eq!(claims.permissions, None);
        assert_eq!(serde_json::to_value(&claims).unwrap(), payload);
    }

    #[test]
    fn test_wrongly_typed_permissions_fail_to_decode() {
        let result = serde_json::from_value::<ClaimSet>(json!({
            "iss": "i",
            "aud": "a",
            "exp": 1,
            "permissions": "get:pedals"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_single_audience() {
        let aud = Audience::Single("pedalsdbapi".to_string());
        assert!(aud.contains("pedalsdbapi"));
        assert!(!aud.contains("pedals"));
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let claims: ClaimSet = serde_json::from_value(json!({
            "iss": "https://idp.example.com/",
            "aud": "pedalsdbapi",
            "exp": 1,
            "sub": "secret-user-id"
        }))
        .unwrap();

        let debug_str = format!("{:?}", claims);

        assert!(
            !debug_str.contains("secret-user-id"),
            "Debug output should not contain actual sub value"
        );
        assert!(debug_str.contains("[REDACTED]"));
    }
}
