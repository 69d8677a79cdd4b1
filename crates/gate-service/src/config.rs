//! Gate configuration.
//!
//! Configuration is loaded from environment variables once at startup and
//! injected into the auth pipeline. Nothing here is mutated at runtime.

use common::jwt::MAX_CLOCK_SKEW;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default JWKS fetch timeout in seconds.
pub const DEFAULT_JWKS_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the JWKS fetch timeout in seconds.
pub const MAX_JWKS_TIMEOUT_SECONDS: u64 = 60;

/// Default permission guarding `/api/v1/me`.
pub const DEFAULT_ME_PERMISSION: &str = "get:me";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Gate configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity-provider domain (e.g. `tenant.us.auth0.com`).
    pub auth_domain: String,

    /// Audience every accepted token must carry.
    pub api_audience: String,

    /// Issuer every accepted token must carry: `https://{auth_domain}/`.
    pub issuer: String,

    /// Key-set endpoint. Defaults to `https://{auth_domain}/.well-known/jwks.json`.
    pub jwks_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Timeout for one JWKS fetch.
    pub jwks_timeout: Duration,

    /// Key-set cache TTL. `None` fetches on every verification.
    pub jwks_cache_ttl: Option<Duration>,

    /// Leeway in seconds applied to `exp`/`nbf` checks.
    pub jwt_leeway_seconds: u64,

    /// Permission required by `/api/v1/me`.
    pub me_permission: String,

    /// Log output format.
    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid auth domain: {0}")]
    InvalidAuthDomain(String),

    #[error("Invalid JWKS timeout configuration: {0}")]
    InvalidJwksTimeout(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidJwksCacheTtl(String),

    #[error("Invalid JWT leeway configuration: {0}")]
    InvalidJwtLeeway(String),

    #[error("Invalid log format: {0}")]
    InvalidLogFormat(String),
}

/// Issuer string the identity provider stamps into tokens for `domain`.
pub fn issuer_for_domain(domain: &str) -> String {
    format!("https://{}/", domain)
}

/// Well-known key-set URL for `domain`.
pub fn jwks_url_for_domain(domain: &str) -> String {
    format!("https://{}/.well-known/jwks.json", domain)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let auth_domain = required(vars, "AUTH_DOMAIN")?;
        if auth_domain.contains('/') || auth_domain.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidAuthDomain(format!(
                "AUTH_DOMAIN must be a bare host name, got '{}'",
                auth_domain
            )));
        }

        let api_audience = required(vars, "API_AUDIENCE")?;

        let jwks_url = vars
            .get("JWKS_URL")
            .cloned()
            .unwrap_or_else(|| jwks_url_for_domain(&auth_domain));

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwks_timeout_seconds = if let Some(value_str) = vars.get("JWKS_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwksTimeout(format!(
                    "JWKS_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidJwksTimeout(
                    "JWKS_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            if value > MAX_JWKS_TIMEOUT_SECONDS {
                return Err(ConfigError::InvalidJwksTimeout(format!(
                    "JWKS_TIMEOUT_SECONDS must not exceed {} seconds, got {}",
                    MAX_JWKS_TIMEOUT_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_JWKS_TIMEOUT_SECONDS
        };

        // 0 (the default) disables caching
        let jwks_cache_ttl = if let Some(value_str) = vars.get("JWKS_CACHE_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwksCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;
            (value > 0).then(|| Duration::from_secs(value))
        } else {
            None
        };

        let jwt_leeway_seconds = if let Some(value_str) = vars.get("JWT_LEEWAY_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtLeeway(format!(
                    "JWT_LEEWAY_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtLeeway(format!(
                    "JWT_LEEWAY_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            0
        };

        let me_permission = vars
            .get("ME_PERMISSION")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ME_PERMISSION.to_string());

        let log_format = match vars.get("LOG_FORMAT").map(String::as_str) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidLogFormat(format!(
                    "LOG_FORMAT must be 'text' or 'json', got '{}'",
                    other
                )))
            }
        };

        Ok(Config {
            issuer: issuer_for_domain(&auth_domain),
            auth_domain,
            api_audience,
            jwks_url,
            bind_address,
            jwks_timeout: Duration::from_secs(jwks_timeout_seconds),
            jwks_cache_ttl,
            jwt_leeway_seconds,
            me_permission,
            log_format,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}
