//! Mock identity-provider JWKS endpoint.
//!
//! Wraps a wiremock `MockServer` serving `/.well-known/jwks.json`. Every
//! request is recorded, so tests can assert how many fetches a check made.

use crate::keys::TestKeypair;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the key-set document.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A running mock JWKS endpoint.
pub struct MockJwks {
    server: MockServer,
}

impl MockJwks {
    /// Serve a key set containing the public JWK of each keypair, in order.
    pub async fn serving(keypairs: &[&TestKeypair]) -> Self {
        let keys: Vec<Value> = keypairs.iter().map(|k| k.jwk_json()).collect();
        Self::serving_document(json!({ "keys": keys })).await
    }

    /// Serve an arbitrary JSON document with 200.
    pub async fn serving_document(document: Value) -> Self {
        Self::responding(ResponseTemplate::new(200).set_body_json(document)).await
    }

    /// Answer every key-set request with `response`.
    pub async fn responding(response: ResponseTemplate) -> Self {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&server)
            .await;

        Self { server }
    }

    /// Full key-set URL, for `JWKS_URL`.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Number of key-set requests received so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| {
                requests
                    .iter()
                    .filter(|r| r.url.path() == JWKS_PATH)
                    .count()
            })
    }
}
