//! # Gate Test Utilities
//!
//! Shared test utilities for the gate service.
//!
//! This crate provides:
//! - RSA test keypairs and token minting (`TestKeypair`, `standard_claims`)
//! - A wiremock-backed identity-provider key set (`MockJwks`)
//! - Server test harness (`TestGateServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gate_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let keypair = TestKeypair::primary("key-1");
//!     let jwks = MockJwks::serving(&[&keypair]).await;
//!     let server = TestGateServer::spawn(&jwks).await?;
//!
//!     let token = keypair.sign(&standard_claims(TEST_ISSUER, TEST_AUDIENCE, &["get:me"]));
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/v1/me", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod jwks_server;
pub mod keys;
pub mod server_harness;

// Re-export commonly used items
pub use jwks_server::*;
pub use keys::*;
pub use server_harness::*;
