//! Bearer-token authentication and permission enforcement.
//!
//! # Components
//!
//! - `header` - `Authorization: Bearer` extraction
//! - `jwks` - key-set fetching and `kid` resolution
//! - `jwt` - RS256 verification and claim validation
//! - `permissions` - required-permission check
//! - `pipeline` - the four stages composed behind one call

pub mod claims;
pub mod header;
pub mod jwks;
pub mod jwt;
pub mod permissions;
pub mod pipeline;

pub use claims::{Audience, ClaimSet};
pub use header::extract_bearer_token;
pub use jwks::{select_key, Jwk, JwksClient, JwksResponse, KeyResolver, KeySetSource, SigningKey};
pub use jwt::{TokenVerifier, ACCEPTED_ALGORITHMS};
pub use permissions::check_permissions;
pub use pipeline::AuthPipeline;
