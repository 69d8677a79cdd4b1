//! Test server harness for E2E testing
//!
//! Provides `TestGateServer` for spawning real gate server instances in tests.

use crate::jwks_server::MockJwks;
use gate_service::config::Config;
use gate_service::observability::metrics::init_metrics_recorder;
use gate_service::routes::{self, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Identity-provider domain used by test servers.
pub const TEST_AUTH_DOMAIN: &str = "idp.test.example";

/// Audience used by test servers.
pub const TEST_AUDIENCE: &str = "pedalsdbapi";

/// Issuer matching `TEST_AUTH_DOMAIN`.
pub const TEST_ISSUER: &str = "https://idp.test.example/";

/// Global metrics handle for test servers. The recorder can only be
/// installed once per process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics handle shared by every test server in the process.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the gate server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<()> {
///     let keypair = TestKeypair::primary("key-1");
///     let jwks = MockJwks::serving(&[&keypair]).await;
///     let server = TestGateServer::spawn(&jwks).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGateServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestGateServer {
    /// Spawn a server trusting `jwks`, with default settings.
    pub async fn spawn(jwks: &MockJwks) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(jwks, HashMap::new()).await
    }

    /// Spawn a server trusting `jwks`, with extra environment overrides.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_vars(
        jwks: &MockJwks,
        overrides: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("AUTH_DOMAIN".to_string(), TEST_AUTH_DOMAIN.to_string()),
            ("API_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("JWKS_URL".to_string(), jwks.jwks_url()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWKS_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ]);
        vars.extend(overrides);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::from_config(config.clone()));
        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestGateServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::TestKeypair;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let keypair = TestKeypair::primary("key-1");
        let jwks = MockJwks::serving(&[&keypair]).await;
        let server = TestGateServer::spawn(&jwks).await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[tokio::test]
    async fn test_server_provides_config_access() -> Result<(), anyhow::Error> {
        let jwks = MockJwks::serving(&[]).await;
        let server = TestGateServer::spawn_with_vars(
            &jwks,
            HashMap::from([("ME_PERMISSION".to_string(), "read:profile".to_string())]),
        )
        .await?;

        let config = server.config();
        assert_eq!(config.issuer, TEST_ISSUER);
        assert_eq!(config.api_audience, TEST_AUDIENCE);
        assert_eq!(config.jwks_url, jwks.jwks_url());
        assert_eq!(config.me_permission, "read:profile");

        Ok(())
    }

    #[tokio::test]
    async fn test_multiple_servers_different_ports() -> Result<(), anyhow::Error> {
        let jwks = MockJwks::serving(&[]).await;
        let server1 = TestGateServer::spawn(&jwks).await?;
        let server2 = TestGateServer::spawn(&jwks).await?;

        assert_ne!(server1.addr(), server2.addr());
        assert!(server1.addr().ip().is_loopback());

        Ok(())
    }
}
