//! Gate service
//!
//! Serves the permission-guarded API surface and its operational endpoints.

use gate_service::config::{Config, LogFormat};
use gate_service::observability::metrics::init_metrics_recorder;
use gate_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    // Logs from a failed config load still go out, in text format
    let log_format = config
        .as_ref()
        .map(|c| c.log_format)
        .unwrap_or(LogFormat::Text);
    init_tracing(log_format);

    info!("Starting gate service");

    let config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        auth_domain = %config.auth_domain,
        api_audience = %config.api_audience,
        jwks_url = %config.jwks_url,
        bind_address = %config.bind_address,
        jwks_timeout_seconds = config.jwks_timeout.as_secs(),
        jwks_cache_ttl_seconds = config.jwks_cache_ttl.map_or(0, |ttl| ttl.as_secs()),
        jwt_leeway_seconds = config.jwt_leeway_seconds,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState::from_config(config));
    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Gate service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Gate service shutdown complete");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gate=debug,common=debug,tower_http=debug".into());

    let json = (format == LogFormat::Json).then(|| tracing_subscriber::fmt::layer().json());
    let text = (format == LogFormat::Text).then(|| tracing_subscriber::fmt::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
