//! HTTP routes for the gate.
//!
//! Defines the Axum router and application state.

use crate::auth::AuthPipeline;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{
    http_metrics_middleware, method_not_allowed_envelope, panic_envelope, require_permission,
    PermissionGate,
};
use axum::{
    http::{header, Method},
    middleware,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Auth pipeline shared by every protected route.
    pub pipeline: Arc<AuthPipeline>,
}

impl AppState {
    /// Build state with a pipeline that fetches from the configured JWKS endpoint.
    pub fn from_config(config: Config) -> Self {
        let pipeline = Arc::new(AuthPipeline::from_config(&config));
        Self { config, pipeline }
    }
}

/// Guard every route already on `router` with `permission`.
///
/// Handlers behind the guard can take `Extension<ClaimSet>`. Routes added to
/// the router after this call are not guarded, and `router` must already
/// have at least one route.
pub fn protect<S>(router: Router<S>, pipeline: Arc<AuthPipeline>, permission: &str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(
        PermissionGate::new(pipeline, permission),
        require_permission,
    ))
}

/// CORS policy: any origin, `Content-Type` and `Authorization` headers.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
}

/// Render errors that never reach a handler's `GateError` with the envelope.
///
/// An unsupported method becomes a 405 envelope and a handler panic becomes a
/// 500 envelope.
pub fn with_error_envelopes<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(panic_envelope))
        .layer(middleware::from_fn(method_not_allowed_envelope))
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public, unversioned
/// - `/ready` - Readiness probe (fetches the key set) - public, unversioned
/// - `/metrics` - Prometheus metrics endpoint - public, unversioned
/// - `/api/v1/me` - Caller claims - requires the configured permission
/// - Fallback returning the 404 error envelope
/// - 405 and panic envelopes
/// - TraceLayer, 30 second timeout, CORS, HTTP metrics (outermost)
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = protect(
        Router::new().route("/api/v1/me", get(handlers::get_me)),
        state.pipeline.clone(),
        &state.config.me_permission,
    );

    let routes = public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .fallback(handlers::not_found);

    // Layer order (bottom-to-top execution):
    // 1. Error envelopes (innermost) - panics and 405s become JSON
    // 2. TimeoutLayer
    // 3. TraceLayer
    // 4. CorsLayer - answers preflight before auth runs
    // 5. http_metrics_middleware - records ALL responses (outermost)
    with_error_envelopes(routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(middleware::from_fn(http_metrics_middleware))
}
