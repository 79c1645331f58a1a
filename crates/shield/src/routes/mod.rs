//! HTTP routes for Shield.
//!
//! Defines the Axum router and application state.

use crate::auth::{
    Authenticator, HttpKeySetFetcher, JwksAuthenticator, KeySetCache, KeySetFetcher,
    TokenVerifier,
};
use crate::config::{AuthFailurePolicy, Config};
use crate::errors::ShieldError;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth};
use crate::services::{HttpUpstreamLookup, UpstreamLookup, UpstreamResolver};
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Optional database pool. Not consulted by the request path.
    pub pool: Option<PgPool>,

    /// Process-wide key set cache.
    pub key_set_cache: Arc<KeySetCache>,

    /// Authenticator shared by the resolver and the auth middleware.
    pub authenticator: Arc<dyn Authenticator>,

    /// Routing decision engine.
    pub resolver: Arc<UpstreamResolver>,
}

impl AppState {
    /// Build the state with HTTP clients for the identity provider and directory.
    ///
    /// # Errors
    ///
    /// Returns `ShieldError::Setup` if an HTTP client cannot be built.
    pub fn new(config: Config, pool: Option<PgPool>) -> Result<Self, ShieldError> {
        let fetcher =
            HttpKeySetFetcher::new(config.idp_jwks_url.clone(), config.jwks_fetch_timeout)
                .map_err(|e| ShieldError::Setup(e.to_string()))?;

        let lookup = HttpUpstreamLookup::new(
            config.upstreams_url.clone(),
            config.upstreams_client_id.clone(),
            config.upstreams_client_secret.clone(),
            config.upstreams_timeout,
        )
        .map_err(|e| ShieldError::Setup(e.to_string()))?;

        Ok(Self::with_components(
            config,
            pool,
            Arc::new(fetcher),
            Arc::new(lookup),
        ))
    }

    /// Build the state around an injected fetcher and lookup.
    pub fn with_components(
        config: Config,
        pool: Option<PgPool>,
        fetcher: Arc<dyn KeySetFetcher>,
        lookup: Arc<dyn UpstreamLookup>,
    ) -> Self {
        let key_set_cache = Arc::new(KeySetCache::new(fetcher, config.jwks_cache_max_age));

        let clock_skew = Duration::from_secs(config.jwt_clock_skew_seconds.unsigned_abs());
        let authenticator: Arc<dyn Authenticator> = Arc::new(
            JwksAuthenticator::new(
                Arc::clone(&key_set_cache),
                TokenVerifier::new(clock_skew),
                config.credential_source,
                config.auth_cookie_name.clone(),
            )
            .with_unknown_kid_refresh(config.jwks_unknown_kid_refresh),
        );

        let resolver = Arc::new(UpstreamResolver::new(
            Arc::clone(&authenticator),
            lookup,
            config.fallback_upstream.clone(),
        ));

        Self {
            config,
            pool,
            key_set_cache,
            authenticator,
            resolver,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/resolve` - Upstream resolution; behind `require_auth` under the
///   `reject` policy
/// - `/v1/health` - Health check
/// - `/metrics` - Prometheus metrics endpoint
/// - TraceLayer for request logging
/// - 30 second request timeout
/// - HTTP metrics middleware (outermost)
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let resolve_routes = Router::new().route("/v1/resolve", get(handlers::resolve_upstreams));
    let resolve_routes = match state.config.auth_failure_policy {
        AuthFailurePolicy::Reject => resolve_routes.route_layer(
            middleware::from_fn_with_state(state.clone(), require_auth),
        ),
        AuthFailurePolicy::Fallback => resolve_routes,
    };
    let resolve_routes = resolve_routes.with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. http_metrics_middleware (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(resolve_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
