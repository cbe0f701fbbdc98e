//! HTTP routes for the authorizer.
//!
//! Defines the Axum router and application state.

use crate::auth::cache::SigningKeyCache;
use crate::auth::decision::{DecisionEngine, DecisionSettings};
use crate::auth::jwt::{TokenVerifier, VerifierSettings};
use crate::auth::keys::{JwksKeyResolver, KeyResolver};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_principal, AuthState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,

    /// Key cache behind the resolver, exposed for operators and tests.
    pub key_cache: Arc<SigningKeyCache>,

    pub engine: Arc<DecisionEngine>,
}

impl AppState {
    /// Wire the production resolver, verifier and engine from configuration.
    pub fn new(config: Config) -> Self {
        let key_cache = Arc::new(SigningKeyCache::new(
            config.key_cache_ttl,
            config.key_cache_max_entries,
        ));
        let resolver = Arc::new(JwksKeyResolver::new(
            key_cache.clone(),
            config.jwks_fetch_timeout,
        ));
        Self::with_resolver(config, key_cache, resolver)
    }

    /// Wire the engine over a caller-supplied resolver.
    pub fn with_resolver(
        config: Config,
        key_cache: Arc<SigningKeyCache>,
        resolver: Arc<dyn KeyResolver>,
    ) -> Self {
        let verifier = Arc::new(TokenVerifier::new(
            resolver,
            VerifierSettings {
                audience: config.audience.clone(),
                clock_skew: config.jwt_clock_skew,
            },
        ));
        let engine = Arc::new(DecisionEngine::new(
            verifier,
            DecisionSettings {
                issuer: Some(config.issuer.clone()),
                verbosity: config.log_verbosity,
            },
        ));

        Self {
            config,
            key_cache,
            engine,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/ready` - Readiness probe - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/authorize` - Gateway token authorizer - public, always answers with a policy
/// - `/api/v1/me` - Current caller - requires authentication
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        engine: state.engine.clone(),
        dev_identity: state.config.dev_identity.clone(),
    });

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/authorize", post(handlers::authorize))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/api/v1/me", get(handlers::get_me))
        .route_layer(middleware::from_fn_with_state(auth_state, require_principal))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_app_state_uses_configured_cache_bounds() {
        let vars = HashMap::from([
            ("AUTH_ISSUER".to_string(), "https://idp.example/".to_string()),
            ("JWKS_CACHE_TTL_SECONDS".to_string(), "30".to_string()),
            ("JWKS_CACHE_MAX_ENTRIES".to_string(), "7".to_string()),
        ]);
        let config = Config::from_vars(&vars).unwrap();

        let state = AppState::new(config);

        assert_eq!(state.key_cache.ttl(), Duration::from_secs(30));
        assert_eq!(state.key_cache.max_entries(), 7);
        assert_eq!(
            state.engine.settings().issuer.as_deref(),
            Some("https://idp.example/")
        );
    }
}
