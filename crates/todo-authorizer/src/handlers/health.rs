//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - reports the trusted issuer and cached key count

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does NOT check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Configuration refuses to start without a trusted issuer, so a running
/// process is ready. The JWKS endpoint is not probed; keys are fetched on
/// demand.
#[tracing::instrument(skip_all, name = "authz.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    Json(ReadinessResponse {
        status: "ready",
        issuer: state.config.issuer.clone(),
        cached_keys: state.key_cache.len().await,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    use crate::config::Config;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "OK");
    }

    #[tokio::test]
    async fn test_readiness_reports_issuer_and_empty_cache() {
        let vars = HashMap::from([(
            "AUTH_ISSUER".to_string(),
            "https://idp.example/".to_string(),
        )]);
        let state = Arc::new(AppState::new(Config::from_vars(&vars).unwrap()));

        let Json(ready) = readiness_check(State(state)).await;

        assert_eq!(ready.status, "ready");
        assert_eq!(ready.issuer, "https://idp.example/");
        assert_eq!(ready.cached_keys, 0);
    }
}
