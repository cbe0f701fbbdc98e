//! Metrics definitions for the authorizer.
//!
//! All metrics follow Prometheus naming conventions:
//! - `authz_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: known paths plus "/other"
//! - `status`: 3 values (success, error, timeout)
//! - `effect`: Allow, Deny
//! - `reason`: bounded by the decision engine's deny reasons
//!
//! Subjects, issuers and key IDs are never used as labels.

use crate::auth::decision::Effect;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("authz_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // JWKS fetches are bounded by the fetch timeout (max 60s)
        .set_buckets_for_metric(
            Matcher::Prefix("authz_jwks_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `authz_http_requests_total`, `authz_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("authz_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("authz_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto a bounded label value.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/authorize" => "/authorize",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/v1/me" => "/api/v1/me",
        _ => "/other",
    }
}

// ============================================================================
// Authorization Metrics
// ============================================================================

/// Record one authorization decision.
///
/// Metric: `authz_decisions_total`
/// Labels: `effect`, `reason`
pub fn record_authorization_decision(effect: Effect, reason: &'static str) {
    counter!("authz_decisions_total",
        "effect" => effect.as_str(),
        "reason" => reason
    )
    .increment(1);
}

/// Record a signing key cache lookup.
///
/// Metric: `authz_key_cache_total`
/// Labels: `result` (hit, miss)
pub fn record_key_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("authz_key_cache_total", "result" => result).increment(1);
}

/// Record a JWKS fetch and its duration.
///
/// Metric: `authz_jwks_fetch_total`, `authz_jwks_fetch_duration_seconds`
/// Labels: `status` (success, unreachable, error_status, invalid_document)
pub fn record_jwks_fetch(status: &'static str, duration: Duration) {
    histogram!("authz_jwks_fetch_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
    counter!("authz_jwks_fetch_total", "status" => status).increment(1);
}
