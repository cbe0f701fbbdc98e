//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! This endpoint is unauthenticated to allow Prometheus to scrape metrics.
//! Labels are bounded and never carry subjects, issuers or key IDs.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns Prometheus-formatted metrics for scraping.
///
/// # Response
///
/// ```text
/// # TYPE authz_decisions_total counter
/// authz_decisions_total{effect="Deny",reason="unknown_key"} 3
/// ```
#[tracing::instrument(skip_all, name = "authz.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
