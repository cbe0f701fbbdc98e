//! HTTP middleware for the authorizer.
//!
//! # Components
//!
//! - `auth` - Principal resolution for protected routes
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;

pub use auth::{require_principal, AuthState};
pub use http_metrics::http_metrics_middleware;
