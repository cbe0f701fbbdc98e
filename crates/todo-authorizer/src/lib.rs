//! Todo API Authorizer Library
//!
//! Bearer-token authorization for the to-do API. Verifies RS256 access
//! tokens against the issuer's published JWKS and turns the outcome into an
//! Allow/Deny decision with a principal for downstream handlers.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> auth::decision -> auth::jwt -> auth::keys -> auth::cache
//! ```
//!
//! # Modules
//!
//! - `auth` - Key resolver, token verifier and decision engine
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Principal resolution and HTTP metrics
//! - `models` - Request and response models
//! - `observability` - Metrics definitions
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
