//! Observability module for the authorizer.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
