//! Common utilities shared by the authorizer service and its test tooling.

#![warn(clippy::pedantic)]

/// Module for bearer-token parsing and unverified JWT inspection
pub mod jwt;

/// Module for certificate encoding helpers
pub mod pem;

/// Module for secret types that prevent accidental logging
pub mod secret;
