//! Authorizer configuration.
//!
//! Configuration is loaded from environment variables. Missing or invalid
//! issuer settings fail startup rather than individual requests. Nothing
//! held here is secret, so the derived Debug output is safe to log.

use crate::auth::cache::{DEFAULT_KEY_CACHE_MAX_ENTRIES, DEFAULT_KEY_CACHE_TTL};
use crate::auth::decision::LogVerbosity;
use crate::auth::identity::{DevIdentity, DEFAULT_DEV_PRINCIPAL};
use crate::auth::keys::DEFAULT_FETCH_TIMEOUT;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Upper bound for the key cache TTL (one day).
pub const MAX_KEY_CACHE_TTL_SECONDS: u64 = 86_400;

/// Upper bound for the JWKS fetch timeout.
pub const MAX_FETCH_TIMEOUT_SECONDS: u64 = 60;

/// Authorizer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Trusted issuer URL, e.g. `https://tenant.auth0.com/`. Matched against
    /// the token `iss` with trailing slashes ignored.
    pub issuer: String,

    /// Expected `aud`. Not checked when unset.
    pub audience: Option<String>,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    pub key_cache_ttl: Duration,

    pub key_cache_max_entries: usize,

    /// Timeout for each JWKS request.
    pub jwks_fetch_timeout: Duration,

    /// Tolerance for `iat` values in the future.
    pub jwt_clock_skew: Duration,

    pub log_verbosity: LogVerbosity,

    /// Fallback identity for requests without a header. Debug builds only.
    pub dev_identity: Option<DevIdentity>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid issuer configuration: {0}")]
    InvalidIssuer(String),

    #[error("Invalid key cache configuration: {0}")]
    InvalidKeyCache(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidFetchTimeout(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid boolean for {0}: expected true or false")]
    InvalidFlag(String),

    #[error("AUTH_DEV_MODE is not allowed in release builds")]
    DevModeRefused,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_vars_for_build(vars, !cfg!(debug_assertions))
    }

    fn from_vars_for_build(
        vars: &HashMap<String, String>,
        release_build: bool,
    ) -> Result<Self, ConfigError> {
        let issuer = parse_issuer(vars)?;

        let audience = vars
            .get("AUTH_AUDIENCE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let key_cache_ttl = match vars.get("JWKS_CACHE_TTL_SECONDS") {
            Some(value_str) => {
                let value = parse_positive(value_str, "JWKS_CACHE_TTL_SECONDS")
                    .map_err(ConfigError::InvalidKeyCache)?;
                if value > MAX_KEY_CACHE_TTL_SECONDS {
                    return Err(ConfigError::InvalidKeyCache(format!(
                        "JWKS_CACHE_TTL_SECONDS must not exceed {MAX_KEY_CACHE_TTL_SECONDS} seconds, got {value}"
                    )));
                }
                Duration::from_secs(value)
            }
            None => DEFAULT_KEY_CACHE_TTL,
        };

        let key_cache_max_entries = match vars.get("JWKS_CACHE_MAX_ENTRIES") {
            Some(value_str) => {
                let value = parse_positive(value_str, "JWKS_CACHE_MAX_ENTRIES")
                    .map_err(ConfigError::InvalidKeyCache)?;
                usize::try_from(value).map_err(|_| {
                    ConfigError::InvalidKeyCache(format!(
                        "JWKS_CACHE_MAX_ENTRIES is too large, got {value}"
                    ))
                })?
            }
            None => DEFAULT_KEY_CACHE_MAX_ENTRIES,
        };

        let jwks_fetch_timeout = match vars.get("JWKS_FETCH_TIMEOUT_SECONDS") {
            Some(value_str) => {
                let value = parse_positive(value_str, "JWKS_FETCH_TIMEOUT_SECONDS")
                    .map_err(ConfigError::InvalidFetchTimeout)?;
                if value > MAX_FETCH_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must not exceed {MAX_FETCH_TIMEOUT_SECONDS} seconds, got {value}"
                    )));
                }
                Duration::from_secs(value)
            }
            None => DEFAULT_FETCH_TIMEOUT,
        };

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew = match vars.get("JWT_CLOCK_SKEW_SECONDS") {
            Some(value_str) => {
                let value = parse_positive(value_str, "JWT_CLOCK_SKEW_SECONDS")
                    .map_err(ConfigError::InvalidJwtClockSkew)?;
                if value > MAX_CLOCK_SKEW.as_secs() {
                    return Err(ConfigError::InvalidJwtClockSkew(format!(
                        "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                        MAX_CLOCK_SKEW.as_secs(),
                        value
                    )));
                }
                Duration::from_secs(value)
            }
            None => DEFAULT_CLOCK_SKEW,
        };

        let log_verbosity = if parse_flag(vars, "AUTH_LOG_VERBOSE")? {
            LogVerbosity::Verbose
        } else {
            LogVerbosity::Standard
        };

        let dev_identity = if parse_flag(vars, "AUTH_DEV_MODE")? {
            if release_build {
                return Err(ConfigError::DevModeRefused);
            }
            let principal = vars
                .get("AUTH_DEV_PRINCIPAL")
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_DEV_PRINCIPAL);
            Some(DevIdentity::new(principal))
        } else {
            None
        };

        Ok(Config {
            issuer,
            audience,
            bind_address,
            key_cache_ttl,
            key_cache_max_entries,
            jwks_fetch_timeout,
            jwt_clock_skew,
            log_verbosity,
            dev_identity,
        })
    }
}

/// `AUTH_ISSUER` wins; otherwise `AUTH0_DOMAIN` becomes `https://<domain>/`.
fn parse_issuer(vars: &HashMap<String, String>) -> Result<String, ConfigError> {
    if let Some(issuer) = vars.get("AUTH_ISSUER").map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if !(issuer.starts_with("https://") || issuer.starts_with("http://")) {
            return Err(ConfigError::InvalidIssuer(format!(
                "AUTH_ISSUER must be an http(s) URL, got '{issuer}'"
            )));
        }
        return Ok(issuer.to_string());
    }

    let domain = vars
        .get("AUTH0_DOMAIN")
        .map(|v| v.trim().trim_end_matches('/'))
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar("AUTH_ISSUER or AUTH0_DOMAIN".to_string()))?;

    if domain.contains("://") || domain.contains('/') {
        return Err(ConfigError::InvalidIssuer(format!(
            "AUTH0_DOMAIN must be a bare host name, got '{domain}'"
        )));
    }

    Ok(format!("https://{domain}/"))
}

fn parse_positive(value_str: &str, name: &str) -> Result<u64, String> {
    let value: u64 = value_str
        .trim()
        .parse()
        .map_err(|e| format!("{name} must be a valid positive integer, got '{value_str}': {e}"))?;

    if value == 0 {
        return Err(format!("{name} must be greater than 0"));
    }

    Ok(value)
}

fn parse_flag(vars: &HashMap<String, String>, name: &str) -> Result<bool, ConfigError> {
    match vars.get(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "" | "0" | "false" | "no" => Ok(false),
            "1" | "true" | "yes" => Ok(true),
            _ => Err(ConfigError::InvalidFlag(name.to_string())),
        },
    }
}
