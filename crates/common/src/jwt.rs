//! JWT utilities shared by the authorizer and its test tooling.
//!
//! This module provides the pre-verification half of token handling:
//! - Size limits for DoS prevention
//! - Clock skew constants for iat validation
//! - Bearer credential extraction from an `Authorization` header value
//! - Unverified header/payload inspection (`alg`, `kid`, `iss`)
//! - iat validation logic
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing returned here is trusted: the values only select which key to
//!   fetch, and the token MUST still be verified with that key
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{decode_unverified, extract_bearer_token};
//!
//! let token = extract_bearer_token(header_value)?;
//! let unverified = decode_unverified(token)?;
//! let key = resolver.resolve(issuer, unverified.kid()?).await?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Identity-provider access tokens are typically 700-1500 bytes. Anything
/// larger than this is rejected before base64 decoding or JSON parsing.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
///
/// Tokens with `iat` (issued-at) timestamps more than this amount in the
/// future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// The only authentication scheme accepted in an `Authorization` header.
pub const BEARER_SCHEME: &str = "Bearer";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur before signature verification.
///
/// Every variant displays the same generic text. The variant itself is for
/// server-side logging only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Header value is empty or does not carry a `Bearer <token>` credential.
    #[error("The access token is invalid or expired")]
    MissingBearerToken,

    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Unverified Token View
// =============================================================================

/// Header and payload fields read from a token without checking its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedToken {
    /// Signing algorithm named in the header (`alg`).
    pub alg: String,

    /// Key identifier named in the header (`kid`), if any.
    pub kid: Option<String>,

    /// Issuer claim (`iss`) from the payload, if any.
    pub iss: Option<String>,
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the credential from an `Authorization` header value.
///
/// The value is split on whitespace. It must contain exactly two parts, the
/// first being the `Bearer` scheme (compared case-insensitively).
///
/// # Errors
///
/// Returns `JwtValidationError::MissingBearerToken` when the header is empty,
/// uses another scheme, has no credential, or has trailing parts.
pub fn extract_bearer_token(authorization: &str) -> Result<&str, JwtValidationError> {
    let mut parts = authorization.split_whitespace();

    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(credential), None) if scheme.eq_ignore_ascii_case(BEARER_SCHEME) => {
            Ok(credential)
        }
        _ => {
            tracing::debug!(
                target: "common.jwt",
                "Authorization header does not carry a bearer credential"
            );
            Err(JwtValidationError::MissingBearerToken)
        }
    }
}

/// Decode a JWT header and payload without verifying the signature.
///
/// Used to find out which issuer and key to verify against. Empty `kid` and
/// `iss` strings are reported as absent.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Not three segments, bad base64url, non-object JSON,
///   or a header without a string `alg`
pub fn decode_unverified(token: &str) -> Result<UnverifiedToken, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut segments = token.split('.');
    let (Some(header_part), Some(payload_part), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken);
    };

    let header = decode_segment(header_part, "header")?;
    let payload = decode_segment(payload_part, "payload")?;

    let alg = header
        .get("alg")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| {
            tracing::debug!(target: "common.jwt", "Token rejected: header has no alg");
            JwtValidationError::MalformedToken
        })?;

    Ok(UnverifiedToken {
        alg,
        kid: non_empty_string(&header, "kid"),
        iss: non_empty_string(&payload, "iss"),
    })
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if the iat timestamp is
/// more than `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW by configuration
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

fn decode_segment(segment: &str, name: &'static str) -> Result<Value, JwtValidationError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to decode JWT base64");
        JwtValidationError::MalformedToken
    })?;

    let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to parse JWT JSON");
        JwtValidationError::MalformedToken
    })?;

    if !value.is_object() {
        tracing::debug!(target: "common.jwt", segment = name, "JWT segment is not a JSON object");
        return Err(JwtValidationError::MalformedToken);
    }

    Ok(value)
}

fn non_empty_string(object: &Value, field: &str) -> Option<String> {
    object
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

// =============================================================================
// Tests
// =============================================================================
