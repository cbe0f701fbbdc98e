//! Authorizer error types.
//!
//! Key resolution and token verification errors are internal: the decision
//! engine converts every one of them into a Deny decision and only logs the
//! detail. `AuthorizerError` is the HTTP-facing type and maps to status codes
//! via `IntoResponse` with generic client messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::jwt::JwtValidationError;
use serde::Serialize;
use thiserror::Error;

/// Failure to obtain a verification key for `(issuer, kid)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyResolutionError {
    #[error("JWKS endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("JWKS endpoint returned HTTP {0}")]
    UpstreamStatus(u16),

    #[error("JWKS document is invalid: {0}")]
    InvalidDocument(String),

    #[error("No signing key matches the token kid")]
    KeyNotFound,

    #[error("Signing key has no x5c certificate chain")]
    MissingCertificate,

    #[error("Signing key certificate is not a usable RSA certificate: {0}")]
    UnusableCertificate(String),
}

/// Token verification failure, one variant per gate kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Token absent, not a JWT, or missing a decodable header/payload.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The issuer's key set could not supply the key.
    #[error("Unknown signing key: {0}")]
    UnknownKey(#[from] KeyResolutionError),

    /// Cryptographic verification failed, or the token names another algorithm.
    #[error("Signature verification failed")]
    SignatureInvalid,

    /// Issuer mismatch, expiry, audience, or other registered-claim violation.
    #[error("Claim validation failed: {0}")]
    ClaimInvalid(String),
}

impl TokenError {
    /// Bounded label naming the failed gate, for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Malformed(_) => "malformed",
            TokenError::UnknownKey(_) => "unknown_key",
            TokenError::SignatureInvalid => "signature_invalid",
            TokenError::ClaimInvalid(_) => "claim_invalid",
        }
    }
}

impl From<JwtValidationError> for TokenError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::IatTooFarInFuture => {
                TokenError::ClaimInvalid("iat is in the future".to_string())
            }
            JwtValidationError::MissingBearerToken => {
                TokenError::Malformed("missing bearer credential".to_string())
            }
            JwtValidationError::TokenTooLarge => {
                TokenError::Malformed("token exceeds size limit".to_string())
            }
            JwtValidationError::MalformedToken => {
                TokenError::Malformed("token is not a decodable JWT".to_string())
            }
        }
    }
}

/// HTTP-facing error type.
///
/// Maps to appropriate HTTP status codes:
/// - Unauthorized: 401 Unauthorized (with WWW-Authenticate)
/// - BadRequest: 400 Bad Request
#[derive(Debug, Error)]
pub enum AuthorizerError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AuthorizerError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthorizerError::Unauthorized => 401,
            AuthorizerError::BadRequest(_) => 400,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AuthorizerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Never say which gate failed
            AuthorizerError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "The access token is invalid or expired".to_string(),
            ),
            AuthorizerError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"todo-api\", error=\"invalid_token\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}
