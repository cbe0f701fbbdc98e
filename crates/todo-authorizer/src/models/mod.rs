//! Data models for the authorizer HTTP surface.

use common::secret::SecretString;
use serde::{Deserialize, Serialize};

/// Event type of a gateway token authorizer invocation.
pub const TOKEN_EVENT_TYPE: &str = "TOKEN";

/// Gateway token-authorizer event, the body of `POST /authorize`.
///
/// The raw header value is held as a `SecretString` so the event can be
/// logged with `Debug`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerEvent {
    /// Event type. Only `TOKEN` is supported; absent is treated as `TOKEN`.
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,

    /// Raw `Authorization` header value. Absent is treated as empty.
    #[serde(default)]
    pub authorization_token: Option<SecretString>,

    /// Resource being invoked, echoed into the policy.
    pub method_arn: String,
}

/// Readiness probe response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,

    /// Trusted issuer URL. Public, since it is published in every token.
    pub issuer: String,

    /// Signing keys currently held in the cache.
    pub cached_keys: usize,
}
