//! Verified token claims.
//!
//! The `sub` field is redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `aud` claim, which issuers send either as a string or as an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    pub fn values(&self) -> Vec<&str> {
        match self {
            Audience::Single(value) => vec![value.as_str()],
            Audience::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Audiences joined by a single space, for the decision context.
    pub fn joined(&self) -> String {
        self.values().join(" ")
    }
}

/// Claims of a token whose signature and registered claims have been checked.
#[derive(Clone, Serialize, Deserialize)]
pub struct VerifiedClaims {
    /// Subject - redacted in Debug output. Empty means the token had none.
    #[serde(default)]
    pub sub: String,

    /// Issuer the token was verified against.
    #[serde(default)]
    pub iss: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Expiration timestamp (Unix epoch seconds). Enforced when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued-at timestamp (Unix epoch seconds), if the issuer sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl fmt::Debug for VerifiedClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedClaims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .finish()
    }
}
