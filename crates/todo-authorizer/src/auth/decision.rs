//! Authorization decision engine.
//!
//! Turns a raw `Authorization` header value into an Allow or Deny decision
//! for one resource. Verification failures never escape: each one becomes a
//! Deny carrying the [`UNAUTHORIZED_PRINCIPAL`] sentinel, and the failed gate
//! is only visible in logs and metrics.

use crate::auth::claims::VerifiedClaims;
use crate::auth::jwt::TokenVerifier;
use crate::errors::TokenError;
use crate::observability::metrics::record_authorization_decision;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

/// Principal reported on every Deny.
pub const UNAUTHORIZED_PRINCIPAL: &str = "unauthorized";

/// Policy language version expected by the gateway.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Action granted or refused by a policy statement.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

/// Outcome of one authorization evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    /// Verified subject on Allow, [`UNAUTHORIZED_PRINCIPAL`] on Deny.
    pub principal_id: String,
    pub effect: Effect,
    /// Resource identifier exactly as the caller supplied it.
    pub resource: String,
    /// Verified claims for downstream handlers. Always empty on Deny.
    pub context: BTreeMap<String, String>,
}

impl AuthorizationDecision {
    fn allow(claims: &VerifiedClaims, resource: &str) -> Self {
        let mut context = BTreeMap::new();
        context.insert("sub".to_string(), claims.sub.clone());
        if let Some(aud) = &claims.aud {
            context.insert("aud".to_string(), aud.joined());
        }

        Self {
            principal_id: claims.sub.clone(),
            effect: Effect::Allow,
            resource: resource.to_string(),
            context,
        }
    }

    fn deny(resource: &str) -> Self {
        Self {
            principal_id: UNAUTHORIZED_PRINCIPAL.to_string(),
            effect: Effect::Deny,
            resource: resource.to_string(),
            context: BTreeMap::new(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.effect == Effect::Allow
    }

    /// Render the decision in the gateway's policy document shape.
    pub fn into_policy(self) -> AuthorizerPolicy {
        AuthorizerPolicy {
            principal_id: self.principal_id,
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: vec![PolicyStatement {
                    action: INVOKE_ACTION.to_string(),
                    effect: self.effect,
                    resource: self.resource,
                }],
            },
            context: self.context,
        }
    }
}

/// Gateway authorizer response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerPolicy {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub action: String,
    pub effect: Effect,
    pub resource: String,
}

/// How much the engine says about each decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogVerbosity {
    /// Denials at debug, allows at debug.
    #[default]
    Standard,
    /// Denials at warn with error detail, allows at info.
    Verbose,
}

#[derive(Debug, Clone, Default)]
pub struct DecisionSettings {
    /// Trusted issuer. Tokens from any other issuer are denied.
    pub issuer: Option<String>,
    pub verbosity: LogVerbosity,
}

/// Gate that failed, for logs and metrics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DenyReason {
    MissingToken,
    Malformed,
    ClaimInvalid,
    UnknownKey,
    SignatureInvalid,
}

impl DenyReason {
    fn as_str(self) -> &'static str {
        match self {
            DenyReason::MissingToken => "missing_token",
            DenyReason::Malformed => "malformed",
            DenyReason::ClaimInvalid => "claim_invalid",
            DenyReason::UnknownKey => "unknown_key",
            DenyReason::SignatureInvalid => "signature_invalid",
        }
    }
}

impl From<&TokenError> for DenyReason {
    fn from(err: &TokenError) -> Self {
        match err {
            TokenError::Malformed(_) => DenyReason::Malformed,
            TokenError::UnknownKey(_) => DenyReason::UnknownKey,
            TokenError::SignatureInvalid => DenyReason::SignatureInvalid,
            TokenError::ClaimInvalid(_) => DenyReason::ClaimInvalid,
        }
    }
}

pub struct DecisionEngine {
    verifier: Arc<TokenVerifier>,
    settings: DecisionSettings,
}

impl DecisionEngine {
    pub fn new(verifier: Arc<TokenVerifier>, settings: DecisionSettings) -> Self {
        Self { verifier, settings }
    }

    pub fn settings(&self) -> &DecisionSettings {
        &self.settings
    }

    /// Decide whether `raw_authorization` may access `resource`.
    ///
    /// Never fails. Any verification error yields a Deny for `resource`.
    #[instrument(skip_all)]
    pub async fn authorize(&self, raw_authorization: &str, resource: &str) -> AuthorizationDecision {
        if raw_authorization.trim().is_empty() {
            self.log_denial(DenyReason::MissingToken, None);
            record_authorization_decision(Effect::Deny, DenyReason::MissingToken.as_str());
            return AuthorizationDecision::deny(resource);
        }

        match self
            .verifier
            .verify(raw_authorization, self.settings.issuer.as_deref())
            .await
        {
            Ok(claims) => {
                match self.settings.verbosity {
                    LogVerbosity::Verbose => {
                        tracing::info!(target: "authz.decision", iss = %claims.iss, "Request allowed");
                    }
                    LogVerbosity::Standard => {
                        tracing::debug!(target: "authz.decision", "Request allowed");
                    }
                }
                record_authorization_decision(Effect::Allow, "verified");
                AuthorizationDecision::allow(&claims, resource)
            }
            Err(err) => {
                let reason = DenyReason::from(&err);
                self.log_denial(reason, Some(&err));
                record_authorization_decision(Effect::Deny, reason.as_str());
                AuthorizationDecision::deny(resource)
            }
        }
    }

    fn log_denial(&self, reason: DenyReason, err: Option<&TokenError>) {
        match self.settings.verbosity {
            LogVerbosity::Verbose => {
                let detail = err.map(ToString::to_string).unwrap_or_default();
                tracing::warn!(target: "authz.decision", reason = reason.as_str(), error = %detail, "Request denied");
            }
            LogVerbosity::Standard => {
                tracing::debug!(target: "authz.decision", reason = reason.as_str(), "Request denied");
            }
        }
    }
}
