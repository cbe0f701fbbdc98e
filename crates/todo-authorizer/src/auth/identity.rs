//! Principal resolution for protected routes.
//!
//! A development identity can stand in for a caller that sends no
//! `Authorization` header at all. It only exists when configuration
//! enables development mode, which release builds refuse. A request that
//! carries any header, valid or not, is always decided by the engine.

use crate::auth::decision::{AuthorizationDecision, DecisionEngine};
use std::collections::BTreeMap;

/// Principal used by development mode unless configured otherwise.
pub const DEFAULT_DEV_PRINCIPAL: &str = "test-user";

/// Fallback identity for local development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevIdentity {
    principal_id: String,
}

impl DevIdentity {
    pub fn new(principal_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
        }
    }

    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }
}

impl Default for DevIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_DEV_PRINCIPAL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalSource {
    VerifiedToken,
    DevelopmentFallback,
}

/// Authenticated caller handed to request handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub context: BTreeMap<String, String>,
    pub source: PrincipalSource,
}

impl Principal {
    /// Principal for an Allow decision, `None` for a Deny.
    pub fn from_decision(decision: AuthorizationDecision) -> Option<Self> {
        if !decision.is_allowed() {
            return None;
        }
        Some(Self {
            id: decision.principal_id,
            context: decision.context,
            source: PrincipalSource::VerifiedToken,
        })
    }

    fn development(dev: &DevIdentity) -> Self {
        Self {
            id: dev.principal_id.clone(),
            context: BTreeMap::new(),
            source: PrincipalSource::DevelopmentFallback,
        }
    }
}

/// Resolve the caller of a protected route.
///
/// Returns `None` when the request must be rejected.
pub async fn resolve_principal(
    engine: &DecisionEngine,
    authorization: Option<&str>,
    resource: &str,
    dev: Option<&DevIdentity>,
) -> Option<Principal> {
    match (authorization, dev) {
        (None, Some(dev)) => {
            tracing::warn!(
                target: "authz.identity",
                principal = %dev.principal_id,
                "No Authorization header, using development identity"
            );
            Some(Principal::development(dev))
        }
        (header, _) => {
            let decision = engine.authorize(header.unwrap_or_default(), resource).await;
            Principal::from_decision(decision)
        }
    }
}
