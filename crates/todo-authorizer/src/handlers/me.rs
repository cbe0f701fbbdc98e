//! Current caller handler.

use crate::auth::identity::{Principal, PrincipalSource};
use axum::{Extension, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::instrument;

/// Response for `/api/v1/me`.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub principal: String,

    pub context: BTreeMap<String, String>,

    /// True when the development identity stood in for a missing header.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub development: bool,
}

/// Handler for GET /api/v1/me
///
/// Returns the principal resolved by the auth middleware.
///
/// ```json
/// { "principal": "auth0|123", "context": { "sub": "auth0|123", "aud": "todo-api" } }
/// ```
#[instrument(skip_all, name = "authz.handlers.me")]
pub async fn get_me(Extension(principal): Extension<Principal>) -> Json<MeResponse> {
    Json(MeResponse {
        development: principal.source == PrincipalSource::DevelopmentFallback,
        principal: principal.id,
        context: principal.context,
    })
}
