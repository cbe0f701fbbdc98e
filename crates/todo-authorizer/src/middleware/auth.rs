//! Authentication middleware for protected routes.
//!
//! `require_principal` reads the `Authorization` header, asks the decision
//! engine for a verdict on the request path, and injects the resulting
//! [`Principal`] into request extensions. Handlers read it back with the
//! `Extension<Principal>` extractor.

use crate::auth::decision::DecisionEngine;
use crate::auth::identity::{resolve_principal, DevIdentity, Principal};
use crate::errors::AuthorizerError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub engine: Arc<DecisionEngine>,

    /// Set only when development mode is enabled.
    pub dev_identity: Option<DevIdentity>,
}

/// Authentication middleware for user tokens.
///
/// # Response
///
/// - Returns 401 Unauthorized on a Deny decision
/// - Continues to next handler with `Principal` in extensions on Allow
#[instrument(skip_all, name = "authz.middleware.auth")]
pub async fn require_principal(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthorizerError> {
    let authorization = match req.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => Some(value.to_str().map_err(|_| {
            tracing::debug!(target: "authz.http", "Authorization header is not visible ASCII");
            AuthorizerError::Unauthorized
        })?),
    };
    let resource = format!("{} {}", req.method(), req.uri().path());

    let principal: Principal = resolve_principal(
        &state.engine,
        authorization,
        &resource,
        state.dev_identity.as_ref(),
    )
    .await
    .ok_or(AuthorizerError::Unauthorized)?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
