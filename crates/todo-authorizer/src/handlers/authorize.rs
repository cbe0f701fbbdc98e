//! Gateway token-authorizer endpoint.
//!
//! `POST /authorize` takes the gateway's TOKEN event and answers with a
//! policy document. A Deny is a normal 200 response; only an event this
//! endpoint cannot interpret is rejected.

use crate::auth::decision::AuthorizerPolicy;
use crate::errors::AuthorizerError;
use crate::models::{AuthorizerEvent, TOKEN_EVENT_TYPE};
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use common::secret::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /authorize
///
/// ```json
/// {
///   "principalId": "auth0|123",
///   "policyDocument": {
///     "Version": "2012-10-17",
///     "Statement": [{ "Action": "execute-api:Invoke", "Effect": "Allow", "Resource": "arn:..." }]
///   },
///   "context": { "sub": "auth0|123" }
/// }
/// ```
///
/// # Errors
///
/// Returns `AuthorizerError::BadRequest` for event types other than `TOKEN`.
#[instrument(skip_all, name = "authz.handlers.authorize")]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    Json(event): Json<AuthorizerEvent>,
) -> Result<Json<AuthorizerPolicy>, AuthorizerError> {
    if let Some(event_type) = event.event_type.as_deref() {
        if event_type != TOKEN_EVENT_TYPE {
            tracing::debug!(target: "authz.http", event_type = %event_type, "Unsupported authorizer event type");
            return Err(AuthorizerError::BadRequest(
                "Unsupported authorizer event type".to_string(),
            ));
        }
    }

    let raw_authorization = event
        .authorization_token
        .as_ref()
        .map(|token| token.expose_secret())
        .unwrap_or_default();

    let decision = state
        .engine
        .authorize(raw_authorization, &event.method_arn)
        .await;

    Ok(Json(decision.into_policy()))
}
