//! Authorization core tests against a mock identity provider.
//!
//! Exercises the key resolver, token verifier and decision engine together,
//! with real RS256 signatures and a wiremock JWKS endpoint. Fetch counts are
//! asserted through wiremock expectations, verified when the mock drops.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use authorizer_test_utils::{MockIssuer, TestSigningKey, TestTokenBuilder};
use jsonwebtoken::Algorithm;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use todo_authorizer::auth::cache::SigningKeyCache;
use todo_authorizer::auth::decision::{Effect, UNAUTHORIZED_PRINCIPAL};
use todo_authorizer::auth::jwt::{TokenVerifier, VerifierSettings};
use todo_authorizer::auth::keys::{JwksKeyResolver, KeyResolver};
use todo_authorizer::config::Config;
use todo_authorizer::errors::{KeyResolutionError, TokenError};
use todo_authorizer::routes::AppState;

const RESOURCE: &str = "arn:aws:execute-api:us-east-1:123456789012:api/dev/GET/todos";

fn state_for(issuer: &str, extra: &[(&str, &str)]) -> AppState {
    let mut vars = HashMap::from([("AUTH_ISSUER".to_string(), issuer.to_string())]);
    for (k, v) in extra {
        vars.insert((*k).to_string(), (*v).to_string());
    }
    AppState::new(Config::from_vars(&vars).expect("config should load"))
}

fn resolver(cache: SigningKeyCache) -> Arc<JwksKeyResolver> {
    Arc::new(JwksKeyResolver::new(Arc::new(cache), Duration::from_secs(2)))
}

fn verifier(audience: Option<&str>) -> TokenVerifier {
    TokenVerifier::new(
        resolver(SigningKeyCache::default()),
        VerifierSettings {
            audience: audience.map(ToString::to_string),
            ..VerifierSettings::default()
        },
    )
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

// ============================================================================
// Decision scenarios
// ============================================================================

#[tokio::test]
async fn test_valid_token_is_allowed_with_subject_as_principal() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::start(&[key]).await;
    let state = state_for(&idp.issuer(), &[]);

    let token = TestTokenBuilder::new(&idp.issuer())
        .for_user("user-1")
        .sign(&key);
    let decision = state.engine.authorize(&bearer(&token), RESOURCE).await;

    assert_eq!(decision.effect, Effect::Allow);
    assert_eq!(decision.principal_id, "user-1");
    assert_eq!(decision.resource, RESOURCE);
    assert_eq!(decision.context.get("sub").map(String::as_str), Some("user-1"));
}

#[tokio::test]
async fn test_unknown_kid_is_denied() {
    let idp = MockIssuer::start(&[TestSigningKey::primary("other")]).await;
    let state = state_for(&idp.issuer(), &[]);

    let token = TestTokenBuilder::new(&idp.issuer())
        .for_user("user-1")
        .sign(&TestSigningKey::primary("abc"));
    let decision = state.engine.authorize(&bearer(&token), RESOURCE).await;

    assert_eq!(decision.effect, Effect::Deny);
    assert_eq!(decision.principal_id, UNAUTHORIZED_PRINCIPAL);
    assert_eq!(decision.resource, RESOURCE);
    assert!(decision.context.is_empty());
}

#[tokio::test]
async fn test_empty_header_is_denied_without_fetch() {
    let idp = MockIssuer::expect_fetches(&[TestSigningKey::primary("abc")], 0).await;
    let state = state_for(&idp.issuer(), &[]);

    let decision = state.engine.authorize("", RESOURCE).await;

    assert_eq!(decision.effect, Effect::Deny);
    assert_eq!(decision.principal_id, UNAUTHORIZED_PRINCIPAL);
}

#[tokio::test]
async fn test_malformed_headers_are_denied_without_fetch() {
    let idp = MockIssuer::expect_fetches(&[TestSigningKey::primary("abc")], 0).await;
    let state = state_for(&idp.issuer(), &[]);

    for header in [
        "Bearer",
        "Bearer ",
        "Basic dXNlcjpwYXNz",
        "Bearer not-a-jwt",
        "Bearer a.b.c",
        "Bearer eyJhbGciOiJSUzI1NiJ9.!!!.sig",
    ] {
        let decision = state.engine.authorize(header, RESOURCE).await;
        assert_eq!(decision.effect, Effect::Deny, "header {header:?}");
    }
}

#[tokio::test]
async fn test_other_algorithms_are_denied_even_with_a_valid_signature() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::expect_fetches(&[key], 0).await;
    let state = state_for(&idp.issuer(), &[]);
    let builder = TestTokenBuilder::new(&idp.issuer()).for_user("user-1");

    for token in [
        builder.sign_with_algorithm(&key, Algorithm::RS384),
        builder.sign_with_algorithm(&key, Algorithm::RS512),
        builder.sign_with_algorithm(&key, Algorithm::PS256),
        builder.sign_hs256_with_certificate(&key),
    ] {
        let decision = state.engine.authorize(&bearer(&token), RESOURCE).await;
        assert_eq!(decision.effect, Effect::Deny);
    }
}

#[tokio::test]
async fn test_untrusted_issuer_is_denied_without_fetch() {
    let key = TestSigningKey::primary("abc");
    let trusted = MockIssuer::expect_fetches(&[key], 0).await;
    let attacker = MockIssuer::expect_fetches(&[key], 0).await;
    let state = state_for(&trusted.issuer(), &[]);

    let token = TestTokenBuilder::new(&attacker.issuer()).sign(&key);
    let decision = state.engine.authorize(&bearer(&token), RESOURCE).await;

    assert_eq!(decision.effect, Effect::Deny);
}

#[tokio::test]
async fn test_audience_is_joined_into_context() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::start(&[key]).await;
    let state = state_for(&idp.issuer(), &[("AUTH_AUDIENCE", "todo-api")]);

    let token = TestTokenBuilder::new(&idp.issuer())
        .for_user("user-1")
        .with_audiences(&["todo-api", "https://idp.example/userinfo"])
        .sign(&key);
    let decision = state.engine.authorize(&bearer(&token), RESOURCE).await;

    assert_eq!(decision.effect, Effect::Allow);
    assert_eq!(
        decision.context.get("aud").map(String::as_str),
        Some("todo-api https://idp.example/userinfo")
    );
}

// ============================================================================
// Verifier gates
// ============================================================================

#[tokio::test]
async fn test_signature_from_unpublished_key_is_invalid() {
    let idp = MockIssuer::start(&[TestSigningKey::primary("abc")]).await;

    // Key B signs under the kid that publishes key A
    let token = TestTokenBuilder::new(&idp.issuer()).sign(&TestSigningKey::secondary("abc"));
    let err = verifier(None)
        .verify(&bearer(&token), Some(idp.issuer().as_str()))
        .await
        .unwrap_err();

    assert_eq!(err, TokenError::SignatureInvalid);
}

#[tokio::test]
async fn test_expired_token_is_claim_invalid() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::start(&[key]).await;

    let token = TestTokenBuilder::new(&idp.issuer())
        .expires_in(-3600)
        .sign(&key);
    let err = verifier(None)
        .verify(&bearer(&token), Some(idp.issuer().as_str()))
        .await
        .unwrap_err();

    assert!(matches!(err, TokenError::ClaimInvalid(_)), "got {err:?}");
}

#[tokio::test]
async fn test_token_without_exp_is_allowed() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::start(&[key]).await;
    let state = state_for(&idp.issuer(), &[]);

    let token = TestTokenBuilder::new(&idp.issuer())
        .for_user("user-1")
        .without_claim("exp")
        .without_claim("iat")
        .sign(&key);
    let decision = state.engine.authorize(&bearer(&token), RESOURCE).await;

    assert_eq!(decision.effect, Effect::Allow);
    assert_eq!(decision.principal_id, "user-1");
}

#[tokio::test]
async fn test_token_without_sub_is_claim_invalid() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::start(&[key]).await;

    let token = TestTokenBuilder::new(&idp.issuer())
        .without_claim("sub")
        .sign(&key);
    let err = verifier(None)
        .verify(&bearer(&token), Some(idp.issuer().as_str()))
        .await
        .unwrap_err();

    assert!(matches!(err, TokenError::ClaimInvalid(_)), "got {err:?}");
}

#[tokio::test]
async fn test_iat_far_in_future_is_claim_invalid() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::start(&[key]).await;

    let token = TestTokenBuilder::new(&idp.issuer())
        .issued_at(chrono::Utc::now().timestamp() + 3600)
        .sign(&key);
    let err = verifier(None)
        .verify(&bearer(&token), Some(idp.issuer().as_str()))
        .await
        .unwrap_err();

    assert!(matches!(err, TokenError::ClaimInvalid(_)), "got {err:?}");
}

#[tokio::test]
async fn test_token_without_kid_is_malformed() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::expect_fetches(&[key], 0).await;

    let token = TestTokenBuilder::new(&idp.issuer()).sign_without_kid(&key);
    let err = verifier(None)
        .verify(&bearer(&token), Some(idp.issuer().as_str()))
        .await
        .unwrap_err();

    assert!(matches!(err, TokenError::Malformed(_)), "got {err:?}");
}

#[tokio::test]
async fn test_audience_mismatch_is_claim_invalid() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::start(&[key]).await;

    let token = TestTokenBuilder::new(&idp.issuer())
        .with_audience("someone-else")
        .sign(&key);
    let err = verifier(Some("todo-api"))
        .verify(&bearer(&token), Some(idp.issuer().as_str()))
        .await
        .unwrap_err();

    assert!(matches!(err, TokenError::ClaimInvalid(_)), "got {err:?}");
}

#[tokio::test]
async fn test_audience_ignored_when_not_configured() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::start(&[key]).await;

    let token = TestTokenBuilder::new(&idp.issuer())
        .with_audience("someone-else")
        .sign(&key);
    let claims = verifier(None)
        .verify(&bearer(&token), Some(idp.issuer().as_str()))
        .await
        .unwrap();

    assert_eq!(claims.iss, idp.issuer());
}

#[tokio::test]
async fn test_configured_issuer_without_trailing_slash_is_allowed() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::start(&[key]).await;
    let state = state_for(idp.issuer().trim_end_matches('/'), &[]);

    let token = TestTokenBuilder::new(&idp.issuer())
        .for_user("user-1")
        .sign(&key);
    let decision = state.engine.authorize(&bearer(&token), RESOURCE).await;

    assert_eq!(decision.effect, Effect::Allow);
    assert_eq!(decision.principal_id, "user-1");
}

#[tokio::test]
async fn test_verifier_without_expected_issuer_uses_token_issuer() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::start(&[key]).await;

    let token = TestTokenBuilder::new(&idp.issuer()).for_user("user-9").sign(&key);
    let claims = verifier(None).verify(&bearer(&token), None).await.unwrap();

    assert_eq!(claims.sub, "user-9");
}

// ============================================================================
// Key resolver
// ============================================================================

#[tokio::test]
async fn test_same_key_resolved_twice_fetches_once() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::expect_fetches(&[key], 1).await;
    let resolver = resolver(SigningKeyCache::default());

    let first = resolver.resolve(&idp.issuer(), "abc").await.unwrap();
    let second = resolver.resolve(&idp.issuer(), "abc").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.pem(), key.certificate_pem);
    assert_eq!(resolver.cache().len().await, 1);
}

#[tokio::test]
async fn test_many_tokens_share_one_fetch() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::expect_fetches(&[key], 1).await;
    let state = state_for(&idp.issuer(), &[]);

    for user in ["user-1", "user-2", "user-3"] {
        let token = TestTokenBuilder::new(&idp.issuer()).for_user(user).sign(&key);
        let decision = state.engine.authorize(&bearer(&token), RESOURCE).await;
        assert_eq!(decision.principal_id, user);
    }
}

#[tokio::test]
async fn test_expired_cache_entries_are_refetched() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::expect_fetches(&[key], 2).await;
    let resolver = resolver(SigningKeyCache::new(Duration::ZERO, 10));

    resolver.resolve(&idp.issuer(), "abc").await.unwrap();
    resolver.resolve(&idp.issuer(), "abc").await.unwrap();
}

#[tokio::test]
async fn test_issuer_without_trailing_slash_resolves() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::expect_fetches(&[key], 1).await;
    let issuer = idp.issuer();

    let resolved = resolver(SigningKeyCache::default())
        .resolve(issuer.trim_end_matches('/'), "abc")
        .await
        .unwrap();

    assert_eq!(resolved.pem(), key.certificate_pem);
}

#[tokio::test]
async fn test_upstream_error_status() {
    let idp = MockIssuer::failing_with(503).await;

    let err = resolver(SigningKeyCache::default())
        .resolve(&idp.issuer(), "abc")
        .await
        .unwrap_err();

    assert_eq!(err, KeyResolutionError::UpstreamStatus(503));
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let idp = MockIssuer::failing_with(500).await;
    let resolver = resolver(SigningKeyCache::default());

    assert!(resolver.resolve(&idp.issuer(), "abc").await.is_err());
    assert!(resolver.resolve(&idp.issuer(), "abc").await.is_err());

    assert_eq!(idp.fetch_count().await, 2);
    assert!(resolver.cache().is_empty().await);
}

#[tokio::test]
async fn test_invalid_document() {
    let idp = MockIssuer::with_document(json!({ "keys": "not-a-list" })).await;

    let err = resolver(SigningKeyCache::default())
        .resolve(&idp.issuer(), "abc")
        .await
        .unwrap_err();

    assert!(matches!(err, KeyResolutionError::InvalidDocument(_)), "got {err:?}");
}

#[tokio::test]
async fn test_key_without_certificate_chain() {
    let idp = MockIssuer::with_document(json!({
        "keys": [{ "kid": "abc", "kty": "RSA", "use": "sig", "n": "0vx7", "e": "AQAB" }]
    }))
    .await;

    let err = resolver(SigningKeyCache::default())
        .resolve(&idp.issuer(), "abc")
        .await
        .unwrap_err();

    assert_eq!(err, KeyResolutionError::MissingCertificate);
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    // Bind then drop a listener to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = resolver(SigningKeyCache::default())
        .resolve(&format!("http://{addr}/"), "abc")
        .await
        .unwrap_err();

    assert!(matches!(err, KeyResolutionError::Unreachable(_)), "got {err:?}");
}

#[tokio::test]
async fn test_slow_endpoint_times_out_as_unreachable() {
    let idp = MockIssuer::slow(&[TestSigningKey::primary("abc")], Duration::from_secs(3)).await;
    let resolver = Arc::new(JwksKeyResolver::new(
        Arc::new(SigningKeyCache::default()),
        Duration::from_millis(300),
    ));

    let err = resolver.resolve(&idp.issuer(), "abc").await.unwrap_err();

    assert!(matches!(err, KeyResolutionError::Unreachable(_)), "got {err:?}");
    assert!(resolver.cache().is_empty().await);
}

#[tokio::test]
async fn test_slow_endpoint_is_denied() {
    let key = TestSigningKey::primary("abc");
    let idp = MockIssuer::slow(&[key], Duration::from_secs(3)).await;
    let config = Config::from_vars(&HashMap::from([(
        "AUTH_ISSUER".to_string(),
        idp.issuer(),
    )]))
    .unwrap();
    let cache = Arc::new(SigningKeyCache::default());
    let resolver = Arc::new(JwksKeyResolver::new(cache.clone(), Duration::from_millis(300)));
    let state = AppState::with_resolver(config, cache, resolver);

    let token = TestTokenBuilder::new(&idp.issuer())
        .for_user("user-1")
        .sign(&key);
    let decision = state.engine.authorize(&bearer(&token), RESOURCE).await;

    assert_eq!(decision.effect, Effect::Deny);
    assert_eq!(decision.principal_id, UNAUTHORIZED_PRINCIPAL);
}
