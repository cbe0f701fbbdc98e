//! Mock identity provider JWKS endpoint
//!
//! Wraps a `wiremock::MockServer` that serves `/.well-known/jwks.json`.
//! Call-count expectations set with `expect_fetches` are verified when the
//! mock is dropped, so a test fails if the resolver fetched more (or less)
//! often than it should.

use crate::crypto_fixtures::{jwks_document, TestSigningKey};
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the resolver fetches, relative to the issuer.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Mock issuer whose URL doubles as the `iss` claim.
pub struct MockIssuer {
    server: MockServer,
}

impl MockIssuer {
    /// Start an issuer publishing `keys`, with no call-count expectation.
    pub async fn start(keys: &[TestSigningKey]) -> Self {
        Self::serving(ResponseTemplate::new(200).set_body_json(jwks_document(keys)), None).await
    }

    /// Start an issuer publishing `keys` that must be fetched exactly `times`.
    pub async fn expect_fetches(keys: &[TestSigningKey], times: u64) -> Self {
        Self::serving(
            ResponseTemplate::new(200).set_body_json(jwks_document(keys)),
            Some(times),
        )
        .await
    }

    /// Start an issuer publishing `keys` only after `delay`.
    pub async fn slow(keys: &[TestSigningKey], delay: Duration) -> Self {
        Self::serving(
            ResponseTemplate::new(200)
                .set_body_json(jwks_document(keys))
                .set_delay(delay),
            None,
        )
        .await
    }

    /// Start an issuer whose JWKS endpoint answers with `status`.
    pub async fn failing_with(status: u16) -> Self {
        Self::serving(ResponseTemplate::new(status), None).await
    }

    /// Start an issuer serving an arbitrary JWKS body.
    pub async fn with_document(document: Value) -> Self {
        Self::serving(ResponseTemplate::new(200).set_body_json(document), None).await
    }

    async fn serving(response: ResponseTemplate, times: Option<u64>) -> Self {
        let server = MockServer::start().await;
        let mock = Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response);
        let mock = match times {
            Some(times) => mock.expect(times),
            None => mock,
        };
        mock.mount(&server).await;
        Self { server }
    }

    /// Issuer URL with a trailing slash, as identity providers publish it.
    pub fn issuer(&self) -> String {
        format!("{}/", self.server.uri())
    }

    /// Number of requests the JWKS endpoint has received so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| r.url.path() == JWKS_PATH)
                    .count()
            })
            .unwrap_or(0)
    }
}
