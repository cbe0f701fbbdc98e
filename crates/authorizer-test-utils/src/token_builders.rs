//! Builder for signed test tokens
//!
//! Produces compact JWTs signed with the fixture keys, plus the forged
//! variants the verifier must refuse.

use crate::crypto_fixtures::TestSigningKey;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for test token claims
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new("https://idp.example/")
///     .for_user("user-1")
///     .with_audience("todo-api")
///     .expires_in(3600)
///     .sign(&TestSigningKey::primary("abc"));
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Claims for `issuer` with subject `test-subject`, valid for one hour.
    pub fn new(issuer: &str) -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(issuer));
        claims.insert("sub".to_string(), json!("test-subject"));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        Self { claims }
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    /// Set a single audience
    pub fn with_audience(self, audience: &str) -> Self {
        self.with_claim("aud", json!(audience))
    }

    /// Set several audiences
    pub fn with_audiences(self, audiences: &[&str]) -> Self {
        self.with_claim("aud", json!(audiences))
    }

    /// Set expiration in seconds from now (negative for an expired token)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("exp", json!(exp))
    }

    /// Set issued-at timestamp
    pub fn issued_at(self, timestamp: i64) -> Self {
        self.with_claim("iat", json!(timestamp))
    }

    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Claims as a JSON value
    pub fn claims(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Sign with RS256 under the key's `kid`.
    pub fn sign(&self, key: &TestSigningKey) -> String {
        self.sign_with_algorithm(key, Algorithm::RS256)
    }

    /// Sign with another RSA algorithm (RS384, RS512, PS256...).
    pub fn sign_with_algorithm(&self, key: &TestSigningKey, algorithm: Algorithm) -> String {
        let mut header = Header::new(algorithm);
        header.kid = Some(key.kid.to_string());
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key_pem.as_bytes())
            .expect("fixture private key should parse");
        encode(&header, &self.claims(), &encoding_key).expect("token signing should succeed")
    }

    /// Sign with no `kid` in the header.
    pub fn sign_without_kid(&self, key: &TestSigningKey) -> String {
        let header = Header::new(Algorithm::RS256);
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key_pem.as_bytes())
            .expect("fixture private key should parse");
        encode(&header, &self.claims(), &encoding_key).expect("token signing should succeed")
    }

    /// HS256 token keyed with the published certificate text.
    ///
    /// This is the classic algorithm-confusion forgery: anyone can build it
    /// from the public JWKS.
    pub fn sign_hs256_with_certificate(&self, key: &TestSigningKey) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(key.kid.to_string());
        let encoding_key = EncodingKey::from_secret(key.certificate_pem.as_bytes());
        encode(&header, &self.claims(), &encoding_key).expect("token signing should succeed")
    }
}
