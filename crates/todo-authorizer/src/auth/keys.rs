//! Signing-key resolver backed by the issuer's JWKS endpoint.
//!
//! Given `(issuer, kid)`, returns the RSA verification key published at
//! `<issuer>/.well-known/jwks.json`. The first certificate of the matching
//! key's `x5c` chain is converted to PEM and parsed once at resolve time.
//!
//! # Security
//!
//! - Keys are cached per `(issuer, kid)` with a TTL to pick up rotations
//! - Fetches carry a request timeout; failures are never retried here
//! - Only keys with a certificate chain are accepted

use crate::auth::cache::SigningKeyCache;
use crate::errors::KeyResolutionError;
use crate::observability::metrics::{record_jwks_fetch, record_key_cache_lookup};
use async_trait::async_trait;
use common::pem::certificate_to_pem;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Default JWKS fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Path of the key set relative to the issuer.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// JSON Web Key from a JWKS document.
///
/// Only the fields needed to pick and load a key are read; anything else in
/// the document is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Key type ("RSA" for the keys this service accepts).
    #[serde(default)]
    pub kty: Option<String>,

    /// Algorithm hint published by the issuer.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig" for signing keys).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// X.509 certificate chain, base64 DER, leaf first.
    #[serde(default)]
    pub x5c: Vec<String>,
}

/// JWKS document served by an issuer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwksDocument {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

/// Verification key material for one `(issuer, kid)` pair.
///
/// Holds the PEM text and the parsed `DecodingKey` so the certificate is
/// only parsed once per cache fill.
#[derive(Clone)]
pub struct VerificationKey {
    pem: Arc<str>,
    decoding_key: DecodingKey,
}

impl VerificationKey {
    /// Build a key from one `x5c` entry.
    ///
    /// # Errors
    ///
    /// Returns `KeyResolutionError::UnusableCertificate` if the entry is not
    /// an RSA certificate.
    pub fn from_certificate(x5c_entry: &str) -> Result<Self, KeyResolutionError> {
        let pem = certificate_to_pem(x5c_entry);
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| KeyResolutionError::UnusableCertificate(e.to_string()))?;

        Ok(Self {
            pem: pem.into(),
            decoding_key,
        })
    }

    /// PEM-encoded certificate.
    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    #[cfg(test)]
    pub(crate) fn from_pem_unchecked(pem: &str) -> Self {
        Self {
            pem: pem.into(),
            decoding_key: DecodingKey::from_secret(pem.as_bytes()),
        }
    }
}

impl PartialEq for VerificationKey {
    fn eq(&self, other: &Self) -> bool {
        self.pem == other.pem
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("pem_len", &self.pem.len())
            .finish_non_exhaustive()
    }
}

/// Source of verification keys. The token verifier depends only on this.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Resolve the key `issuer` published under `kid`.
    async fn resolve(&self, issuer: &str, kid: &str) -> Result<VerificationKey, KeyResolutionError>;
}

/// Compute the JWKS discovery URL for an issuer.
///
/// Trailing slashes on the issuer are dropped before appending
/// `/.well-known/jwks.json`.
pub fn jwks_url(issuer: &str) -> String {
    format!("{}{}", issuer.trim_end_matches('/'), JWKS_PATH)
}

/// Pick the key for `kid` out of a JWKS document.
///
/// # Errors
///
/// - `KeyNotFound` - no signing key carries this `kid`
/// - `MissingCertificate` - the key has an empty `x5c` chain
/// - `UnusableCertificate` - the leaf certificate is not an RSA certificate
pub fn select_key(document: &JwksDocument, kid: &str) -> Result<VerificationKey, KeyResolutionError> {
    let jwk = document
        .keys
        .iter()
        .filter(|k| k.key_use.as_deref().map_or(true, |u| u == "sig"))
        .find(|k| k.kid.as_deref() == Some(kid))
        .ok_or(KeyResolutionError::KeyNotFound)?;

    let leaf = jwk
        .x5c
        .first()
        .ok_or(KeyResolutionError::MissingCertificate)?;

    VerificationKey::from_certificate(leaf)
}

/// Production resolver: cache first, then one GET to the issuer's JWKS.
pub struct JwksKeyResolver {
    http_client: reqwest::Client,
    cache: Arc<SigningKeyCache>,
}

impl JwksKeyResolver {
    /// Create a resolver over an injected cache.
    ///
    /// # Arguments
    ///
    /// * `cache` - Key cache, shared with anything that needs to inspect it
    /// * `fetch_timeout` - Timeout for each JWKS request
    pub fn new(cache: Arc<SigningKeyCache>, fetch_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "authz.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self { http_client, cache }
    }

    pub fn cache(&self) -> &Arc<SigningKeyCache> {
        &self.cache
    }

    /// Fetch and parse the issuer's JWKS document.
    #[instrument(skip(self))]
    async fn fetch_jwks(&self, url: &str) -> Result<JwksDocument, KeyResolutionError> {
        tracing::info!(target: "authz.jwks", url = %url, "Fetching JWKS");
        let started = Instant::now();

        let response = self.http_client.get(url).send().await.map_err(|e| {
            tracing::error!(target: "authz.jwks", url = %url, error = %e, "Failed to fetch JWKS");
            record_jwks_fetch("unreachable", started.elapsed());
            KeyResolutionError::Unreachable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(target: "authz.jwks", url = %url, status = %status, "JWKS endpoint returned error");
            record_jwks_fetch("error_status", started.elapsed());
            return Err(KeyResolutionError::UpstreamStatus(status.as_u16()));
        }

        let document: JwksDocument = response.json().await.map_err(|e| {
            tracing::error!(target: "authz.jwks", url = %url, error = %e, "Failed to parse JWKS response");
            record_jwks_fetch("invalid_document", started.elapsed());
            KeyResolutionError::InvalidDocument(e.to_string())
        })?;

        record_jwks_fetch("success", started.elapsed());
        tracing::debug!(target: "authz.jwks", key_count = document.keys.len(), "JWKS fetched");

        Ok(document)
    }
}

#[async_trait]
impl KeyResolver for JwksKeyResolver {
    #[instrument(skip(self), fields(kid = %kid))]
    async fn resolve(&self, issuer: &str, kid: &str) -> Result<VerificationKey, KeyResolutionError> {
        if let Some(key) = self.cache.get(issuer, kid).await {
            tracing::debug!(target: "authz.jwks", kid = %kid, "Signing key cache hit");
            record_key_cache_lookup(true);
            return Ok(key);
        }
        record_key_cache_lookup(false);

        let document = self.fetch_jwks(&jwks_url(issuer)).await?;
        let key = select_key(&document, kid).map_err(|e| {
            tracing::warn!(target: "authz.jwks", kid = %kid, error = %e, "No usable signing key in JWKS");
            e
        })?;

        Ok(self.cache.insert(issuer, kid, key).await)
    }
}
