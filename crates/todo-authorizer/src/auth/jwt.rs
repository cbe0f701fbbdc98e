//! Bearer token verification.
//!
//! Verifies RS256 tokens against keys from a [`KeyResolver`].
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RS256 is accepted; any other header `alg` is refused before a key
//!   is looked up
//! - The issuer is compared to the configured one before any network call,
//!   so a token cannot make the service fetch keys from a host it names
//! - `iss` and `sub` are required; `exp` is enforced when present and `aud`
//!   is checked when configured
//! - `iat` is checked with clock skew tolerance

use crate::auth::claims::VerifiedClaims;
use crate::auth::keys::KeyResolver;
use crate::errors::TokenError;
use common::jwt::{decode_unverified, extract_bearer_token, validate_iat, DEFAULT_CLOCK_SKEW};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// The only signature algorithm accepted.
pub const ACCEPTED_ALGORITHM: Algorithm = Algorithm::RS256;

/// Claim-validation settings shared by every verification.
#[derive(Debug, Clone)]
pub struct VerifierSettings {
    /// Expected `aud`. When `None`, the audience is not checked.
    pub audience: Option<String>,

    /// Tolerance for `iat` values in the future.
    pub clock_skew: Duration,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            audience: None,
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }
}

/// Token verifier over an injected key resolver.
pub struct TokenVerifier {
    resolver: Arc<dyn KeyResolver>,
    settings: VerifierSettings,
}

impl TokenVerifier {
    pub fn new(resolver: Arc<dyn KeyResolver>, settings: VerifierSettings) -> Self {
        Self { resolver, settings }
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Verify a raw `Authorization` header value and return its claims.
    ///
    /// # Security Checks
    ///
    /// 1. Bearer credential present
    /// 2. Header and payload decodable (size-checked first)
    /// 3. `kid` present
    /// 4. Header `alg` is RS256
    /// 5. `iss` present, and equal to `expected_issuer` when given
    /// 6. Key resolved for `(iss, kid)`
    /// 7. RS256 signature, `iss`, `exp` when present, and optional `aud`
    /// 8. `iat` within clock skew
    ///
    /// Steps 1-5 never touch the network.
    ///
    /// # Errors
    ///
    /// Returns the `TokenError` kind of the first gate that fails.
    #[instrument(skip_all)]
    pub async fn verify(
        &self,
        raw_authorization: &str,
        expected_issuer: Option<&str>,
    ) -> Result<VerifiedClaims, TokenError> {
        let token = extract_bearer_token(raw_authorization)?;
        let unverified = decode_unverified(token)?;

        let kid = unverified
            .kid
            .as_deref()
            .ok_or_else(|| TokenError::Malformed("token header has no kid".to_string()))?;

        if unverified.alg != "RS256" {
            tracing::debug!(target: "authz.jwt", alg = %unverified.alg, "Token rejected: algorithm not accepted");
            return Err(TokenError::SignatureInvalid);
        }

        let issuer = unverified
            .iss
            .as_deref()
            .ok_or_else(|| TokenError::ClaimInvalid("token has no iss".to_string()))?;

        if let Some(expected) = expected_issuer {
            if !same_issuer(issuer, expected) {
                tracing::debug!(target: "authz.jwt", iss = %issuer, "Token rejected: issuer not trusted");
                return Err(TokenError::ClaimInvalid("issuer mismatch".to_string()));
            }
        }

        let key = self.resolver.resolve(issuer, kid).await?;

        let mut validation = Validation::new(ACCEPTED_ALGORITHM);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["iss", "sub"]);
        match &self.settings.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let claims = decode::<VerifiedClaims>(token, key.decoding_key(), &validation)
            .map_err(|e| {
                tracing::debug!(target: "authz.jwt", error = %e, "Token verification failed");
                classify_jwt_error(e.kind())
            })?
            .claims;

        if claims.sub.is_empty() {
            return Err(TokenError::ClaimInvalid("token has an empty sub".to_string()));
        }

        if let Some(iat) = claims.iat {
            validate_iat(iat, self.settings.clock_skew)?;
        }

        tracing::debug!(target: "authz.jwt", "Token verified successfully");
        Ok(claims)
    }
}

/// Issuer comparison that ignores trailing slashes, so
/// `https://tenant.auth0.com` and `https://tenant.auth0.com/` name the same
/// issuer. Anything else must match exactly.
fn same_issuer(token_issuer: &str, expected: &str) -> bool {
    token_issuer.trim_end_matches('/') == expected.trim_end_matches('/')
}

/// Map a `jsonwebtoken` failure onto the verifier's error kinds.
pub fn classify_jwt_error(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::MissingAlgorithm => TokenError::SignatureInvalid,
        ErrorKind::ExpiredSignature => TokenError::ClaimInvalid("token expired".to_string()),
        ErrorKind::ImmatureSignature => {
            TokenError::ClaimInvalid("token not yet valid".to_string())
        }
        ErrorKind::InvalidIssuer => TokenError::ClaimInvalid("issuer mismatch".to_string()),
        ErrorKind::InvalidAudience => TokenError::ClaimInvalid("audience mismatch".to_string()),
        ErrorKind::InvalidSubject => TokenError::ClaimInvalid("subject mismatch".to_string()),
        ErrorKind::MissingRequiredClaim(claim) => {
            TokenError::ClaimInvalid(format!("missing required claim {claim}"))
        }
        other => TokenError::Malformed(format!("{other:?}")),
    }
}
