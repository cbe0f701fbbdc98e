//! Bearer-token authorization core.
//!
//! # Components
//!
//! - `cache` - Bounded, expiring cache of verification keys
//! - `keys` - Signing-key resolver backed by the issuer's JWKS endpoint
//! - `claims` - Claims of a verified token
//! - `jwt` - RS256 token verifier
//! - `decision` - Allow/Deny decision engine and gateway policy shape
//! - `identity` - Principal resolution with the development fallback

pub mod cache;
pub mod claims;
pub mod decision;
pub mod identity;
pub mod jwt;
pub mod keys;

pub use cache::SigningKeyCache;
pub use claims::VerifiedClaims;
pub use decision::{AuthorizationDecision, DecisionEngine, Effect};
pub use identity::{DevIdentity, Principal};
pub use jwt::TokenVerifier;
pub use keys::{JwksKeyResolver, KeyResolver, VerificationKey};
