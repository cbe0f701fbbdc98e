//! # Authorizer Test Utilities
//!
//! Shared test utilities for the todo authorizer.
//!
//! This crate provides:
//! - Fixed RSA keys and certificates (`crypto_fixtures`)
//! - Signed test token builder (`token_builders`)
//! - Mock JWKS endpoint (`jwks_mock`)
//! - Server test harness (`TestAuthorizerServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authorizer_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let key = TestSigningKey::primary("abc");
//!     let idp = MockIssuer::start(&[key]).await;
//!     let server = TestAuthorizerServer::spawn(&idp.issuer()).await?;
//!
//!     let token = TestTokenBuilder::new(&idp.issuer()).for_user("user-1").sign(&key);
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/v1/me", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_mock;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_mock::*;
pub use server_harness::*;
pub use token_builders::*;
