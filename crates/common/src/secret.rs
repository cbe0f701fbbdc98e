//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports [`secrecy`] types. `SecretString` implements `Debug` with
//! redaction, so a struct deriving `Debug` that holds a bearer token can be
//! logged or traced without leaking the credential. Secrets are zeroized on
//! drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct AuthorizerEvent {
//!     method_arn: String,
//!     authorization_token: SecretString,
//! }
//!
//! let event = AuthorizerEvent {
//!     method_arn: "arn:aws:execute-api:us-east-1:123:api/dev/GET/todos".to_string(),
//!     authorization_token: SecretString::from("Bearer eyJhbGciOi..."),
//! };
//!
//! let debug = format!("{event:?}");
//! assert!(!debug.contains("eyJhbGciOi"));
//!
//! let header: &str = event.authorization_token.expose_secret();
//! assert!(header.starts_with("Bearer "));
//! ```
//!
//! Use `SecretString` for bearer tokens and raw `Authorization` header
//! values. Do not wrap key material published in a JWKS; it is public.

pub use secrecy::{ExposeSecret, SecretString};
