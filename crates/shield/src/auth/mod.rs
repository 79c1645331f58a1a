//! Request authentication for Shield.
//!
//! # Components
//!
//! - `credential` - Token extraction from cookies and `Authorization` headers
//! - `jwks` - Single-slot key set cache and identity provider fetcher
//! - `jwt` - Signature and time-claim verification against a key set
//! - `authenticator` - The `Authenticator` capability and its implementations

pub mod authenticator;
pub mod credential;
pub mod jwks;
pub mod jwt;

pub use authenticator::{Authenticator, JwksAuthenticator};
pub use credential::{extract_credential, Credential, CredentialSource};
pub use jwks::{CacheStatus, HttpKeySetFetcher, KeySet, KeySetCache, KeySetError, KeySetFetcher};
pub use jwt::{Claims, TokenVerifier, VerificationFailure};
