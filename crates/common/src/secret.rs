//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Shield holds two
//! kinds of secret material: the directory-service client secret and the
//! database URL (which embeds a password). Both are carried as
//! `SecretString` so that any struct deriving `Debug` stays safe to log.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct DirectoryCredentials {
//!     client_id: String,
//!     client_secret: SecretString,
//! }
//!
//! let creds = DirectoryCredentials {
//!     client_id: "shield".to_string(),
//!     client_secret: SecretString::from("s3cr3t"),
//! };
//!
//! // Debug output redacts the secret
//! assert!(!format!("{creds:?}").contains("s3cr3t"));
//!
//! // Reading the value requires an explicit call
//! assert_eq!(creds.client_secret.expose_secret(), "s3cr3t");
//! ```
//!
//! Secrets are zeroized when dropped.

pub use secrecy::{ExposeSecret, SecretString};
