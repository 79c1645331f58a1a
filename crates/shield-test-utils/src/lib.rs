//! # Shield Test Utilities
//!
//! Shared test utilities for the Shield service.
//!
//! This crate provides:
//! - Deterministic Ed25519 signing keys (`TestKeypair`)
//! - A mock identity provider serving a key set (`MockIdentityProvider`)
//! - A mock hostname directory (`MockDirectory`)
//! - Server test harness (`TestShieldServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shield_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let keypair = TestKeypair::new(1, "key-1");
//!     let idp = MockIdentityProvider::start(&[&keypair]).await;
//!     let directory = MockDirectory::start().await;
//!     directory.respond_for("svc.example.com", &["a:1"]).await;
//!
//!     let server = TestShieldServer::spawn(&idp, &directory, []).await?;
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/v1/resolve", server.url()))
//!         .header("host", "svc.example.com")
//!         .bearer_auth(keypair.sign(&valid_claims()))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod directory;
pub mod identity_provider;
pub mod keypair;
pub mod server_harness;

// Re-export commonly used items
pub use directory::*;
pub use identity_provider::*;
pub use keypair::*;
pub use server_harness::*;
