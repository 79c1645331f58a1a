//! Middleware for Shield.
//!
//! # Components
//!
//! - `auth` - Verify-first gate used by the `reject` failure policy
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, Authenticated};
pub use http_metrics::http_metrics_middleware;
