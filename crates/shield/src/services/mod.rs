//! Service layer for Shield.
//!
//! # Components
//!
//! - `upstream_lookup` - HTTP client for the hostname directory service
//! - `upstream_resolver` - Per-request routing decision with fallback

pub mod upstream_lookup;
pub mod upstream_resolver;

pub use upstream_lookup::{HttpUpstreamLookup, LookupError, Upstream, UpstreamLookup};
pub use upstream_resolver::{target_host, FallbackReason, Resolution, UpstreamResolver};
