//! HTTP request handlers for Shield.

pub mod health;
pub mod metrics;
pub mod resolve;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use resolve::resolve_upstreams;
