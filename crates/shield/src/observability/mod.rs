//! Observability for Shield.
//!
//! Metrics definitions and recording helpers.

pub mod metrics;
