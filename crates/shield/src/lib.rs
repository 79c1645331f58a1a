//! Shield Service Library
//!
//! Shield gatekeeps HTTP traffic in front of a reverse proxy. For each
//! request it decides whether the request carries a valid identity token
//! and, from that verdict plus a per-host directory lookup, which backend
//! addresses the proxy should dial.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/upstream_resolver.rs
//!                                     |-> auth/authenticator.rs -> auth/jwks.rs
//!                                     |-> services/upstream_lookup.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Credential extraction, key set cache, token verification
//! - `config` - Service configuration from environment
//! - `db` - Optional PostgreSQL pool lifecycle
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Auth gate and HTTP metrics
//! - `models` - Response models
//! - `observability` - Metrics
//! - `routes` - Axum router setup
//! - `services` - Directory lookup and upstream resolution

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
