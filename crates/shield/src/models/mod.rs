//! Shield response models.

use crate::auth::CacheStatus;
use crate::services::Upstream;
use serde::Serialize;

/// Health check response.
///
/// Returned by `/v1/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy".
    pub status: &'static str,

    /// Instance reporting the status.
    pub instance_id: String,

    /// Database connectivity, omitted when no database is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,

    /// Key set cache state.
    pub key_set: CacheStatus,
}

/// Resolution response returned by `/v1/resolve`.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveResponse {
    /// Dial targets in priority order. Never empty.
    pub upstreams: Vec<Upstream>,
}
