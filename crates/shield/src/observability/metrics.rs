//! Metrics definitions for Shield.
//!
//! All metrics follow Prometheus naming conventions:
//! - `shield_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: 4 values (known paths plus `/other`)
//! - `status`: 3 values (success, error, timeout)
//! - `result` / `reason`: bounded by code
//!
//! Hostnames and token contents are never used as label values.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("shield_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Key set fetches run off the request path most of the time
        .set_buckets_for_metric(
            Matcher::Prefix("shield_jwks_fetch".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000],
        )
        .map_err(|e| format!("Failed to set key set fetch buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("shield_upstream_lookup".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set upstream lookup buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `shield_http_requests_total`, `shield_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("shield_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("shield_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/v1/health" => "/v1/health",
        "/v1/resolve" => "/v1/resolve",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}

// ============================================================================
// Key Set Metrics
// ============================================================================

/// Record a key set cache lookup.
///
/// Metric: `shield_jwks_cache_lookups_total`
/// Labels: `result` (hit, miss, stale)
pub fn record_key_set_lookup(result: &'static str) {
    counter!("shield_jwks_cache_lookups_total", "result" => result).increment(1);
}

/// Record a key set fetch against the identity provider.
///
/// Metric: `shield_jwks_fetch_duration_seconds`, `shield_jwks_fetches_total`
/// Labels: `status` (success, error)
pub fn record_key_set_fetch(status: &'static str, duration: Duration) {
    histogram!("shield_jwks_fetch_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());

    counter!("shield_jwks_fetches_total", "status" => status).increment(1);
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record a credential verification outcome.
///
/// Metric: `shield_auth_verifications_total`
/// Labels: `outcome` (verified, rejected, absent), `reason`
pub fn record_auth_verification(outcome: &'static str, reason: &'static str) {
    counter!("shield_auth_verifications_total",
        "outcome" => outcome,
        "reason" => reason
    )
    .increment(1);
}

// ============================================================================
// Upstream Metrics
// ============================================================================

/// Record a directory lookup.
///
/// Metric: `shield_upstream_lookup_duration_seconds`, `shield_upstream_lookups_total`
/// Labels: `status` (success, error, timeout)
pub fn record_upstream_lookup(status: &'static str, duration: Duration) {
    histogram!("shield_upstream_lookup_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());

    counter!("shield_upstream_lookups_total", "status" => status).increment(1);
}

/// Record a routing decision.
///
/// Metric: `shield_resolutions_total`
/// Labels: `result` (resolved, fallback), `reason`
pub fn record_resolution(result: &'static str, reason: &'static str) {
    counter!("shield_resolutions_total",
        "result" => result,
        "reason" => reason
    )
    .increment(1);
}
