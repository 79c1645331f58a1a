//! Health check handler.
//!
//! `/v1/health` reports database connectivity (when a database is configured)
//! and the key set cache state. Only the database affects the status code;
//! an empty or stale key set is normal between requests.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Handler for GET /v1/health
///
/// Returns 200 when healthy, 503 when the database does not answer.
/// Never fetches the key set.
#[tracing::instrument(skip_all, name = "shield.health")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match &state.pool {
        Some(pool) => match sqlx::query("SELECT 1").fetch_one(pool).await {
            Ok(_) => Some("healthy"),
            Err(e) => {
                tracing::warn!(target: "shield.health", error = %e, "Health check failed: database error");
                Some("unhealthy")
            }
        },
        None => None,
    };

    let key_set = state.key_set_cache.status().await;

    let (status_code, status) = if database == Some("unhealthy") {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            instance_id: state.config.instance_id.clone(),
            database,
            key_set,
        }),
    )
}
