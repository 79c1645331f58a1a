//! Upstream resolution endpoint.
//!
//! The fronting proxy calls `GET /v1/resolve` with the original request's
//! headers and dials whatever comes back.

use crate::middleware::Authenticated;
use crate::models::ResolveResponse;
use crate::routes::AppState;
use crate::services::target_host;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use std::sync::Arc;

/// Header carrying the comma-separated dial targets.
pub const X_UPSTREAM: HeaderName = HeaderName::from_static("x-upstream");

/// Handler for GET /v1/resolve
///
/// Always answers 200 with at least one upstream. Under the `reject` policy
/// the auth middleware has already verified the request, so only the lookup
/// runs here.
#[tracing::instrument(skip_all, name = "shield.resolve")]
pub async fn resolve_upstreams(
    State(state): State<Arc<AppState>>,
    authenticated: Option<Extension<Authenticated>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let upstreams = match authenticated {
        Some(_) => {
            let host = target_host(&headers);
            state.resolver.resolve_authenticated(host.as_deref()).await
        }
        None => state.resolver.resolve(&headers).await,
    };

    let joined = upstreams
        .iter()
        .map(|u| u.dial())
        .collect::<Vec<_>>()
        .join(",");

    let mut response_headers = HeaderMap::new();
    match HeaderValue::from_str(&joined) {
        Ok(value) => {
            response_headers.insert(X_UPSTREAM, value);
        }
        Err(e) => {
            tracing::warn!(target: "shield.resolve", error = %e, "Upstream list is not a valid header value");
        }
    }

    (response_headers, Json(ResolveResponse { upstreams }))
}
