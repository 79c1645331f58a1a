//! Verify-first authentication gate.
//!
//! Used only under the `reject` failure policy: requests that do not verify
//! are answered with 401 before any upstream resolution happens.

use crate::errors::ShieldError;
use crate::routes::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// Marker placed in request extensions once the request has verified.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated;

/// Reject unauthenticated requests with 401.
///
/// # Response
///
/// - 401 Unauthorized with `WWW-Authenticate` if the credential is missing or invalid
/// - Otherwise continues with [`Authenticated`] in the request extensions
#[instrument(skip_all, name = "shield.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ShieldError> {
    if !state.authenticator.verify(req.headers()).await {
        tracing::debug!(target: "shield.middleware.auth", "Rejecting unauthenticated request");
        return Err(ShieldError::InvalidToken(
            "The access token is invalid or expired".to_string(),
        ));
    }

    req.extensions_mut().insert(Authenticated);

    Ok(next.run(req).await)
}
