//! Shield error types.
//!
//! Errors surfaced over HTTP map to status codes via `IntoResponse`.
//! Client-facing messages are generic; details are logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Shield error type.
///
/// Maps to HTTP status codes:
/// - InvalidToken: 401 Unauthorized
/// - Database, Setup: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ShieldError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Setup error: {0}")]
    Setup(String),
}

impl ShieldError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            ShieldError::InvalidToken(_) => 401,
            ShieldError::Database(_) | ShieldError::Setup(_) => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ShieldError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ShieldError::InvalidToken(reason) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", reason.clone())
            }
            ShieldError::Database(err) => {
                tracing::error!(target: "shield.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            ShieldError::Setup(err) => {
                tracing::error!(target: "shield.setup", error = %err, "Setup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"shield\", error=\"invalid_token\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

impl From<sqlx::Error> for ShieldError {
    fn from(err: sqlx::Error) -> Self {
        ShieldError::Database(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display_invalid_token() {
        let error = ShieldError::InvalidToken("expired".to_string());
        assert_eq!(format!("{}", error), "Invalid token: expired");
    }

    #[test]
    fn test_display_setup() {
        let error = ShieldError::Setup("bad client".to_string());
        assert_eq!(format!("{}", error), "Setup error: bad client");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ShieldError::InvalidToken("x".into()).status_code(), 401);
        assert_eq!(ShieldError::Database("x".into()).status_code(), 500);
        assert_eq!(ShieldError::Setup("x".into()).status_code(), 500);
    }

    #[tokio::test]
    async fn test_invalid_token_response_has_www_authenticate() {
        let response =
            ShieldError::InvalidToken("The access token is invalid or expired".to_string())
                .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let header = response
            .headers()
            .get("WWW-Authenticate")
            .expect("401 must carry WWW-Authenticate")
            .to_str()
            .unwrap();
        assert_eq!(header, "Bearer realm=\"shield\", error=\"invalid_token\"");

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
        assert_eq!(
            body["error"]["message"],
            "The access token is invalid or expired"
        );
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let response =
            ShieldError::Database("password authentication failed".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "DATABASE_ERROR");
        assert!(!body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("password"));
    }

    #[tokio::test]
    async fn test_setup_error_is_internal() {
        let response = ShieldError::Setup("tls backend".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    }
}
