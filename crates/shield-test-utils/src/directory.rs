//! Mock hostname directory.
//!
//! Answers `GET /upstreams?host=<host>` for hosts registered with
//! [`MockDirectory::respond_for`], and only when the request carries the
//! expected basic credentials.

use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DIRECTORY_PATH: &str = "/upstreams";
pub const DIRECTORY_CLIENT_ID: &str = "shield-client";
pub const DIRECTORY_CLIENT_SECRET: &str = "shield-client-secret";

/// Wiremock-backed directory.
pub struct MockDirectory {
    server: MockServer,
}

impl MockDirectory {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Answer `{"upstreams": [...]}` for `host`.
    pub async fn respond_for(&self, host: &str, upstreams: &[&str]) {
        self.respond_with(
            host,
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "upstreams": upstreams })),
        )
        .await;
    }

    /// Answer `status` with no body for `host`.
    pub async fn fail_for(&self, host: &str, status: u16) {
        self.respond_with(host, ResponseTemplate::new(status)).await;
    }

    /// Answer `{"upstreams": [...]}` for `host` after `delay`.
    pub async fn respond_slowly_for(&self, host: &str, upstreams: &[&str], delay: std::time::Duration) {
        self.respond_with(
            host,
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "upstreams": upstreams }))
                .set_delay(delay),
        )
        .await;
    }

    pub async fn respond_with(&self, host: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(DIRECTORY_PATH))
            .and(query_param("host", host))
            .and(basic_auth(DIRECTORY_CLIENT_ID, DIRECTORY_CLIENT_SECRET))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), DIRECTORY_PATH)
    }

    /// Number of lookups received so far.
    pub async fn lookup_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}
