//! Mock identity provider serving a key set over HTTP.

use crate::keypair::{jwks_json, TestKeypair};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock serves its key set from.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Wiremock-backed identity provider.
pub struct MockIdentityProvider {
    server: MockServer,
}

impl MockIdentityProvider {
    /// Start a provider publishing `keypairs`.
    pub async fn start(keypairs: &[&TestKeypair]) -> Self {
        let provider = Self {
            server: MockServer::start().await,
        };
        provider.publish(keypairs).await;
        provider
    }

    /// Start a provider whose key set endpoint answers `status`.
    pub async fn failing(status: u16) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        Self { server }
    }

    /// Replace the published key set, e.g. to simulate rotation.
    pub async fn publish(&self, keypairs: &[&TestKeypair]) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json(keypairs)))
            .mount(&self.server)
            .await;
    }

    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Number of key set fetches received so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}
