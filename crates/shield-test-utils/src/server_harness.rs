//! Test server harness for Shield E2E tests.
//!
//! Spawns a real Shield server on a random port, pointed at a mock identity
//! provider and a mock directory.

use crate::directory::{MockDirectory, DIRECTORY_CLIENT_ID, DIRECTORY_CLIENT_SECRET};
use crate::identity_provider::MockIdentityProvider;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use shield::config::Config;
use shield::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Fallback upstream used when the caller does not override it.
pub const TEST_FALLBACK_UPSTREAM: &str = "localhost:3000";

/// Shared metrics handle. Only one global recorder can be installed per
/// process, so later callers get a handle that is not wired to it.
fn test_metrics_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test server for E2E testing.
///
/// The server runs in a background task and is aborted on drop.
pub struct TestShieldServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestShieldServer {
    /// Spawn a server wired to `idp` and `directory`.
    ///
    /// `overrides` are applied on top of the default test environment.
    pub async fn spawn<I>(
        idp: &MockIdentityProvider,
        directory: &MockDirectory,
        overrides: I,
    ) -> Result<Self, anyhow::Error>
    where
        I: IntoIterator<Item = (&'static str, &'static str)>,
    {
        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("IDP_JWKS_URL".to_string(), idp.jwks_url()),
            ("UPSTREAMS_URL".to_string(), directory.url()),
            (
                "UPSTREAMS_CLIENT_ID".to_string(),
                DIRECTORY_CLIENT_ID.to_string(),
            ),
            (
                "UPSTREAMS_CLIENT_SECRET".to_string(),
                DIRECTORY_CLIENT_SECRET.to_string(),
            ),
            (
                "FALLBACK_UPSTREAM".to_string(),
                TEST_FALLBACK_UPSTREAM.to_string(),
            ),
            ("SHIELD_INSTANCE_ID".to_string(), "shield-test".to_string()),
            ("SHIELD_DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);
        for (key, value) in overrides {
            vars.insert(key.to_string(), value.to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(
            AppState::new(config, None)
                .map_err(|e| anyhow::anyhow!("Failed to build state: {}", e))?,
        );

        let app = routes::build_routes(Arc::clone(&state), test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server failed");
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Base URL of the server (e.g., "http://127.0.0.1:12345").
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// Shared state, for inspecting the key set cache.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

impl Drop for TestShieldServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
