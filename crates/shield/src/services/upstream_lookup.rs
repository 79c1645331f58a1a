//! Directory service client mapping hostnames to upstream dial addresses.
//!
//! # Security
//!
//! - Shield authenticates with HTTP basic auth (client ID and secret)
//! - The client secret is held in a `SecretString` and never logged
//! - Every call is bounded by a timeout
//! - A single attempt per request, no retries

use crate::observability::metrics::record_upstream_lookup;
use common::secret::{ExposeSecret, SecretString};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::instrument;

/// Default connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// A backend dial address (`host:port`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Upstream {
    dial: String,
}

impl Upstream {
    pub fn new(dial: impl Into<String>) -> Self {
        Self { dial: dial.into() }
    }

    pub fn dial(&self) -> &str {
        &self.dial
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dial)
    }
}

/// Errors from a directory lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Directory request failed: {0}")]
    Transport(String),

    #[error("Directory returned status {0}")]
    Status(u16),

    #[error("Directory response could not be decoded: {0}")]
    Decode(String),

    #[error("Directory request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Directory HTTP client could not be built: {0}")]
    ClientBuild(String),
}

impl LookupError {
    /// Bounded label for metrics.
    pub fn status_label(&self) -> &'static str {
        match self {
            LookupError::Timeout(_) => "timeout",
            _ => "error",
        }
    }
}

/// Directory response body.
#[derive(Debug, Deserialize)]
struct UpstreamsResponse {
    #[serde(default)]
    upstreams: Option<Vec<String>>,
}

/// Looks up the upstreams serving a hostname.
#[async_trait::async_trait]
pub trait UpstreamLookup: Send + Sync {
    /// Returns upstreams in directory order. An empty list is not an error.
    async fn resolve(&self, host: &str) -> Result<Vec<Upstream>, LookupError>;
}

/// HTTP client for the directory service.
#[derive(Clone)]
pub struct HttpUpstreamLookup {
    client: Client,
    url: String,
    client_id: String,
    client_secret: SecretString,
    timeout: Duration,
}

impl HttpUpstreamLookup {
    /// Create a new directory client.
    ///
    /// # Arguments
    ///
    /// * `url` - Directory endpoint (queried with `?host=<hostname>`)
    /// * `client_id` / `client_secret` - Basic auth credentials
    /// * `timeout` - Upper bound for a single lookup
    ///
    /// # Errors
    ///
    /// Returns `LookupError::ClientBuild` if the HTTP client cannot be built.
    pub fn new(
        url: String,
        client_id: String,
        client_secret: SecretString,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
            .build()
            .map_err(|e| {
                tracing::error!(target: "shield.services.upstream_lookup", error = %e, "Failed to build HTTP client");
                LookupError::ClientBuild(e.to_string())
            })?;

        Ok(Self {
            client,
            url,
            client_id,
            client_secret,
            timeout,
        })
    }

    async fn request(&self, host: &str) -> Result<Vec<Upstream>, LookupError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .query(&[("host", host)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LookupError::Timeout(self.timeout)
                } else {
                    LookupError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                tracing::error!(target: "shield.services.upstream_lookup", status = %status, "Directory rejected Shield credentials");
            }
            return Err(LookupError::Status(status.as_u16()));
        }

        let body: UpstreamsResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        let upstreams = body
            .upstreams
            .unwrap_or_default()
            .into_iter()
            .filter_map(|dial| {
                let dial = dial.trim();
                if dial.is_empty() {
                    tracing::debug!(target: "shield.services.upstream_lookup", "Skipping blank upstream entry");
                    None
                } else {
                    Some(Upstream::new(dial))
                }
            })
            .collect();

        Ok(upstreams)
    }
}

#[async_trait::async_trait]
impl UpstreamLookup for HttpUpstreamLookup {
    #[instrument(skip(self), fields(host = %host))]
    async fn resolve(&self, host: &str) -> Result<Vec<Upstream>, LookupError> {
        let start = Instant::now();

        let result = match tokio::time::timeout(self.timeout, self.request(host)).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout(self.timeout)),
        };

        match &result {
            Ok(upstreams) if upstreams.is_empty() => {
                record_upstream_lookup("empty", start.elapsed());
                tracing::debug!(target: "shield.services.upstream_lookup", "Directory reported no upstreams");
            }
            Ok(upstreams) => {
                record_upstream_lookup("success", start.elapsed());
                tracing::debug!(target: "shield.services.upstream_lookup", count = upstreams.len(), "Directory lookup succeeded");
            }
            Err(e) => {
                record_upstream_lookup(e.status_label(), start.elapsed());
                tracing::warn!(target: "shield.services.upstream_lookup", error = %e, "Directory lookup failed");
            }
        }

        result
    }
}

pub mod mock {
    //! Scripted directory for tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock directory returning a fixed answer.
    pub struct MockUpstreamLookup {
        upstreams: Vec<Upstream>,
        return_error: bool,
        call_count: AtomicUsize,
    }

    impl MockUpstreamLookup {
        /// Create a mock that returns the given dial addresses.
        pub fn returning(dials: &[&str]) -> Self {
            Self {
                upstreams: dials.iter().map(|d| Upstream::new(*d)).collect(),
                return_error: false,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Create a mock that reports no upstreams.
        pub fn empty() -> Self {
            Self::returning(&[])
        }

        /// Create a mock that returns errors.
        pub fn failing() -> Self {
            Self {
                upstreams: vec![],
                return_error: true,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl UpstreamLookup for MockUpstreamLookup {
        async fn resolve(&self, _host: &str) -> Result<Vec<Upstream>, LookupError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.return_error {
                return Err(LookupError::Transport("mock failure".to_string()));
            }
            Ok(self.upstreams.clone())
        }
    }
}
