//! Key set cache and fetcher for identity provider public keys.
//!
//! The identity provider publishes its verification keys as a JSON Web Key
//! Set. Shield keeps exactly one key set in memory (a single-slot cache) and
//! replaces it as a whole when it goes stale.
//!
//! # Concurrency
//!
//! - `get_fresh` takes the read lock only and never fetches
//! - `refresh` takes the write lock, re-checks freshness, then fetches while
//!   still holding it; concurrent stale callers collapse into one fetch and
//!   readers arriving mid-refresh wait for the new entry
//! - A failed fetch leaves the slot untouched
//!
//! # Security
//!
//! - Symmetric (`oct`) keys are never loaded; a published key must not double
//!   as an HMAC secret
//! - Keys without a `kid` are skipped since they can never be selected

use crate::observability::metrics::{record_key_set_fetch, record_key_set_lookup};
use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::instrument;

/// Default key set max-age (60 seconds).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_millis(60_000);

/// Errors from fetching or parsing a key set.
#[derive(Debug, Error)]
pub enum KeySetError {
    #[error("Key set fetch failed: {0}")]
    Fetch(String),

    #[error("Key set endpoint returned status {0}")]
    Status(u16),

    #[error("Key set document could not be parsed: {0}")]
    Parse(String),

    #[error("Key set HTTP client could not be built: {0}")]
    ClientBuild(String),
}

/// Raw key set document as served by the identity provider.
///
/// Keys stay untyped here so one malformed entry cannot reject the document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeySetDocument {
    #[serde(default)]
    pub keys: Vec<serde_json::Value>,
}

/// A single usable verification key.
pub struct VerificationKey {
    decoding_key: DecodingKey,
    /// Algorithm pinned by the JWK, if any.
    algorithm: Option<KeyAlgorithm>,
}

impl VerificationKey {
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Whether a token signed with `alg` may be checked against this key.
    ///
    /// Keys without a pinned algorithm accept any algorithm of their family;
    /// the family check itself happens during signature verification.
    pub fn accepts(&self, alg: Algorithm) -> bool {
        let Some(pinned) = self.algorithm else {
            return true;
        };

        matches!(
            (pinned, alg),
            (KeyAlgorithm::RS256, Algorithm::RS256)
                | (KeyAlgorithm::RS384, Algorithm::RS384)
                | (KeyAlgorithm::RS512, Algorithm::RS512)
                | (KeyAlgorithm::PS256, Algorithm::PS256)
                | (KeyAlgorithm::PS384, Algorithm::PS384)
                | (KeyAlgorithm::PS512, Algorithm::PS512)
                | (KeyAlgorithm::ES256, Algorithm::ES256)
                | (KeyAlgorithm::ES384, Algorithm::ES384)
                | (KeyAlgorithm::EdDSA, Algorithm::EdDSA)
        )
    }
}

/// An immutable set of verification keys indexed by `kid`.
///
/// Replaced as a whole on refresh, never mutated.
pub struct KeySet {
    keys: HashMap<String, VerificationKey>,
    fetched_at_millis: i64,
}

impl KeySet {
    /// Build a key set from a parsed document, skipping unusable keys.
    pub fn from_document(document: KeySetDocument) -> Self {
        let mut keys = HashMap::with_capacity(document.keys.len());

        for raw in document.keys {
            let jwk: Jwk = match serde_json::from_value(raw) {
                Ok(jwk) => jwk,
                Err(e) => {
                    tracing::debug!(target: "shield.auth.jwks", error = %e, "Skipping unparseable JWK");
                    continue;
                }
            };

            let Some(kid) = jwk.common.key_id.clone().filter(|k| !k.is_empty()) else {
                tracing::debug!(target: "shield.auth.jwks", "Skipping JWK without kid");
                continue;
            };

            if matches!(jwk.algorithm, AlgorithmParameters::OctetKey(_)) {
                tracing::debug!(target: "shield.auth.jwks", kid = %kid, "Skipping symmetric JWK");
                continue;
            }

            let decoding_key = match DecodingKey::from_jwk(&jwk) {
                Ok(key) => key,
                Err(e) => {
                    tracing::debug!(target: "shield.auth.jwks", kid = %kid, error = %e, "Skipping JWK with unusable key material");
                    continue;
                }
            };

            keys.insert(
                kid,
                VerificationKey {
                    decoding_key,
                    algorithm: jwk.common.key_algorithm,
                },
            );
        }

        Self {
            keys,
            fetched_at_millis: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Parse a key set from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeySetError> {
        let document: KeySetDocument =
            serde_json::from_slice(bytes).map_err(|e| KeySetError::Parse(e.to_string()))?;
        Ok(Self::from_document(document))
    }

    pub fn get(&self, kid: &str) -> Option<&VerificationKey> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key identifiers, sorted.
    pub fn kids(&self) -> Vec<&str> {
        let mut kids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        kids.sort_unstable();
        kids
    }

    /// Wall-clock fetch time in Unix milliseconds.
    pub fn fetched_at_millis(&self) -> i64 {
        self.fetched_at_millis
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet")
            .field("kids", &self.kids())
            .field("fetched_at_millis", &self.fetched_at_millis)
            .finish()
    }
}

/// Retrieves a fresh key set from the identity provider.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    async fn fetch(&self) -> Result<KeySet, KeySetError>;
}

/// Fetches the key set over HTTP.
pub struct HttpKeySetFetcher {
    url: String,
    http_client: reqwest::Client,
}

impl HttpKeySetFetcher {
    /// Create a fetcher for `url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError::ClientBuild` if the HTTP client cannot be built.
    pub fn new(url: String, timeout: Duration) -> Result<Self, KeySetError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeySetError::ClientBuild(e.to_string()))?;

        Ok(Self { url, http_client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn fetch(&self) -> Result<KeySet, KeySetError> {
        tracing::debug!(target: "shield.auth.jwks", "Fetching key set from identity provider");

        let response = self.http_client.get(&self.url).send().await.map_err(|e| {
            tracing::error!(target: "shield.auth.jwks", error = %e, "Failed to fetch key set");
            KeySetError::Fetch(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(target: "shield.auth.jwks", status = %status, "Key set endpoint returned error");
            return Err(KeySetError::Status(status.as_u16()));
        }

        let document: KeySetDocument = response.json().await.map_err(|e| {
            tracing::error!(target: "shield.auth.jwks", error = %e, "Failed to parse key set response");
            KeySetError::Parse(e.to_string())
        })?;

        let advertised = document.keys.len();
        let key_set = KeySet::from_document(document);

        tracing::info!(
            target: "shield.auth.jwks",
            advertised_keys = advertised,
            usable_keys = key_set.len(),
            "Key set fetched"
        );

        Ok(key_set)
    }
}

/// Cache slot contents.
struct CacheEntry {
    key_set: Arc<KeySet>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn new(key_set: Arc<KeySet>) -> Self {
        Self {
            key_set,
            fetched_at: Instant::now(),
        }
    }

    fn is_fresh(&self, max_age: Duration) -> bool {
        self.fetched_at.elapsed() < max_age
    }
}

/// Snapshot of the cache for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    pub cached: bool,
    pub fresh: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at_millis: Option<i64>,
}

/// Single-slot, time-bound key set cache.
///
/// Shared process-wide behind an `Arc`; constructed once at startup.
pub struct KeySetCache {
    fetcher: Arc<dyn KeySetFetcher>,
    slot: RwLock<Option<CacheEntry>>,
    max_age: Duration,
}

impl KeySetCache {
    /// Create an empty cache. A zero `max_age` is replaced by the default.
    pub fn new(fetcher: Arc<dyn KeySetFetcher>, max_age: Duration) -> Self {
        let max_age = if max_age.is_zero() {
            tracing::warn!(
                target: "shield.auth.jwks",
                default_ms = DEFAULT_MAX_AGE.as_millis() as u64,
                "Key set max-age must be positive, using default"
            );
            DEFAULT_MAX_AGE
        } else {
            max_age
        };

        Self {
            fetcher,
            slot: RwLock::new(None),
            max_age,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Return the cached key set if present and fresh. Never fetches.
    pub async fn get_fresh(&self) -> Option<Arc<KeySet>> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|entry| entry.is_fresh(self.max_age))
            .map(|entry| Arc::clone(&entry.key_set))
    }

    /// Return a fresh key set, refreshing if the slot is empty or stale.
    pub async fn get(&self) -> Result<Arc<KeySet>, KeySetError> {
        {
            let slot = self.slot.read().await;
            match slot.as_ref() {
                Some(entry) if entry.is_fresh(self.max_age) => {
                    record_key_set_lookup("hit");
                    return Ok(Arc::clone(&entry.key_set));
                }
                Some(_) => record_key_set_lookup("stale"),
                None => record_key_set_lookup("miss"),
            }
        }

        self.refresh().await
    }

    /// Refresh the slot unless another caller already did.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the slot is left as it was.
    pub async fn refresh(&self) -> Result<Arc<KeySet>, KeySetError> {
        let mut slot = self.slot.write().await;

        if let Some(entry) = slot.as_ref() {
            if entry.is_fresh(self.max_age) {
                tracing::debug!(target: "shield.auth.jwks", "Key set refreshed by concurrent caller");
                return Ok(Arc::clone(&entry.key_set));
            }
        }

        let key_set = self.fetch_into(&mut slot).await?;
        Ok(key_set)
    }

    /// Force a refresh when the current entry is at least `min_age` old.
    ///
    /// Used when a token names a `kid` the cached set does not know (key
    /// rotation). Younger fresh entries are returned unchanged, which also
    /// bounds how often unknown kids can hit the identity provider.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the slot is left as it was.
    pub async fn refresh_if_older_than(
        &self,
        min_age: Duration,
    ) -> Result<Arc<KeySet>, KeySetError> {
        let mut slot = self.slot.write().await;

        if let Some(entry) = slot.as_ref() {
            if entry.is_fresh(self.max_age) && entry.fetched_at.elapsed() < min_age {
                return Ok(Arc::clone(&entry.key_set));
            }
        }

        tracing::debug!(target: "shield.auth.jwks", "Forcing key set refresh");
        self.fetch_into(&mut slot).await
    }

    /// Fetch and store. Caller holds the write lock.
    async fn fetch_into(
        &self,
        slot: &mut Option<CacheEntry>,
    ) -> Result<Arc<KeySet>, KeySetError> {
        let start = std::time::Instant::now();

        match self.fetcher.fetch().await {
            Ok(key_set) => {
                record_key_set_fetch("success", start.elapsed());
                let key_set = Arc::new(key_set);
                *slot = Some(CacheEntry::new(Arc::clone(&key_set)));
                Ok(key_set)
            }
            Err(e) => {
                record_key_set_fetch("error", start.elapsed());
                tracing::warn!(
                    target: "shield.auth.jwks",
                    error = %e,
                    has_previous = slot.is_some(),
                    "Key set refresh failed, keeping previous entry"
                );
                Err(e)
            }
        }
    }

    /// Report cache state without fetching.
    pub async fn status(&self) -> CacheStatus {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some(entry) => CacheStatus {
                cached: true,
                fresh: entry.is_fresh(self.max_age),
                fetched_at_millis: Some(entry.key_set.fetched_at_millis()),
            },
            None => CacheStatus {
                cached: false,
                fresh: false,
                fetched_at_millis: None,
            },
        }
    }
}
