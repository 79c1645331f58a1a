//! Request authenticators.
//!
//! An authenticator answers one question per request: does it carry a valid
//! credential? Every failure mode degrades to `false`.

use crate::auth::credential::{extract_credential, CredentialSource};
use crate::auth::jwks::{KeySet, KeySetCache};
use crate::auth::jwt::{TokenVerifier, VerificationFailure};
use crate::observability::metrics::record_auth_verification;
use axum::http::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Capability to authenticate a request from its headers.
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns true only when a credential is present and verifies.
    async fn verify(&self, headers: &HeaderMap) -> bool;
}

/// Verifies signed tokens against the identity provider's key set.
pub struct JwksAuthenticator {
    cache: Arc<KeySetCache>,
    verifier: TokenVerifier,
    source: CredentialSource,
    cookie_name: String,
    /// Minimum entry age before an unknown `kid` forces a refresh.
    unknown_kid_refresh: Option<Duration>,
}

impl JwksAuthenticator {
    pub fn new(
        cache: Arc<KeySetCache>,
        verifier: TokenVerifier,
        source: CredentialSource,
        cookie_name: String,
    ) -> Self {
        Self {
            cache,
            verifier,
            source,
            cookie_name,
            unknown_kid_refresh: None,
        }
    }

    /// Allow an unknown `kid` to refresh the key set once the cached entry is
    /// at least `min_age` old. A zero duration leaves this disabled.
    pub fn with_unknown_kid_refresh(mut self, min_age: Duration) -> Self {
        self.unknown_kid_refresh = (!min_age.is_zero()).then_some(min_age);
        self
    }

    /// Verify and report the failure reason.
    async fn authenticate(&self, headers: &HeaderMap) -> Result<(), &'static str> {
        let credential = extract_credential(headers, self.source, &self.cookie_name)
            .ok_or("no_credential")?;

        let key_set = self.cache.get().await.map_err(|e| {
            tracing::warn!(target: "shield.auth", error = %e, "Key set unavailable, failing closed");
            "key_set_unavailable"
        })?;

        match self.verifier.verify(credential.as_str(), &key_set) {
            Ok(_) => Ok(()),
            Err(VerificationFailure::UnknownKid) => {
                self.retry_after_rotation(credential.as_str(), &key_set)
                    .await
            }
            Err(failure) => Err(failure.reason()),
        }
    }

    /// Handle an unknown `kid` by refreshing the key set if allowed.
    async fn retry_after_rotation(
        &self,
        token: &str,
        current: &Arc<KeySet>,
    ) -> Result<(), &'static str> {
        let unknown_kid = VerificationFailure::UnknownKid.reason();
        let Some(min_age) = self.unknown_kid_refresh else {
            return Err(unknown_kid);
        };

        let refreshed = self.cache.refresh_if_older_than(min_age).await.map_err(|e| {
            tracing::warn!(target: "shield.auth", error = %e, "Key set refresh for unknown kid failed");
            unknown_kid
        })?;

        if Arc::ptr_eq(&refreshed, current) {
            return Err(unknown_kid);
        }

        tracing::debug!(target: "shield.auth", "Retrying verification against refreshed key set");
        self.verifier
            .verify(token, &refreshed)
            .map(|_| ())
            .map_err(|failure| failure.reason())
    }
}

#[async_trait::async_trait]
impl Authenticator for JwksAuthenticator {
    #[instrument(skip_all, fields(source = self.source.as_str()))]
    async fn verify(&self, headers: &HeaderMap) -> bool {
        match self.authenticate(headers).await {
            Ok(()) => {
                record_auth_verification("verified", "none");
                true
            }
            Err("no_credential") => {
                tracing::debug!(target: "shield.auth", "No credential present");
                record_auth_verification("absent", "no_credential");
                false
            }
            Err(reason) => {
                tracing::info!(target: "shield.auth", reason = reason, "Credential rejected");
                record_auth_verification("rejected", reason);
                false
            }
        }
    }
}

pub mod mock {
    //! Fixed-verdict authenticator for tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock authenticator returning a fixed verdict.
    pub struct MockAuthenticator {
        verdict: bool,
        call_count: AtomicUsize,
    }

    impl MockAuthenticator {
        /// Create a mock that authenticates every request.
        pub fn accepting() -> Self {
            Self {
                verdict: true,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Create a mock that rejects every request.
        pub fn rejecting() -> Self {
            Self {
                verdict: false,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Authenticator for MockAuthenticator {
        async fn verify(&self, _headers: &HeaderMap) -> bool {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.verdict
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::{KeySetDocument, KeySetError, KeySetFetcher};
    use axum::http::{header, HeaderValue};
    use chrono::Utc;
    use shield_test_utils::TestKeypair;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves whatever key set it currently holds.
    struct SwappableFetcher {
        jwks: Mutex<Vec<serde_json::Value>>,
        fail: AtomicBool,
        calls: AtomicUsize,
    }

    impl SwappableFetcher {
        fn new(keys: Vec<serde_json::Value>) -> Arc<Self> {
            Arc::new(Self {
                jwks: Mutex::new(keys),
                fail: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            })
        }

        fn publish(&self, keys: Vec<serde_json::Value>) {
            *self.jwks.lock().unwrap() = keys;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl KeySetFetcher for SwappableFetcher {
        async fn fetch(&self) -> Result<KeySet, KeySetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(KeySetError::Status(503));
            }
            let keys = self.jwks.lock().unwrap().clone();
            Ok(KeySet::from_document(KeySetDocument { keys }))
        }
    }

    fn authenticator(fetcher: Arc<SwappableFetcher>, source: CredentialSource) -> JwksAuthenticator {
        let cache = Arc::new(KeySetCache::new(fetcher, Duration::from_secs(60)));
        JwksAuthenticator::new(
            cache,
            TokenVerifier::new(Duration::from_secs(300)),
            source,
            "sAccessToken".to_string(),
        )
    }

    fn token_for(keypair: &TestKeypair) -> String {
        let now = Utc::now().timestamp();
        keypair.sign(&serde_json::json!({"sub": "user-1", "iat": now, "exp": now + 600}))
    }

    fn cookie_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("sAccessToken={token}")).unwrap(),
        );
        headers
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_no_credential_is_false_without_fetch() {
        let keypair = TestKeypair::new(1, "key-1");
        let fetcher = SwappableFetcher::new(vec![keypair.jwk_json()]);
        let auth = authenticator(fetcher.clone(), CredentialSource::CookieOrBearer);

        assert!(!auth.verify(&HeaderMap::new()).await);

        let mut malformed = HeaderMap::new();
        malformed.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(!auth.verify(&malformed).await);

        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_valid_cookie_token_verifies() {
        let keypair = TestKeypair::new(1, "key-1");
        let fetcher = SwappableFetcher::new(vec![keypair.jwk_json()]);
        let auth = authenticator(fetcher.clone(), CredentialSource::CookieOrBearer);

        assert!(auth.verify(&cookie_headers(&token_for(&keypair))).await);
        assert!(auth.verify(&bearer_headers(&token_for(&keypair))).await);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_source_is_respected() {
        let keypair = TestKeypair::new(1, "key-1");
        let fetcher = SwappableFetcher::new(vec![keypair.jwk_json()]);
        let auth = authenticator(fetcher, CredentialSource::Cookie);

        assert!(!auth.verify(&bearer_headers(&token_for(&keypair))).await);
        assert!(auth.verify(&cookie_headers(&token_for(&keypair))).await);
    }

    #[tokio::test]
    async fn test_bad_signature_is_false() {
        let real = TestKeypair::new(1, "key-1");
        let impostor = TestKeypair::new(7, "key-1");
        let fetcher = SwappableFetcher::new(vec![real.jwk_json()]);
        let auth = authenticator(fetcher, CredentialSource::CookieOrBearer);

        assert!(!auth.verify(&cookie_headers(&token_for(&impostor))).await);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_false() {
        let keypair = TestKeypair::new(1, "key-1");
        let fetcher = SwappableFetcher::new(vec![keypair.jwk_json()]);
        fetcher.fail.store(true, Ordering::SeqCst);
        let auth = authenticator(fetcher, CredentialSource::CookieOrBearer);

        assert!(!auth.verify(&cookie_headers(&token_for(&keypair))).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_kid_refresh_picks_up_rotated_key() {
        let old = TestKeypair::new(1, "key-1");
        let rotated = TestKeypair::new(2, "key-2");
        let fetcher = SwappableFetcher::new(vec![old.jwk_json()]);
        let auth = authenticator(fetcher.clone(), CredentialSource::CookieOrBearer)
            .with_unknown_kid_refresh(Duration::from_secs(10));

        assert!(auth.verify(&cookie_headers(&token_for(&old))).await);

        fetcher.publish(vec![old.jwk_json(), rotated.jwk_json()]);

        // Entry too young: rotated key not visible yet
        assert!(!auth.verify(&cookie_headers(&token_for(&rotated))).await);
        assert_eq!(fetcher.calls(), 1);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(auth.verify(&cookie_headers(&token_for(&rotated))).await);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_kid_refresh_disabled() {
        let old = TestKeypair::new(1, "key-1");
        let rotated = TestKeypair::new(2, "key-2");
        let fetcher = SwappableFetcher::new(vec![old.jwk_json()]);
        let auth = authenticator(fetcher.clone(), CredentialSource::CookieOrBearer)
            .with_unknown_kid_refresh(Duration::ZERO);

        assert!(auth.verify(&cookie_headers(&token_for(&old))).await);
        fetcher.publish(vec![rotated.jwk_json()]);
        tokio::time::advance(Duration::from_secs(30)).await;

        assert!(!auth.verify(&cookie_headers(&token_for(&rotated))).await);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_authenticator_counts_calls() {
        let accepting = mock::MockAuthenticator::accepting();
        let rejecting = mock::MockAuthenticator::rejecting();

        assert!(accepting.verify(&HeaderMap::new()).await);
        assert!(accepting.verify(&HeaderMap::new()).await);
        assert!(!rejecting.verify(&HeaderMap::new()).await);

        assert_eq!(accepting.call_count(), 2);
        assert_eq!(rejecting.call_count(), 1);
    }
}
