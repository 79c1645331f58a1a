//! Per-request routing decision.
//!
//! Combines the authentication verdict with a directory lookup:
//!
//! | Verdict | Lookup | Result |
//! |---|---|---|
//! | false | not attempted | fallback |
//! | true | error | fallback |
//! | true | empty | fallback |
//! | true | non-empty | looked-up list, verbatim |
//!
//! Resolution never fails; the worst case is the fallback address.

use crate::auth::authenticator::Authenticator;
use crate::observability::metrics::record_resolution;
use crate::services::upstream_lookup::{Upstream, UpstreamLookup};
use axum::http::{header, HeaderMap};
use std::sync::Arc;
use tracing::instrument;

/// Header a fronting proxy uses to pass the original host.
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Why the fallback address was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    Unauthenticated,
    MissingHost,
    LookupFailed,
    EmptyLookup,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::Unauthenticated => "unauthenticated",
            FallbackReason::MissingHost => "missing_host",
            FallbackReason::LookupFailed => "lookup_failed",
            FallbackReason::EmptyLookup => "empty_lookup",
        }
    }
}

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Vec<Upstream>),
    Fallback(FallbackReason),
}

/// Orchestrates authentication and lookup for each request.
pub struct UpstreamResolver {
    authenticator: Arc<dyn Authenticator>,
    lookup: Arc<dyn UpstreamLookup>,
    fallback: Upstream,
}

impl UpstreamResolver {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        lookup: Arc<dyn UpstreamLookup>,
        fallback: Upstream,
    ) -> Self {
        Self {
            authenticator,
            lookup,
            fallback,
        }
    }

    pub fn fallback(&self) -> &Upstream {
        &self.fallback
    }

    /// Resolve the dial targets for a request. Always non-empty.
    pub async fn resolve(&self, headers: &HeaderMap) -> Vec<Upstream> {
        let resolution = self.decide(headers).await;
        self.into_upstreams(resolution)
    }

    /// Resolve for a request already known to be authenticated.
    pub async fn resolve_authenticated(&self, host: Option<&str>) -> Vec<Upstream> {
        let resolution = self.lookup_host(host).await;
        self.into_upstreams(resolution)
    }

    /// Run the full decision and report which branch was taken.
    #[instrument(skip_all)]
    pub async fn decide(&self, headers: &HeaderMap) -> Resolution {
        if !self.authenticator.verify(headers).await {
            return Resolution::Fallback(FallbackReason::Unauthenticated);
        }

        let host = target_host(headers);
        self.lookup_host(host.as_deref()).await
    }

    async fn lookup_host(&self, host: Option<&str>) -> Resolution {
        let Some(host) = host else {
            tracing::debug!(target: "shield.services.resolver", "No target host on request");
            return Resolution::Fallback(FallbackReason::MissingHost);
        };

        match self.lookup.resolve(host).await {
            Ok(upstreams) if upstreams.is_empty() => {
                Resolution::Fallback(FallbackReason::EmptyLookup)
            }
            Ok(upstreams) => Resolution::Resolved(upstreams),
            Err(_) => Resolution::Fallback(FallbackReason::LookupFailed),
        }
    }

    fn into_upstreams(&self, resolution: Resolution) -> Vec<Upstream> {
        match resolution {
            Resolution::Resolved(upstreams) => {
                record_resolution("resolved", "none");
                tracing::debug!(target: "shield.services.resolver", count = upstreams.len(), "Resolved upstreams");
                upstreams
            }
            Resolution::Fallback(reason) => {
                record_resolution("fallback", reason.as_str());
                tracing::debug!(
                    target: "shield.services.resolver",
                    reason = reason.as_str(),
                    fallback = %self.fallback,
                    "Using fallback upstream"
                );
                vec![self.fallback.clone()]
            }
        }
    }
}

/// Hostname the request is addressed to, without port, lowercased.
///
/// `X-Forwarded-Host` (first entry) wins over `Host`.
pub fn target_host(headers: &HeaderMap) -> Option<String> {
    let raw = headers
        .get(X_FORWARDED_HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })?;

    let host = strip_port(raw);
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

fn strip_port(authority: &str) -> &str {
    // Bracketed IPv6 literal, with or without port
    if let Some(rest) = authority.strip_prefix('[') {
        return rest.split_once(']').map_or(rest, |(addr, _)| addr);
    }

    match authority.split_once(':') {
        // A second colon means a bare IPv6 address, not host:port
        Some((host, port)) if !port.contains(':') => host,
        _ => authority,
    }
}
