//! Shield configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use crate::auth::credential::CredentialSource;
use crate::services::upstream_lookup::Upstream;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default key set endpoint (identity provider core on its default port).
pub const DEFAULT_IDP_JWKS_URL: &str = "http://localhost:3567/.well-known/jwks.json";

/// Default key set cache max-age in milliseconds.
pub const DEFAULT_JWKS_CACHE_MAX_AGE_MS: u64 = 60_000;

/// Default minimum interval between unknown-kid refreshes, in seconds.
pub const DEFAULT_JWKS_UNKNOWN_KID_REFRESH_SECONDS: u64 = 10;

/// Default key set fetch timeout in milliseconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_MS: u64 = 5_000;

/// Default session cookie carrying the access token.
pub const DEFAULT_AUTH_COOKIE_NAME: &str = "sAccessToken";

/// Default directory service endpoint.
pub const DEFAULT_UPSTREAMS_URL: &str = "https://api.example.com/resource";

/// Default directory lookup timeout in milliseconds.
pub const DEFAULT_UPSTREAMS_TIMEOUT_MS: u64 = 2_000;

/// Default fallback dial address.
pub const DEFAULT_FALLBACK_UPSTREAM: &str = "localhost:3000";

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Default instance ID prefix.
pub const DEFAULT_INSTANCE_ID_PREFIX: &str = "shield";

/// What to do with a request whose credential does not verify.
///
/// Exactly one policy applies per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailurePolicy {
    /// Route the request to the fallback upstream.
    Fallback,
    /// Answer 401 before any upstream resolution.
    Reject,
}

impl AuthFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailurePolicy::Fallback => "fallback",
            AuthFailurePolicy::Reject => "reject",
        }
    }
}

impl FromStr for AuthFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(AuthFailurePolicy::Fallback),
            "reject" => Ok(AuthFailurePolicy::Reject),
            other => Err(format!(
                "expected one of 'fallback', 'reject', got '{}'",
                other
            )),
        }
    }
}

/// Shield configuration.
///
/// Loaded from environment variables with sensible defaults.
/// The directory client secret and database URL are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Identity provider key set endpoint.
    pub idp_jwks_url: String,

    /// How long a fetched key set stays fresh.
    pub jwks_cache_max_age: Duration,

    /// Minimum age of the cached key set before an unknown `kid` may force
    /// a refresh. Zero disables unknown-kid refreshes.
    pub jwks_unknown_kid_refresh: Duration,

    /// Timeout for a single key set fetch.
    pub jwks_fetch_timeout: Duration,

    /// Cookie carrying the access token.
    pub auth_cookie_name: String,

    /// Where credentials are read from.
    pub credential_source: CredentialSource,

    /// Policy for requests that fail verification.
    pub auth_failure_policy: AuthFailurePolicy,

    /// JWT clock skew tolerance in seconds for exp/nbf/iat validation.
    pub jwt_clock_skew_seconds: i64,

    /// Directory service endpoint mapping hostnames to upstreams.
    pub upstreams_url: String,

    /// Directory service client ID (basic auth username).
    pub upstreams_client_id: String,

    /// Directory service client secret (basic auth password).
    pub upstreams_client_secret: SecretString,

    /// Timeout for a single directory lookup.
    pub upstreams_timeout: Duration,

    /// Upstream used when authentication or lookup yields no routing decision.
    pub fallback_upstream: Upstream,

    /// Optional PostgreSQL connection URL.
    pub database_url: Option<SecretString>,

    /// Unique identifier for this instance.
    pub instance_id: String,

    /// Graceful shutdown drain period.
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("idp_jwks_url", &self.idp_jwks_url)
            .field("jwks_cache_max_age", &self.jwks_cache_max_age)
            .field("jwks_unknown_kid_refresh", &self.jwks_unknown_kid_refresh)
            .field("jwks_fetch_timeout", &self.jwks_fetch_timeout)
            .field("auth_cookie_name", &self.auth_cookie_name)
            .field("credential_source", &self.credential_source)
            .field("auth_failure_policy", &self.auth_failure_policy)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("upstreams_url", &self.upstreams_url)
            .field("upstreams_client_id", &self.upstreams_client_id)
            .field("upstreams_client_secret", &"[REDACTED]")
            .field("upstreams_timeout", &self.upstreams_timeout)
            .field("fallback_upstream", &self.fallback_upstream)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("instance_id", &self.instance_id)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid duration configuration: {0}")]
    InvalidDuration(String),

    #[error("Invalid authentication configuration: {0}")]
    InvalidAuth(String),

    #[error("Invalid fallback upstream: {0}")]
    InvalidFallbackUpstream(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let idp_jwks_url = vars
            .get("IDP_JWKS_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_IDP_JWKS_URL.to_string());

        let jwks_cache_max_age = Duration::from_millis(parse_positive_u64(
            vars,
            "JWKS_CACHE_MAX_AGE_MS",
            DEFAULT_JWKS_CACHE_MAX_AGE_MS,
        )?);

        // Zero is meaningful here (disables unknown-kid refreshes)
        let jwks_unknown_kid_refresh = match vars.get("JWKS_UNKNOWN_KID_REFRESH_SECONDS") {
            Some(value_str) => {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidDuration(format!(
                        "JWKS_UNKNOWN_KID_REFRESH_SECONDS must be a valid non-negative integer, got '{}': {}",
                        value_str, e
                    ))
                })?;
                Duration::from_secs(value)
            }
            None => Duration::from_secs(DEFAULT_JWKS_UNKNOWN_KID_REFRESH_SECONDS),
        };

        let jwks_fetch_timeout = Duration::from_millis(parse_positive_u64(
            vars,
            "JWKS_FETCH_TIMEOUT_MS",
            DEFAULT_JWKS_FETCH_TIMEOUT_MS,
        )?);

        let auth_cookie_name = vars
            .get("AUTH_COOKIE_NAME")
            .cloned()
            .unwrap_or_else(|| DEFAULT_AUTH_COOKIE_NAME.to_string());
        if auth_cookie_name.trim().is_empty() {
            return Err(ConfigError::InvalidAuth(
                "AUTH_COOKIE_NAME must not be empty".to_string(),
            ));
        }

        let credential_source = match vars.get("AUTH_CREDENTIAL_SOURCE") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidAuth(format!("AUTH_CREDENTIAL_SOURCE: {}", e))
            })?,
            None => CredentialSource::CookieOrBearer,
        };

        let auth_failure_policy = match vars.get("AUTH_FAILURE_POLICY") {
            Some(value_str) => value_str
                .parse()
                .map_err(|e| ConfigError::InvalidAuth(format!("AUTH_FAILURE_POLICY: {}", e)))?,
            None => AuthFailurePolicy::Fallback,
        };

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        let upstreams_url = vars
            .get("UPSTREAMS_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_UPSTREAMS_URL.to_string());

        let upstreams_client_id = vars
            .get("UPSTREAMS_CLIENT_ID")
            .ok_or_else(|| ConfigError::MissingEnvVar("UPSTREAMS_CLIENT_ID".to_string()))?
            .clone();

        let upstreams_client_secret = vars
            .get("UPSTREAMS_CLIENT_SECRET")
            .map(|s| SecretString::from(s.as_str()))
            .ok_or_else(|| ConfigError::MissingEnvVar("UPSTREAMS_CLIENT_SECRET".to_string()))?;

        let upstreams_timeout = Duration::from_millis(parse_positive_u64(
            vars,
            "UPSTREAMS_TIMEOUT_MS",
            DEFAULT_UPSTREAMS_TIMEOUT_MS,
        )?);

        let fallback_raw = vars
            .get("FALLBACK_UPSTREAM")
            .map(String::as_str)
            .unwrap_or(DEFAULT_FALLBACK_UPSTREAM);
        let fallback_upstream = parse_dial_address(fallback_raw)?;

        let database_url = vars
            .get("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .map(|s| SecretString::from(s.as_str()));

        // Generate instance ID
        let instance_id = vars.get("SHIELD_INSTANCE_ID").cloned().unwrap_or_else(|| {
            let hostname = vars
                .get("HOSTNAME")
                .cloned()
                .unwrap_or_else(|| "unknown".to_string());
            // Use first 8 chars of UUID for uniqueness
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{}-{}-{}", DEFAULT_INSTANCE_ID_PREFIX, hostname, short_suffix)
        });

        let drain_seconds = match vars.get("SHIELD_DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidDuration(format!(
                    "SHIELD_DRAIN_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?,
            None => DEFAULT_DRAIN_SECONDS,
        };

        Ok(Config {
            bind_address,
            idp_jwks_url,
            jwks_cache_max_age,
            jwks_unknown_kid_refresh,
            jwks_fetch_timeout,
            auth_cookie_name,
            credential_source,
            auth_failure_policy,
            jwt_clock_skew_seconds,
            upstreams_url,
            upstreams_client_id,
            upstreams_client_secret,
            upstreams_timeout,
            fallback_upstream,
            database_url,
            instance_id,
            drain_seconds,
        })
    }
}

/// Parse an optional strictly positive integer variable.
fn parse_positive_u64(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidDuration(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidDuration(format!(
            "{} must be greater than 0",
            name
        )));
    }

    Ok(value)
}

/// Validate a `host:port` dial address.
fn parse_dial_address(raw: &str) -> Result<Upstream, ConfigError> {
    let trimmed = raw.trim();
    let (host, port) = trimmed.rsplit_once(':').ok_or_else(|| {
        ConfigError::InvalidFallbackUpstream(format!(
            "FALLBACK_UPSTREAM must be host:port, got '{}'",
            raw
        ))
    })?;

    if host.is_empty() {
        return Err(ConfigError::InvalidFallbackUpstream(format!(
            "FALLBACK_UPSTREAM is missing a host, got '{}'",
            raw
        )));
    }

    port.parse::<u16>().map_err(|e| {
        ConfigError::InvalidFallbackUpstream(format!(
            "FALLBACK_UPSTREAM port must be a valid port number, got '{}': {}",
            port, e
        ))
    })?;

    Ok(Upstream::new(trimmed))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            ("UPSTREAMS_CLIENT_ID".to_string(), "shield-client".to_string()),
            (
                "UPSTREAMS_CLIENT_SECRET".to_string(),
                "shield-client-secret".to_string(),
            ),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let vars = base_vars();

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.idp_jwks_url, DEFAULT_IDP_JWKS_URL);
        assert_eq!(config.jwks_cache_max_age, Duration::from_millis(60_000));
        assert_eq!(config.jwks_unknown_kid_refresh, Duration::from_secs(10));
        assert_eq!(config.jwks_fetch_timeout, Duration::from_millis(5_000));
        assert_eq!(config.auth_cookie_name, "sAccessToken");
        assert_eq!(config.credential_source, CredentialSource::CookieOrBearer);
        assert_eq!(config.auth_failure_policy, AuthFailurePolicy::Fallback);
        assert_eq!(
            config.jwt_clock_skew_seconds,
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        );
        assert_eq!(config.upstreams_url, DEFAULT_UPSTREAMS_URL);
        assert_eq!(config.upstreams_client_id, "shield-client");
        assert_eq!(
            config.upstreams_client_secret.expose_secret(),
            "shield-client-secret"
        );
        assert_eq!(config.upstreams_timeout, Duration::from_millis(2_000));
        assert_eq!(config.fallback_upstream.dial(), "localhost:3000");
        assert!(config.database_url.is_none());
        assert_eq!(config.drain_seconds, DEFAULT_DRAIN_SECONDS);
        // Instance ID should be auto-generated
        assert!(config.instance_id.starts_with("shield-"));
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert(
            "IDP_JWKS_URL".to_string(),
            "https://auth.example.com/.well-known/jwks.json".to_string(),
        );
        vars.insert("JWKS_CACHE_MAX_AGE_MS".to_string(), "1500".to_string());
        vars.insert(
            "JWKS_UNKNOWN_KID_REFRESH_SECONDS".to_string(),
            "0".to_string(),
        );
        vars.insert("JWKS_FETCH_TIMEOUT_MS".to_string(), "250".to_string());
        vars.insert("AUTH_COOKIE_NAME".to_string(), "session".to_string());
        vars.insert("AUTH_CREDENTIAL_SOURCE".to_string(), "bearer".to_string());
        vars.insert("AUTH_FAILURE_POLICY".to_string(), "REJECT".to_string());
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "120".to_string());
        vars.insert(
            "UPSTREAMS_URL".to_string(),
            "https://directory.internal/upstreams".to_string(),
        );
        vars.insert("UPSTREAMS_TIMEOUT_MS".to_string(), "750".to_string());
        vars.insert("FALLBACK_UPSTREAM".to_string(), "10.0.0.1:8080".to_string());
        vars.insert(
            "DATABASE_URL".to_string(),
            "postgresql://localhost/shield".to_string(),
        );
        vars.insert("SHIELD_INSTANCE_ID".to_string(), "shield-001".to_string());
        vars.insert("SHIELD_DRAIN_SECONDS".to_string(), "0".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(
            config.idp_jwks_url,
            "https://auth.example.com/.well-known/jwks.json"
        );
        assert_eq!(config.jwks_cache_max_age, Duration::from_millis(1500));
        assert_eq!(config.jwks_unknown_kid_refresh, Duration::ZERO);
        assert_eq!(config.jwks_fetch_timeout, Duration::from_millis(250));
        assert_eq!(config.auth_cookie_name, "session");
        assert_eq!(config.credential_source, CredentialSource::Bearer);
        assert_eq!(config.auth_failure_policy, AuthFailurePolicy::Reject);
        assert_eq!(config.jwt_clock_skew_seconds, 120);
        assert_eq!(config.upstreams_url, "https://directory.internal/upstreams");
        assert_eq!(config.upstreams_timeout, Duration::from_millis(750));
        assert_eq!(config.fallback_upstream.dial(), "10.0.0.1:8080");
        assert_eq!(
            config.database_url.as_ref().unwrap().expose_secret(),
            "postgresql://localhost/shield"
        );
        assert_eq!(config.instance_id, "shield-001");
        assert_eq!(config.drain_seconds, 0);
    }

    #[test]
    fn test_from_vars_missing_client_id() {
        let mut vars = base_vars();
        vars.remove("UPSTREAMS_CLIENT_ID");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "UPSTREAMS_CLIENT_ID"));
    }

    #[test]
    fn test_from_vars_missing_client_secret() {
        let mut vars = base_vars();
        vars.remove("UPSTREAMS_CLIENT_SECRET");

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "UPSTREAMS_CLIENT_SECRET")
        );
    }

    #[test]
    fn test_cache_max_age_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("JWKS_CACHE_MAX_AGE_MS".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidDuration(msg)) if msg.contains("JWKS_CACHE_MAX_AGE_MS must be greater than 0"))
        );
    }

    #[test]
    fn test_cache_max_age_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert("JWKS_CACHE_MAX_AGE_MS".to_string(), "one-minute".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidDuration(msg)) if msg.contains("must be a valid positive integer"))
        );
    }

    #[test]
    fn test_upstreams_timeout_rejects_negative() {
        let mut vars = base_vars();
        vars.insert("UPSTREAMS_TIMEOUT_MS".to_string(), "-5".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidDuration(_))));
    }

    #[test]
    fn test_jwt_clock_skew_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtClockSkew(msg)) if msg.contains("must be positive"))
        );
    }

    #[test]
    fn test_jwt_clock_skew_rejects_too_large() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "601".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtClockSkew(msg)) if msg.contains("must not exceed 600"))
        );
    }

    #[test]
    fn test_jwt_clock_skew_accepts_max() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "600".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.jwt_clock_skew_seconds, 600);
    }

    #[test]
    fn test_empty_cookie_name_rejected() {
        let mut vars = base_vars();
        vars.insert("AUTH_COOKIE_NAME".to_string(), "  ".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidAuth(_))));
    }

    #[test]
    fn test_unknown_credential_source_rejected() {
        let mut vars = base_vars();
        vars.insert("AUTH_CREDENTIAL_SOURCE".to_string(), "query".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidAuth(msg)) if msg.contains("AUTH_CREDENTIAL_SOURCE"))
        );
    }

    #[test]
    fn test_unknown_failure_policy_rejected() {
        let mut vars = base_vars();
        vars.insert("AUTH_FAILURE_POLICY".to_string(), "allow".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidAuth(msg)) if msg.contains("AUTH_FAILURE_POLICY"))
        );
    }

    #[test]
    fn test_fallback_upstream_requires_port() {
        let mut vars = base_vars();
        vars.insert("FALLBACK_UPSTREAM".to_string(), "localhost".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidFallbackUpstream(_))
        ));
    }

    #[test]
    fn test_fallback_upstream_rejects_bad_port() {
        let mut vars = base_vars();
        vars.insert("FALLBACK_UPSTREAM".to_string(), "localhost:http".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidFallbackUpstream(msg)) if msg.contains("valid port"))
        );
    }

    #[test]
    fn test_fallback_upstream_rejects_missing_host() {
        let mut vars = base_vars();
        vars.insert("FALLBACK_UPSTREAM".to_string(), ":3000".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidFallbackUpstream(msg)) if msg.contains("missing a host"))
        );
    }

    #[test]
    fn test_blank_database_url_is_ignored() {
        let mut vars = base_vars();
        vars.insert("DATABASE_URL".to_string(), "".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_failure_policy_round_trip_names() {
        assert_eq!(
            "fallback".parse::<AuthFailurePolicy>().unwrap().as_str(),
            "fallback"
        );
        assert_eq!(
            "Reject".parse::<AuthFailurePolicy>().unwrap().as_str(),
            "reject"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut vars = base_vars();
        vars.insert(
            "DATABASE_URL".to_string(),
            "postgresql://user:pw@localhost/shield".to_string(),
        );
        let config = Config::from_vars(&vars).expect("Config should load successfully");

        let debug_output = format!("{:?}", config);

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shield-client-secret"));
        assert!(!debug_output.contains("postgresql://"));
        assert!(debug_output.contains("shield-client"));
    }
}
