//! Credential extraction from inbound request headers.
//!
//! A credential is read from a named cookie or from an
//! `Authorization: Bearer <token>` header. Nothing here verifies anything;
//! an absent or malformed credential is simply `None`.

use axum::http::{header, HeaderMap};
use common::jwt::MAX_JWT_SIZE_BYTES;
use std::fmt;
use std::str::FromStr;

const BEARER_PREFIX: &str = "bearer ";

/// Where credentials are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Cookie,
    Bearer,
    /// Cookie first, then the Authorization header.
    CookieOrBearer,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Cookie => "cookie",
            CredentialSource::Bearer => "bearer",
            CredentialSource::CookieOrBearer => "cookie_or_bearer",
        }
    }
}

impl FromStr for CredentialSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cookie" => Ok(CredentialSource::Cookie),
            "bearer" => Ok(CredentialSource::Bearer),
            "cookie_or_bearer" => Ok(CredentialSource::CookieOrBearer),
            other => Err(format!(
                "expected one of 'cookie', 'bearer', 'cookie_or_bearer', got '{}'",
                other
            )),
        }
    }
}

/// An opaque token string taken from a request. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"[REDACTED]").finish()
    }
}

/// Extract a credential according to `source`.
pub fn extract_credential(
    headers: &HeaderMap,
    source: CredentialSource,
    cookie_name: &str,
) -> Option<Credential> {
    let raw = match source {
        CredentialSource::Cookie => from_cookie(headers, cookie_name),
        CredentialSource::Bearer => from_bearer(headers),
        CredentialSource::CookieOrBearer => {
            from_cookie(headers, cookie_name).or_else(|| from_bearer(headers))
        }
    }?;

    if raw.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "shield.auth.credential",
            token_size = raw.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Credential ignored: size exceeds maximum allowed"
        );
        return None;
    }

    Some(Credential(raw.to_string()))
}

/// Find `cookie_name` across all Cookie headers.
fn from_cookie<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// Read `Authorization: Bearer <token>` with a case-insensitive scheme.
fn from_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;

    if value.len() <= BEARER_PREFIX.len() {
        return None;
    }

    let scheme = value.get(..BEARER_PREFIX.len())?;
    let token = value.get(BEARER_PREFIX.len()..)?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn extract(map: &HeaderMap, source: CredentialSource) -> Option<String> {
        extract_credential(map, source, "sAccessToken").map(|c| c.as_str().to_string())
    }

    #[test]
    fn test_no_headers_is_absent() {
        let map = HeaderMap::new();
        assert!(extract(&map, CredentialSource::CookieOrBearer).is_none());
        assert!(extract(&map, CredentialSource::Cookie).is_none());
        assert!(extract(&map, CredentialSource::Bearer).is_none());
    }

    #[test]
    fn test_cookie_found_among_others() {
        let map = headers(&[(
            header::COOKIE,
            "theme=dark; sAccessToken=abc.def.ghi; lang=en",
        )]);
        assert_eq!(
            extract(&map, CredentialSource::Cookie).as_deref(),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn test_cookie_across_multiple_headers() {
        let map = headers(&[
            (header::COOKIE, "theme=dark"),
            (header::COOKIE, "sAccessToken=tok"),
        ]);
        assert_eq!(extract(&map, CredentialSource::Cookie).as_deref(), Some("tok"));
    }

    #[test]
    fn test_cookie_quoted_value() {
        let map = headers(&[(header::COOKIE, "sAccessToken=\"tok\"")]);
        assert_eq!(extract(&map, CredentialSource::Cookie).as_deref(), Some("tok"));
    }

    #[test]
    fn test_cookie_empty_value_is_absent() {
        let map = headers(&[(header::COOKIE, "sAccessToken=")]);
        assert!(extract(&map, CredentialSource::Cookie).is_none());
    }

    #[test]
    fn test_cookie_name_must_match_exactly() {
        let map = headers(&[(header::COOKIE, "sAccessTokenOld=tok; xsAccessToken=tok")]);
        assert!(extract(&map, CredentialSource::Cookie).is_none());
    }

    #[test]
    fn test_custom_cookie_name() {
        let map = headers(&[(header::COOKIE, "session=tok")]);
        let credential = extract_credential(&map, CredentialSource::Cookie, "session");
        assert_eq!(credential.unwrap().as_str(), "tok");
    }

    #[test]
    fn test_bearer_case_insensitive_scheme() {
        for value in ["Bearer tok", "bearer tok", "BEARER tok", "bEaReR tok"] {
            let map = headers(&[(header::AUTHORIZATION, value)]);
            assert_eq!(
                extract(&map, CredentialSource::Bearer).as_deref(),
                Some("tok"),
                "scheme variant {value}"
            );
        }
    }

    #[test]
    fn test_bearer_single_character_token() {
        let map = headers(&[(header::AUTHORIZATION, "Bearer x")]);
        assert_eq!(extract(&map, CredentialSource::Bearer).as_deref(), Some("x"));
    }

    #[test]
    fn test_bearer_too_short_is_absent() {
        for value in ["Bearer ", "Bearer", "Bear", ""] {
            let map = headers(&[(header::AUTHORIZATION, value)]);
            assert!(
                extract(&map, CredentialSource::Bearer).is_none(),
                "value {value:?}"
            );
        }
    }

    #[test]
    fn test_bearer_whitespace_token_is_absent() {
        let map = headers(&[(header::AUTHORIZATION, "Bearer    ")]);
        assert!(extract(&map, CredentialSource::Bearer).is_none());
    }

    #[test]
    fn test_other_scheme_is_absent() {
        let map = headers(&[(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")]);
        assert!(extract(&map, CredentialSource::Bearer).is_none());
    }

    #[test]
    fn test_cookie_wins_over_bearer() {
        let map = headers(&[
            (header::COOKIE, "sAccessToken=from-cookie"),
            (header::AUTHORIZATION, "Bearer from-header"),
        ]);
        assert_eq!(
            extract(&map, CredentialSource::CookieOrBearer).as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn test_bearer_used_when_cookie_missing() {
        let map = headers(&[
            (header::COOKIE, "theme=dark"),
            (header::AUTHORIZATION, "Bearer from-header"),
        ]);
        assert_eq!(
            extract(&map, CredentialSource::CookieOrBearer).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn test_source_restricts_lookup() {
        let cookie_only = headers(&[(header::COOKIE, "sAccessToken=tok")]);
        let bearer_only = headers(&[(header::AUTHORIZATION, "Bearer tok")]);

        assert!(extract(&cookie_only, CredentialSource::Bearer).is_none());
        assert!(extract(&bearer_only, CredentialSource::Cookie).is_none());
    }

    #[test]
    fn test_oversized_token_is_absent() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        let map = headers(&[(header::AUTHORIZATION, &format!("Bearer {token}"))]);
        assert!(extract(&map, CredentialSource::Bearer).is_none());

        let at_limit = "a".repeat(MAX_JWT_SIZE_BYTES);
        let map = headers(&[(header::AUTHORIZATION, &format!("Bearer {at_limit}"))]);
        assert!(extract(&map, CredentialSource::Bearer).is_some());
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let map = headers(&[(header::AUTHORIZATION, "Bearer secret-token")]);
        let credential = extract_credential(&map, CredentialSource::Bearer, "sAccessToken").unwrap();
        let debug = format!("{credential:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_source_parse() {
        assert_eq!(
            "cookie".parse::<CredentialSource>().unwrap(),
            CredentialSource::Cookie
        );
        assert_eq!(
            " Bearer ".parse::<CredentialSource>().unwrap(),
            CredentialSource::Bearer
        );
        assert_eq!(
            "cookie_or_bearer".parse::<CredentialSource>().unwrap(),
            CredentialSource::CookieOrBearer
        );
        assert!("header".parse::<CredentialSource>().is_err());
        assert_eq!(CredentialSource::CookieOrBearer.as_str(), "cookie_or_bearer");
    }
}
