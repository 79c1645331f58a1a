//! Token verification against a key set.
//!
//! # Security
//!
//! - Header pre-checks (size, `kid`, asymmetric `alg`) run before any key lookup
//! - The key is selected by `kid` and must accept the header's algorithm
//! - `exp` and `nbf` are checked with clock skew leeway when present
//! - `iat` more than the clock skew in the future is rejected
//! - Issuer and audience are not checked; any well-formed, correctly signed
//!   token from the identity provider is accepted

use crate::auth::jwks::KeySet;
use common::jwt::{extract_header, validate_iat, JwtValidationError};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Validation};
use std::time::Duration;
use thiserror::Error;

/// Decoded claim set.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Why a token did not verify.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationFailure {
    #[error("token failed pre-validation: {0:?}")]
    Token(JwtValidationError),

    #[error("no key with the token's kid")]
    UnknownKid,

    #[error("token algorithm does not match the key")]
    AlgorithmMismatch,

    #[error("signature does not verify")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("claims are not a well-formed object")]
    MalformedClaims,

    #[error("claims are empty")]
    EmptyClaims,
}

impl VerificationFailure {
    /// Bounded label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            VerificationFailure::Token(e) => e.reason(),
            VerificationFailure::UnknownKid => "unknown_kid",
            VerificationFailure::AlgorithmMismatch => "algorithm_mismatch",
            VerificationFailure::SignatureInvalid => "signature_invalid",
            VerificationFailure::Expired => "expired",
            VerificationFailure::NotYetValid => "not_yet_valid",
            VerificationFailure::MalformedClaims => "malformed_claims",
            VerificationFailure::EmptyClaims => "empty_claims",
        }
    }
}

/// Verifies signed tokens against a key set.
#[derive(Debug, Clone, Copy)]
pub struct TokenVerifier {
    clock_skew: Duration,
}

impl TokenVerifier {
    pub fn new(clock_skew: Duration) -> Self {
        Self { clock_skew }
    }

    /// Verify `token` and return its claims.
    ///
    /// # Errors
    ///
    /// Returns the first check that failed.
    pub fn verify(&self, token: &str, key_set: &KeySet) -> Result<Claims, VerificationFailure> {
        let header = extract_header(token).map_err(VerificationFailure::Token)?;

        let key = key_set.get(&header.kid).ok_or_else(|| {
            tracing::debug!(target: "shield.auth.jwt", kid = %header.kid, "Key not found in key set");
            VerificationFailure::UnknownKid
        })?;

        if !key.accepts(header.alg) {
            tracing::debug!(target: "shield.auth.jwt", kid = %header.kid, alg = ?header.alg, "Token algorithm not allowed for key");
            return Err(VerificationFailure::AlgorithmMismatch);
        }

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.clock_skew.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data =
            decode::<Claims>(token, key.decoding_key(), &validation).map_err(|e| {
                let failure = match e.kind() {
                    ErrorKind::InvalidSignature => VerificationFailure::SignatureInvalid,
                    ErrorKind::ExpiredSignature => VerificationFailure::Expired,
                    ErrorKind::ImmatureSignature => VerificationFailure::NotYetValid,
                    ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                        VerificationFailure::AlgorithmMismatch
                    }
                    ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) => {
                        VerificationFailure::Token(JwtValidationError::MalformedToken)
                    }
                    _ => VerificationFailure::MalformedClaims,
                };
                tracing::debug!(target: "shield.auth.jwt", error = %e, reason = failure.reason(), "Token verification failed");
                failure
            })?;

        let claims = token_data.claims;
        if claims.is_empty() {
            return Err(VerificationFailure::EmptyClaims);
        }

        // A non-numeric exp/nbf is skipped by decode when not required
        for name in ["exp", "nbf"] {
            if claims.get(name).is_some_and(|v| !v.is_number()) {
                tracing::debug!(target: "shield.auth.jwt", claim = name, "Time claim is not numeric");
                return Err(VerificationFailure::MalformedClaims);
            }
        }

        if let Some(iat) = claims.get("iat") {
            let iat = iat.as_i64().ok_or(VerificationFailure::MalformedClaims)?;
            validate_iat(iat, self.clock_skew).map_err(VerificationFailure::Token)?;
        }

        tracing::debug!(target: "shield.auth.jwt", kid = %header.kid, "Token verified");
        Ok(claims)
    }
}
