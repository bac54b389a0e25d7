//! Deployment tokens
//!
//! A deployment token is an HS256 JWT whose payload is a [`DeploymentClaims`].
//! The server holds a [`TokenVerifier`]; the CLI (and tests) use a
//! [`TokenSigner`] built from the same shared secret.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::domain::deployment::DeploymentClaims;

/// Lifetime of tokens issued by [`TokenSigner::new`]
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 600;

/// Errors raised while signing or verifying tokens
#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, malformed structure, expired, wrong algorithm...
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Verifies deployment tokens against the shared secret
///
/// `exp` is enforced only when the token carries one. `aud`, `iss` and
/// `sub` are not checked.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        // Signature and expiry only; other registered claims are ignored
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Checks the signature (and expiry, if present) and returns the payload
    ///
    /// Never panics; every failure is reported as [`TokenError::Invalid`].
    pub fn verify(&self, token: &str) -> Result<DeploymentClaims, TokenError> {
        let data = decode::<DeploymentClaims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }
}

/// Issues deployment tokens
#[derive(Clone)]
pub struct TokenSigner {
    key: EncodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        }
    }

    /// Overrides the token lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Signs a token for `service` and `image`, stamped with `iat` and `exp`
    pub fn sign(&self, service: &str, image: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = DeploymentClaims {
            service: Some(service.to_string()),
            image: Some(image.to_string()),
            iat: Some(now.timestamp()),
            exp: Some((now + self.ttl).timestamp()),
        };

        self.sign_claims(&claims)
    }

    /// Signs arbitrary claims as-is
    pub fn sign_claims(&self, claims: &DeploymentClaims) -> Result<String, TokenError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.key)?)
    }
}
