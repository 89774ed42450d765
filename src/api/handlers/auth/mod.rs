//! Authentication and authorization.
//!
//! Flow Overview:
//! 1) `POST /api/v1/auth/token` checks a username/password against the Argon2
//!    hash and signs an HS256 access token whose subject is the username.
//! 2) Protected handlers call [`principal::require_auth`], which verifies the
//!    bearer token and reloads the user row so role changes apply at once.
//! 3) [`permission::Policy`] decides whether the principal may act on the
//!    target the handler resolved.

pub mod jwt;
pub mod password;
pub mod permission;
pub mod principal;
pub mod role;
pub mod token;

use secrecy::{ExposeSecret, SecretString};
use std::time::SystemTime;

const DEFAULT_TOKEN_TTL_MINUTES: u32 = 60;

/// Unix seconds for token issuance and expiry checks.
pub(crate) fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Signing material and lifetime for access tokens.
#[derive(Debug)]
pub struct AuthConfig {
    secret: SecretString,
    token_ttl_minutes: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
        }
    }

    #[must_use]
    pub fn with_token_ttl_minutes(mut self, minutes: u32) -> Self {
        self.token_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        i64::from(self.token_ttl_minutes) * 60
    }

    pub(crate) fn signing_key(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }
}
