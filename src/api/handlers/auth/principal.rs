//! Authenticated principal extraction.
//!
//! Flow Overview: read the bearer token, verify it, and reload the account it
//! names. The role always comes from the database row, never from the token.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use sqlx::{FromRow, PgPool};
use tracing::{debug, instrument};

use super::{
    jwt::{self, verify_hs256},
    now_unix_seconds,
    role::Role,
    AuthConfig,
};
use crate::api::handlers::error::ApiError;

/// Authenticated user context derived from the access token.
#[derive(Clone, Debug, FromRow)]
pub struct Principal {
    #[sqlx(rename = "id")]
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the bearer token into a principal, or return 401.
pub async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    config: &AuthConfig,
) -> Result<Principal, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized("Not authenticated"))?;

    let claims = verify_hs256(token, config.signing_key(), now_unix_seconds()).map_err(|err| {
        debug!("Rejected access token: {err}");
        match err {
            jwt::Error::Expired => ApiError::Unauthorized("Token has expired"),
            _ => ApiError::Unauthorized("Invalid token"),
        }
    })?;

    find_principal(pool, &claims.sub)
        .await?
        .ok_or(ApiError::Unauthorized("Invalid token"))
}

#[instrument(skip(pool))]
async fn find_principal(pool: &PgPool, username: &str) -> Result<Option<Principal>, sqlx::Error> {
    sqlx::query_as::<_, Principal>("SELECT id, username, role FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
}
