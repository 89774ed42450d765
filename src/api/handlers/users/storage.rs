//! Database access for accounts.

use sqlx::{FromRow, PgPool};
use tracing::instrument;

use super::types::UserResponse;
use crate::api::handlers::{
    auth::role::Role,
    error::{is_unique_violation, ApiError},
};

const USERNAME_TAKEN: &str = "A user with this username already exists.";
const EMAIL_TAKEN: &str = "A user with this email already exists.";

#[derive(Debug, FromRow)]
pub(crate) struct Credentials {
    pub username: String,
    pub role: Role,
    pub password_hash: String,
}

/// Validated registration fields with the password already hashed.
#[derive(Debug)]
pub(super) struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Validated profile changes; `None` keeps the stored value.
#[derive(Debug, Default)]
pub(super) struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

#[instrument(skip(pool))]
pub(crate) async fn find_credentials(
    pool: &PgPool,
    username: &str,
) -> Result<Option<Credentials>, sqlx::Error> {
    sqlx::query_as::<_, Credentials>(
        "SELECT username, role, password_hash FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

#[instrument(skip(pool))]
pub(super) async fn find_user(pool: &PgPool, user_id: i64) -> Result<Option<UserResponse>, sqlx::Error> {
    sqlx::query_as::<_, UserResponse>(
        "SELECT id, first_name, last_name, username, email, role FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Returns the `400` message when `username` or `email` already belongs to
/// another account. `exclude_id` skips the caller's own row on updates.
#[instrument(skip(pool))]
pub(super) async fn identity_conflict(
    pool: &PgPool,
    username: Option<&str>,
    email: Option<&str>,
    exclude_id: Option<i64>,
) -> Result<Option<&'static str>, sqlx::Error> {
    let (username_taken, email_taken): (bool, bool) = sqlx::query_as(
        r"
            SELECT
                COALESCE(bool_or(username = $1), FALSE) AS username_taken,
                COALESCE(bool_or(email = $2), FALSE) AS email_taken
            FROM users
            WHERE (username = $1 OR email = $2)
              AND ($3::BIGINT IS NULL OR id <> $3)
        ",
    )
    .bind(username)
    .bind(email)
    .bind(exclude_id)
    .fetch_one(pool)
    .await?;

    Ok(if username_taken {
        Some(USERNAME_TAKEN)
    } else if email_taken {
        Some(EMAIL_TAKEN)
    } else {
        None
    })
}

/// Maps a unique-violation raced past `identity_conflict` to the matching message.
fn map_identity_violation(err: sqlx::Error) -> ApiError {
    if !is_unique_violation(&err) {
        return ApiError::Database(err);
    }
    let on_email = err
        .as_database_error()
        .and_then(|db_err| db_err.constraint())
        .is_some_and(|constraint| constraint.contains("email"));
    ApiError::bad_request(if on_email { EMAIL_TAKEN } else { USERNAME_TAKEN })
}

#[instrument(skip(pool, user), fields(username = %user.username))]
pub(super) async fn insert_user(pool: &PgPool, user: NewUser) -> Result<UserResponse, ApiError> {
    sqlx::query_as::<_, UserResponse>(
        r"
            INSERT INTO users (first_name, last_name, username, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, first_name, last_name, username, email, role
        ",
    )
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.username)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.role)
    .fetch_one(pool)
    .await
    .map_err(map_identity_violation)
}

#[instrument(skip(pool, changes))]
pub(super) async fn update_user(
    pool: &PgPool,
    user_id: i64,
    changes: UserChanges,
) -> Result<Option<UserResponse>, ApiError> {
    sqlx::query_as::<_, UserResponse>(
        r"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                username = COALESCE($4, username),
                email = COALESCE($5, email),
                password_hash = COALESCE($6, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, first_name, last_name, username, email, role
        ",
    )
    .bind(user_id)
    .bind(changes.first_name)
    .bind(changes.last_name)
    .bind(changes.username)
    .bind(changes.email)
    .bind(changes.password_hash)
    .fetch_optional(pool)
    .await
    .map_err(map_identity_violation)
}

/// Deletes the account; products and reviews go with it through `ON DELETE CASCADE`.
#[instrument(skip(pool))]
pub(super) async fn delete_user(pool: &PgPool, user_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
