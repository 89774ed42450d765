//! The caller's own account.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::{
    storage::{delete_user, find_user, identity_conflict, update_user, UserChanges},
    types::{UpdateUserRequest, UserResponse},
};
use crate::api::handlers::{
    auth::{password::hash_password, principal::require_auth, AuthConfig},
    error::{ApiError, ErrorBody},
    validation::{self, NAME_MAX},
};

const USER_NOT_FOUND: &str = "User not found.";

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "The authenticated account.", body = UserResponse),
        (status = 401, description = "Missing, invalid or expired token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn get_me(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<UserResponse>, ApiError> {
    let principal = require_auth(&headers, &pool, &config).await?;
    let user = find_user(&pool, principal.user_id)
        .await?
        .ok_or(ApiError::NotFound(USER_NOT_FOUND))?;
    Ok(Json(user))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated.", body = UserResponse),
        (status = 400, description = "No fields given, or username/email taken.", body = ErrorBody),
        (status = 401, description = "Missing, invalid or expired token.", body = ErrorBody),
        (status = 422, description = "Invalid field.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
/// Updates the caller's profile. A new password is re-hashed; the role cannot be changed here.
/// Renaming the account invalidates outstanding tokens, which name the old username.
pub async fn update_me(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let principal = require_auth(&headers, &pool, &config).await?;
    let Json(payload) = payload?;
    if payload.is_empty() {
        return Err(ApiError::bad_request("No fields to update."));
    }

    let mut changes = UserChanges {
        first_name: payload
            .first_name
            .as_deref()
            .map(|value| validation::display_name("first_name", value, NAME_MAX))
            .transpose()?,
        last_name: payload
            .last_name
            .as_deref()
            .map(|value| validation::display_name("last_name", value, NAME_MAX))
            .transpose()?,
        username: payload
            .username
            .as_deref()
            .map(validation::username)
            .transpose()?,
        email: payload.email.as_deref().map(validation::email).transpose()?,
        password_hash: None,
    };
    if let Some(password) = payload.password.as_deref() {
        validation::password(password)?;
    }

    if let Some(message) = identity_conflict(
        &pool,
        changes.username.as_deref(),
        changes.email.as_deref(),
        Some(principal.user_id),
    )
    .await?
    {
        return Err(ApiError::bad_request(message));
    }

    if let Some(password) = payload.password {
        changes.password_hash = Some(hash_password(password).await?);
    }

    let user = update_user(&pool, principal.user_id, changes)
        .await?
        .ok_or(ApiError::NotFound(USER_NOT_FOUND))?;

    info!(user_id = user.id, "User profile updated");
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/me",
    responses(
        (status = 204, description = "Account deleted with its products and reviews."),
        (status = 401, description = "Missing, invalid or expired token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn delete_me(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<StatusCode, ApiError> {
    let principal = require_auth(&headers, &pool, &config).await?;
    if delete_user(&pool, principal.user_id).await? == 0 {
        return Err(ApiError::NotFound(USER_NOT_FOUND));
    }
    info!(user_id = principal.user_id, username = %principal.username, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
