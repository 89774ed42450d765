use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use tracing::info;

use super::{
    storage::{identity_conflict, insert_user, NewUser},
    types::{RegisterRequest, UserResponse},
};
use crate::api::handlers::{
    auth::password::hash_password,
    error::{ApiError, ErrorBody},
    validation::{self, NAME_MAX},
};

#[utoipa::path(
    post,
    path = "/api/v1/users/registration",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created.", body = UserResponse),
        (status = 400, description = "Username or email already taken.", body = ErrorBody),
        (status = 422, description = "Invalid field.", body = ErrorBody),
    ),
    tag = "users"
)]
/// Creates an account. The caller may pick any role; it defaults to `customer`.
pub async fn register(
    Extension(pool): Extension<PgPool>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(payload) = payload?;

    let first_name = validation::display_name("first_name", &payload.first_name, NAME_MAX)?;
    let last_name = validation::display_name("last_name", &payload.last_name, NAME_MAX)?;
    let username = validation::username(&payload.username)?;
    let email = validation::email(&payload.email)?;
    validation::password(&payload.password)?;

    if let Some(message) = identity_conflict(&pool, Some(&username), Some(&email), None).await? {
        return Err(ApiError::bad_request(message));
    }

    let password_hash = hash_password(payload.password).await?;
    let user = insert_user(
        &pool,
        NewUser {
            first_name,
            last_name,
            username,
            email,
            password_hash,
            role: payload.role,
        },
    )
    .await?;

    info!(user_id = user.id, username = %user.username, role = user.role.as_str(), "User registered");

    Ok((StatusCode::CREATED, Json(user)))
}
