use axum::{
    extract::{rejection::FormRejection, Extension, Form},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::{
    jwt::{sign_hs256, AccessTokenClaims},
    now_unix_seconds,
    password::verify_password,
    AuthConfig,
};
use crate::api::handlers::{
    error::{ApiError, ErrorBody},
    users::storage::find_credentials,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

const BAD_CREDENTIALS: &str = "Incorrect username or password";

#[utoipa::path(
    post,
    path = "/api/v1/auth/token",
    request_body(content = TokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Access token issued.", body = TokenResponse),
        (status = 401, description = "Unknown username or wrong password.", body = ErrorBody),
        (status = 422, description = "Missing form fields.", body = ErrorBody),
    ),
    tag = "auth"
)]
/// Exchanges a username and password for a bearer access token.
/// Unknown users and wrong passwords share one `401`.
pub async fn issue_token(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let Form(request) = form?;

    let Some(credentials) = find_credentials(&pool, &request.username).await? else {
        warn!(username = %request.username, "Login for unknown user");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    };

    if !verify_password(request.password, credentials.password_hash).await? {
        warn!(username = %credentials.username, "Login with wrong password");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    }

    let iat = now_unix_seconds();
    let claims = AccessTokenClaims {
        sub: credentials.username,
        role: credentials.role.as_str().to_string(),
        iat,
        exp: iat.saturating_add(config.token_ttl_seconds()),
    };
    let access_token = sign_hs256(config.signing_key(), &claims)
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("failed to sign access token: {err}")))?;

    info!(username = %claims.sub, "Access token issued");

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
        }),
    ))
}
