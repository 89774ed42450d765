//! Review handlers.
//!
//! Single reviews are addressed through their product; a review id that
//! belongs to a different product is reported as missing.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::{
    storage::{self, Table},
    types::{
        CreateReviewRequest, ProductResponse, ReviewListQuery, ReviewResponse, UpdateReviewRequest,
    },
    PRODUCT_NOT_FOUND, REVIEW_NOT_FOUND,
};
use crate::api::handlers::{
    auth::{permission::Policy, principal::require_auth, AuthConfig},
    error::{unique_or, ApiError, ErrorBody},
    validation,
};

const REVIEW_EXISTS: &str = "You have already reviewed this product.";
const OWN_PRODUCT: &str = "You cannot review your own product.";

async fn resolve_product(pool: &PgPool, slug: &str) -> Result<ProductResponse, ApiError> {
    storage::find_product(pool, slug)
        .await?
        .ok_or(ApiError::NotFound(PRODUCT_NOT_FOUND))
}

fn parse_review_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::unprocessable("review_id: must be an integer"))
}

/// Loads the review only if it belongs to `product`.
async fn resolve_review(
    pool: &PgPool,
    product: &ProductResponse,
    review_id: i64,
) -> Result<Option<ReviewResponse>, ApiError> {
    Ok(storage::find_review(pool, review_id)
        .await?
        .filter(|review| review.product_id == product.id))
}

#[utoipa::path(
    get,
    path = "/api/v1/reviews",
    params(ReviewListQuery),
    responses(
        (status = 200, description = "List reviews.", body = [ReviewResponse]),
        (status = 404, description = "Product not found.", body = ErrorBody),
    ),
    tag = "reviews"
)]
/// Lists every review, or only those of `product_slug`.
pub async fn list_reviews(
    Extension(pool): Extension<PgPool>,
    query: Result<Query<ReviewListQuery>, QueryRejection>,
) -> Result<Json<Vec<ReviewResponse>>, ApiError> {
    let Query(query) = query?;
    let product_id = match query.product_slug.as_deref() {
        Some(slug) => Some(resolve_product(&pool, slug).await?.id),
        None => None,
    };
    Ok(Json(storage::fetch_reviews(&pool, product_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{product_slug}/reviews",
    params(("product_slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Reviews of the product.", body = [ReviewResponse]),
        (status = 404, description = "Product not found.", body = ErrorBody),
    ),
    tag = "reviews"
)]
pub async fn list_product_reviews(
    Path(product_slug): Path<String>,
    Extension(pool): Extension<PgPool>,
) -> Result<Json<Vec<ReviewResponse>>, ApiError> {
    let product = resolve_product(&pool, &product_slug).await?;
    Ok(Json(storage::fetch_reviews(&pool, Some(product.id)).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{product_slug}/reviews/{review_id}",
    params(
        ("product_slug" = String, Path, description = "Product slug"),
        ("review_id" = i64, Path, description = "Review id"),
    ),
    responses(
        (status = 200, description = "Review detail.", body = ReviewResponse),
        (status = 404, description = "Product or review not found.", body = ErrorBody),
        (status = 422, description = "Review id is not an integer.", body = ErrorBody),
    ),
    tag = "reviews"
)]
pub async fn get_review(
    Path((product_slug, review_id)): Path<(String, String)>,
    Extension(pool): Extension<PgPool>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let review_id = parse_review_id(&review_id)?;
    let product = resolve_product(&pool, &product_slug).await?;
    resolve_review(&pool, &product, review_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(REVIEW_NOT_FOUND))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{product_slug}/reviews",
    request_body = CreateReviewRequest,
    params(("product_slug" = String, Path, description = "Product slug")),
    responses(
        (status = 201, description = "Review created.", body = ReviewResponse),
        (status = 400, description = "Own product, or already reviewed.", body = ErrorBody),
        (status = 401, description = "Missing, invalid or expired token.", body = ErrorBody),
        (status = 404, description = "Product not found.", body = ErrorBody),
        (status = 422, description = "Invalid field.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "reviews"
)]
/// Adds the caller's review to a product. Each account reviews a product at most once,
/// and the product's owner cannot review it.
pub async fn create_review(
    Path(product_slug): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let principal = require_auth(&headers, &pool, &config).await?;
    let product = resolve_product(&pool, &product_slug).await?;
    Policy::Authenticated.check_role(&principal)?;
    let Json(payload) = payload?;

    let grade = validation::grade(payload.grade)?;
    let text = validation::optional_text(payload.text);

    if product.user_id == principal.user_id {
        return Err(ApiError::bad_request(OWN_PRODUCT));
    }
    if storage::review_exists(&pool, principal.user_id, product.id).await? {
        return Err(ApiError::bad_request(REVIEW_EXISTS));
    }

    let review = storage::insert_review(&pool, product.id, principal.user_id, grade, text)
        .await
        .map_err(unique_or(REVIEW_EXISTS))?;

    info!(review_id = review.id, product = %product.slug, author = %principal.username, "Review created");
    Ok((StatusCode::CREATED, Json(review)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/products/{product_slug}/reviews/{review_id}",
    request_body = UpdateReviewRequest,
    params(
        ("product_slug" = String, Path, description = "Product slug"),
        ("review_id" = i64, Path, description = "Review id"),
    ),
    responses(
        (status = 200, description = "Review updated.", body = ReviewResponse),
        (status = 400, description = "No fields to update.", body = ErrorBody),
        (status = 401, description = "Missing, invalid or expired token.", body = ErrorBody),
        (status = 403, description = "Caller is neither the author nor an administrator.", body = ErrorBody),
        (status = 404, description = "Product or review not found.", body = ErrorBody),
        (status = 422, description = "Invalid field.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "reviews"
)]
pub async fn update_review(
    Path((product_slug, review_id)): Path<(String, String)>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    payload: Result<Json<UpdateReviewRequest>, JsonRejection>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let principal = require_auth(&headers, &pool, &config).await?;
    let review_id = parse_review_id(&review_id)?;
    let product = resolve_product(&pool, &product_slug).await?;
    let target = resolve_review(&pool, &product, review_id).await?;
    let review = Policy::Authenticated.authorize(&principal, target, REVIEW_NOT_FOUND)?;
    let Json(payload) = payload?;

    if payload.is_empty() {
        return Err(ApiError::bad_request("No fields to update."));
    }
    let grade = payload.grade.map(validation::grade).transpose()?;
    let text = validation::optional_text(payload.text);

    let updated = storage::update_review(&pool, review.id, grade, text)
        .await?
        .ok_or(ApiError::NotFound(REVIEW_NOT_FOUND))?;

    info!(review_id = updated.id, product = %product.slug, "Review updated");
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{product_slug}/reviews/{review_id}",
    params(
        ("product_slug" = String, Path, description = "Product slug"),
        ("review_id" = i64, Path, description = "Review id"),
    ),
    responses(
        (status = 204, description = "Review deleted."),
        (status = 401, description = "Missing, invalid or expired token.", body = ErrorBody),
        (status = 403, description = "Caller is neither the author nor an administrator.", body = ErrorBody),
        (status = 404, description = "Product or review not found.", body = ErrorBody),
        (status = 422, description = "Review id is not an integer.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "reviews"
)]
pub async fn delete_review(
    Path((product_slug, review_id)): Path<(String, String)>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<StatusCode, ApiError> {
    let principal = require_auth(&headers, &pool, &config).await?;
    let review_id = parse_review_id(&review_id)?;
    let product = resolve_product(&pool, &product_slug).await?;
    let target = resolve_review(&pool, &product, review_id).await?;
    let review = Policy::Authenticated.authorize(&principal, target, REVIEW_NOT_FOUND)?;

    if storage::delete_row(&pool, Table::Reviews, review.id).await? == 0 {
        return Err(ApiError::NotFound(REVIEW_NOT_FOUND));
    }

    info!(review_id = review.id, product = %product.slug, "Review deleted");
    Ok(StatusCode::NO_CONTENT)
}
