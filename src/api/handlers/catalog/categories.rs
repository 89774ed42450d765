//! Category tree handlers.

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
    storage::{self, Slugged, Table},
    types::{CategoryListQuery, CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest},
    CATEGORY_NOT_FOUND,
};
use crate::api::handlers::{
    auth::{permission::Policy, principal::require_auth, AuthConfig},
    error::{unique_or, ApiError, ErrorBody},
    validation,
};

const CATEGORY_EXISTS: &str = "A category with this name already exists.";

async fn resolve_category(pool: &PgPool, slug: &str) -> Result<CategoryResponse, ApiError> {
    storage::find_category(pool, slug)
        .await?
        .ok_or(ApiError::NotFound(CATEGORY_NOT_FOUND))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(CategoryListQuery),
    responses(
        (status = 200, description = "List categories.", body = [CategoryResponse]),
        (status = 404, description = "Parent category not found.", body = ErrorBody),
    ),
    tag = "categories"
)]
/// Lists every category, or only the direct subcategories of `parent_slug`.
pub async fn list_categories(
    Extension(pool): Extension<PgPool>,
    query: Result<Query<CategoryListQuery>, QueryRejection>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let Query(query) = query?;
    let parent_id = match query.parent_slug.as_deref() {
        Some(slug) => Some(resolve_category(&pool, slug).await?.id),
        None => None,
    };
    Ok(Json(storage::fetch_categories(&pool, parent_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{category_slug}",
    params(("category_slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category detail.", body = CategoryResponse),
        (status = 404, description = "Category not found.", body = ErrorBody),
    ),
    tag = "categories"
)]
pub async fn get_category(
    Path(category_slug): Path<String>,
    Extension(pool): Extension<PgPool>,
) -> Result<Json<CategoryResponse>, ApiError> {
    Ok(Json(resolve_category(&pool, &category_slug).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created.", body = CategoryResponse),
        (status = 400, description = "Name or slug already in use.", body = ErrorBody),
        (status = 401, description = "Missing, invalid or expired token.", body = ErrorBody),
        (status = 403, description = "Caller is not an administrator.", body = ErrorBody),
        (status = 404, description = "Parent category not found.", body = ErrorBody),
        (status = 422, description = "Invalid field.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "categories"
)]
/// Creates a category, optionally under `parent_slug`. The slug is derived from the name.
pub async fn create_category(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let principal = require_auth(&headers, &pool, &config).await?;
    Policy::Admin.check_role(&principal)?;
    let Json(payload) = payload?;

    let (name, slug) = validation::named_slug(&payload.name)?;
    let parent_id = match payload.parent_slug.as_deref() {
        Some(parent_slug) => Some(resolve_category(&pool, parent_slug).await?.id),
        None => None,
    };

    if storage::slug_taken(&pool, Slugged::Categories, &slug, None).await? {
        return Err(ApiError::bad_request(CATEGORY_EXISTS));
    }

    let category = storage::insert_category(&pool, &name, &slug, parent_id)
        .await
        .map_err(unique_or(CATEGORY_EXISTS))?;

    info!(category_id = category.id, slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/categories/{category_slug}",
    request_body = UpdateCategoryRequest,
    params(("category_slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category updated.", body = CategoryResponse),
        (status = 400, description = "No fields, name taken, or the move would create a loop.", body = ErrorBody),
        (status = 401, description = "Missing, invalid or expired token.", body = ErrorBody),
        (status = 403, description = "Caller is not an administrator.", body = ErrorBody),
        (status = 404, description = "Category or new parent not found.", body = ErrorBody),
        (status = 422, description = "Invalid field.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "categories"
)]
/// Renames a category (re-deriving its slug) and/or moves it under another parent.
/// The cycle check and the move run in one transaction holding the tree lock.
pub async fn update_category(
    Path(category_slug): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    payload: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let principal = require_auth(&headers, &pool, &config).await?;
    let category = resolve_category(&pool, &category_slug).await?;
    Policy::Admin.check_role(&principal)?;
    let Json(payload) = payload?;

    if payload.name.is_none() && payload.parent_slug.is_none() {
        return Err(ApiError::bad_request("No fields to update."));
    }

    let renamed = payload
        .name
        .as_deref()
        .map(validation::named_slug)
        .transpose()?;

    let mut tx = pool.begin().await?;

    let parent = match payload.parent_slug {
        None => None,
        Some(None) => Some(None),
        Some(Some(parent_slug)) => {
            storage::lock_category_tree(&mut *tx).await?;
            let parent = storage::find_category(&mut *tx, &parent_slug)
                .await?
                .ok_or(ApiError::NotFound(CATEGORY_NOT_FOUND))?;
            if storage::creates_cycle(&mut *tx, category.id, parent.id).await? {
                return Err(ApiError::bad_request(
                    "A category cannot be moved under itself or one of its subcategories.",
                ));
            }
            Some(Some(parent.id))
        }
    };

    if let Some((_, slug)) = &renamed {
        if storage::slug_taken(&mut *tx, Slugged::Categories, slug, Some(category.id)).await? {
            return Err(ApiError::bad_request(CATEGORY_EXISTS));
        }
    }

    let (name, slug) = renamed.unzip();
    let updated = storage::update_category(
        &mut *tx,
        category.id,
        name.as_deref(),
        slug.as_deref(),
        parent,
    )
    .await
    .map_err(unique_or(CATEGORY_EXISTS))?
    .ok_or(ApiError::NotFound(CATEGORY_NOT_FOUND))?;

    tx.commit().await?;

    info!(category_id = updated.id, slug = %updated.slug, "Category updated");
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{category_slug}",
    params(("category_slug" = String, Path, description = "Category slug")),
    responses(
        (status = 204, description = "Category deleted with its subcategories and their products."),
        (status = 401, description = "Missing, invalid or expired token.", body = ErrorBody),
        (status = 403, description = "Caller is not an administrator.", body = ErrorBody),
        (status = 404, description = "Category not found.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "categories"
)]
pub async fn delete_category(
    Path(category_slug): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<StatusCode, ApiError> {
    let principal = require_auth(&headers, &pool, &config).await?;
    let category = resolve_category(&pool, &category_slug).await?;
    Policy::Admin.check_role(&principal)?;

    if storage::delete_row(&pool, Table::Categories, category.id).await? == 0 {
        return Err(ApiError::NotFound(CATEGORY_NOT_FOUND));
    }

    info!(category_id = category.id, slug = %category.slug, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
