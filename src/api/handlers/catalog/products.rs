//! Product handlers.

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
    storage::{self, NewProduct, ProductChanges, Slugged, Table},
    types::{CreateProductRequest, ProductListQuery, ProductResponse, UpdateProductRequest},
    CATEGORY_NOT_FOUND, PRODUCT_NOT_FOUND,
};
use crate::api::handlers::{
    auth::{permission::Policy, principal::require_auth, AuthConfig},
    error::{unique_or, ApiError, ErrorBody},
    validation,
};

const PRODUCT_EXISTS: &str = "A product with this name already exists.";

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "List products.", body = [ProductResponse]),
        (status = 404, description = "Category not found.", body = ErrorBody),
    ),
    tag = "products"
)]
/// Lists products. `category_slug` also includes the category's direct subcategories,
/// and `is_active=true` drops products that are out of stock.
pub async fn list_products(
    Extension(pool): Extension<PgPool>,
    query: Result<Query<ProductListQuery>, QueryRejection>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let Query(query) = query?;
    let category_id = match query.category_slug.as_deref() {
        Some(slug) => Some(
            storage::find_category(&pool, slug)
                .await?
                .ok_or(ApiError::NotFound(CATEGORY_NOT_FOUND))?
                .id,
        ),
        None => None,
    };
    let products =
        storage::fetch_products(&pool, category_id, query.is_active.unwrap_or(false)).await?;
    Ok(Json(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{product_slug}",
    params(("product_slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product detail with its current rating.", body = ProductResponse),
        (status = 404, description = "Product not found.", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn get_product(
    Path(product_slug): Path<String>,
    Extension(pool): Extension<PgPool>,
) -> Result<Json<ProductResponse>, ApiError> {
    storage::find_product(&pool, &product_slug)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(PRODUCT_NOT_FOUND))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created and owned by the caller.", body = ProductResponse),
        (status = 400, description = "Name or slug already in use.", body = ErrorBody),
        (status = 401, description = "Missing, invalid or expired token.", body = ErrorBody),
        (status = 403, description = "Caller is neither a supplier nor an administrator.", body = ErrorBody),
        (status = 404, description = "Category not found.", body = ErrorBody),
        (status = 422, description = "Invalid field.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn create_product(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let principal = require_auth(&headers, &pool, &config).await?;
    Policy::SupplierOrAdmin.check_role(&principal)?;
    let Json(payload) = payload?;

    let (name, slug) = validation::named_slug(&payload.name)?;
    let price = validation::price(payload.price)?;
    let stock = validation::stock(payload.stock)?;
    let image_url = validation::optional_text(payload.image_url)
        .map(|url| validation::image_url(&url))
        .transpose()?;

    let category = storage::find_category(&pool, &payload.category_slug)
        .await?
        .ok_or(ApiError::NotFound(CATEGORY_NOT_FOUND))?;

    if storage::slug_taken(&pool, Slugged::Products, &slug, None).await? {
        return Err(ApiError::bad_request(PRODUCT_EXISTS));
    }

    let product = storage::insert_product(
        &pool,
        NewProduct {
            name,
            slug,
            description: validation::optional_text(payload.description),
            price,
            image_url,
            stock,
            category_id: category.id,
            user_id: principal.user_id,
        },
    )
    .await
    .map_err(unique_or(PRODUCT_EXISTS))?;

    info!(product_id = product.id, slug = %product.slug, owner = %principal.username, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/products/{product_slug}",
    request_body = UpdateProductRequest,
    params(("product_slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product updated.", body = ProductResponse),
        (status = 400, description = "No fields, or name already in use.", body = ErrorBody),
        (status = 401, description = "Missing, invalid or expired token.", body = ErrorBody),
        (status = 403, description = "Caller is neither the owner nor an administrator.", body = ErrorBody),
        (status = 404, description = "Product not found.", body = ErrorBody),
        (status = 422, description = "Invalid field.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
/// Partially updates a product; renaming re-derives the slug.
pub async fn update_product(
    Path(product_slug): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    let principal = require_auth(&headers, &pool, &config).await?;
    let target = storage::find_product(&pool, &product_slug).await?;
    let product = Policy::SupplierOrAdmin.authorize(&principal, target, PRODUCT_NOT_FOUND)?;
    let Json(payload) = payload?;

    if payload.is_empty() {
        return Err(ApiError::bad_request("No fields to update."));
    }

    let (name, slug) = payload
        .name
        .as_deref()
        .map(validation::named_slug)
        .transpose()?
        .unzip();
    let changes = ProductChanges {
        name,
        slug,
        description: validation::optional_text(payload.description),
        price: payload.price.map(validation::price).transpose()?,
        image_url: validation::optional_text(payload.image_url)
            .map(|url| validation::image_url(&url))
            .transpose()?,
        stock: payload.stock.map(validation::stock).transpose()?,
    };

    if let Some(slug) = changes.slug.as_deref() {
        if storage::slug_taken(&pool, Slugged::Products, slug, Some(product.id)).await? {
            return Err(ApiError::bad_request(PRODUCT_EXISTS));
        }
    }

    let updated = storage::update_product(&pool, product.id, changes)
        .await
        .map_err(unique_or(PRODUCT_EXISTS))?
        .ok_or(ApiError::NotFound(PRODUCT_NOT_FOUND))?;

    info!(product_id = updated.id, slug = %updated.slug, "Product updated");
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{product_slug}",
    params(("product_slug" = String, Path, description = "Product slug")),
    responses(
        (status = 204, description = "Product deleted with its reviews."),
        (status = 401, description = "Missing, invalid or expired token.", body = ErrorBody),
        (status = 403, description = "Caller is neither the owner nor an administrator.", body = ErrorBody),
        (status = 404, description = "Product not found.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn delete_product(
    Path(product_slug): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<StatusCode, ApiError> {
    let principal = require_auth(&headers, &pool, &config).await?;
    let target = storage::find_product(&pool, &product_slug).await?;
    let product = Policy::SupplierOrAdmin.authorize(&principal, target, PRODUCT_NOT_FOUND)?;

    if storage::delete_row(&pool, Table::Products, product.id).await? == 0 {
        return Err(ApiError::NotFound(PRODUCT_NOT_FOUND));
    }

    info!(product_id = product.id, slug = %product.slug, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
