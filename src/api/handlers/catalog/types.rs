//! Request/response types for the catalog APIs.
//!
//! These payloads are shared between handlers and `OpenAPI` generation.
//! Ownership columns are loaded for permission checks but never serialized.

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::api::handlers::auth::permission::Owned;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub parent_slug: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    /// Moves the category under another one; `null` moves it to the root.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub parent_slug: Option<Option<String>>,
}

/// Keeps an explicit `null` apart from an absent field: absent stays `None`
/// through `#[serde(default)]`, `null` becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CategoryListQuery {
    /// Only list direct subcategories of this category.
    pub parent_slug: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_slug: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    pub stock: i32,
    pub category_slug: String,
}

/// Partial product update; omitted fields keep their value.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub stock: Option<i32>,
}

impl UpdateProductRequest {
    pub(super) fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
            && self.stock.is_none()
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductListQuery {
    /// Products of this category and of its direct subcategories.
    pub category_slug: Option<String>,
    /// `true` keeps only products that are in stock.
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    pub stock: i32,
    pub category_slug: String,
    pub user_username: String,
    /// Mean review grade rounded to one decimal, `0` without reviews.
    pub rating: f64,
    #[serde(skip)]
    pub(crate) user_id: i64,
}

impl Owned for ProductResponse {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    pub grade: i16,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReviewRequest {
    pub grade: Option<i16>,
    pub text: Option<String>,
}

impl UpdateReviewRequest {
    pub(super) fn is_empty(&self) -> bool {
        self.grade.is_none() && self.text.is_none()
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReviewListQuery {
    /// Only reviews of this product.
    pub product_slug: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct ReviewResponse {
    pub id: i64,
    pub grade: i16,
    pub text: Option<String>,
    pub product_slug: String,
    pub user_username: String,
    #[serde(skip)]
    pub(crate) product_id: i64,
    #[serde(skip)]
    pub(crate) user_id: i64,
}

impl Owned for ReviewResponse {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}
