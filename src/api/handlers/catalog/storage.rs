//! Database access for categories, products and reviews.
//!
//! Writes return the same response shape as reads by wrapping the `INSERT` or
//! `UPDATE` in a CTE named like the table alias the read query expects, so
//! every product row carries its live rating.

use sqlx::{PgConnection, PgExecutor, PgPool, Row};
use tracing::instrument;

use super::types::{CategoryResponse, ProductResponse, ReviewResponse};
use crate::api::handlers::slug::is_slug;

/// Tables addressed by the shared delete helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Table {
    Categories,
    Products,
    Reviews,
}

impl Table {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Products => "products",
            Self::Reviews => "reviews",
        }
    }
}

/// Tables with a unique `slug` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Slugged {
    Categories,
    Products,
}

impl Slugged {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Products => "products",
        }
    }
}

/// `true` when another row of `table` already uses `slug`.
#[instrument(skip(executor))]
pub(super) async fn slug_taken<'e, E: PgExecutor<'e>>(
    executor: E,
    table: Slugged,
    slug: &str,
    exclude_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let query = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        table.as_str()
    );
    let row = sqlx::query(&query)
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(executor)
        .await?;
    row.try_get(0)
}

/// Deletes one row by id; dependants go through `ON DELETE CASCADE`.
#[instrument(skip(pool))]
pub(super) async fn delete_row(pool: &PgPool, table: Table, id: i64) -> Result<u64, sqlx::Error> {
    let query = format!("DELETE FROM {} WHERE id = $1", table.as_str());
    let result = sqlx::query(&query).bind(id).execute(pool).await?;
    Ok(result.rows_affected())
}

const CATEGORY_SELECT: &str = "SELECT c.id, c.name, c.slug, parent.slug AS parent_slug";
const CATEGORY_JOINS: &str = "LEFT JOIN categories parent ON parent.id = c.parent_id";

#[instrument(skip(pool))]
pub(super) async fn fetch_categories(
    pool: &PgPool,
    parent_id: Option<i64>,
) -> Result<Vec<CategoryResponse>, sqlx::Error> {
    let query = format!(
        "{CATEGORY_SELECT} FROM categories c {CATEGORY_JOINS}
         WHERE ($1::BIGINT IS NULL OR c.parent_id = $1)
         ORDER BY c.id"
    );
    sqlx::query_as::<_, CategoryResponse>(&query)
        .bind(parent_id)
        .fetch_all(pool)
        .await
}

/// Looks a category up by slug. Values that are not slug-shaped never match.
#[instrument(skip(executor))]
pub(super) async fn find_category<'e, E: PgExecutor<'e>>(
    executor: E,
    slug: &str,
) -> Result<Option<CategoryResponse>, sqlx::Error> {
    if !is_slug(slug) {
        return Ok(None);
    }
    let query = format!("{CATEGORY_SELECT} FROM categories c {CATEGORY_JOINS} WHERE c.slug = $1");
    sqlx::query_as::<_, CategoryResponse>(&query)
        .bind(slug)
        .fetch_optional(executor)
        .await
}

#[instrument(skip(pool))]
pub(super) async fn insert_category(
    pool: &PgPool,
    name: &str,
    slug: &str,
    parent_id: Option<i64>,
) -> Result<CategoryResponse, sqlx::Error> {
    let query = format!(
        "WITH c AS (
             INSERT INTO categories (name, slug, parent_id)
             VALUES ($1, $2, $3)
             RETURNING id, name, slug, parent_id
         )
         {CATEGORY_SELECT} FROM c {CATEGORY_JOINS}"
    );
    sqlx::query_as::<_, CategoryResponse>(&query)
        .bind(name)
        .bind(slug)
        .bind(parent_id)
        .fetch_one(pool)
        .await
}

/// Serializes tree moves until the surrounding transaction ends.
/// The mode conflicts with itself and with row writes, so a move always sees
/// every parent change committed before it.
#[instrument(skip(conn))]
pub(super) async fn lock_category_tree(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("LOCK TABLE categories IN SHARE ROW EXCLUSIVE MODE")
        .execute(conn)
        .await?;
    Ok(())
}

/// Updates a category. `parent` is `None` to keep the parent, `Some(None)` to
/// move the category to the root.
#[instrument(skip(executor))]
pub(super) async fn update_category<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
    name: Option<&str>,
    slug: Option<&str>,
    parent: Option<Option<i64>>,
) -> Result<Option<CategoryResponse>, sqlx::Error> {
    let query = format!(
        "WITH c AS (
             UPDATE categories
             SET name = COALESCE($2, name),
                 slug = COALESCE($3, slug),
                 parent_id = CASE WHEN $4 THEN $5 ELSE parent_id END,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING id, name, slug, parent_id
         )
         {CATEGORY_SELECT} FROM c {CATEGORY_JOINS}"
    );
    sqlx::query_as::<_, CategoryResponse>(&query)
        .bind(id)
        .bind(name)
        .bind(slug)
        .bind(parent.is_some())
        .bind(parent.flatten())
        .fetch_optional(executor)
        .await
}

/// `true` when making `parent_id` the parent of `category_id` would close a
/// loop, i.e. `category_id` is `parent_id` itself or one of its ancestors.
/// `UNION` drops repeated rows, so the walk ends even on a corrupted tree.
#[instrument(skip(executor))]
pub(super) async fn creates_cycle<'e, E: PgExecutor<'e>>(
    executor: E,
    category_id: i64,
    parent_id: i64,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r"
            WITH RECURSIVE ancestors AS (
                SELECT id, parent_id FROM categories WHERE id = $2
                UNION
                SELECT c.id, c.parent_id
                FROM categories c
                JOIN ancestors a ON c.id = a.parent_id
            )
            SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = $1)
        ",
    )
    .bind(category_id)
    .bind(parent_id)
    .fetch_one(executor)
    .await?;
    row.try_get(0)
}

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.name, p.slug, p.description, p.price, p.image_url, p.stock,
           c.slug AS category_slug, u.username AS user_username, p.user_id,
           COALESCE(
               (SELECT ROUND(AVG(r.grade)::numeric, 1) FROM reviews r WHERE r.product_id = p.id),
               0
           )::float8 AS rating";
const PRODUCT_JOINS: &str =
    "JOIN categories c ON c.id = p.category_id JOIN users u ON u.id = p.user_id";

/// Validated product fields for inserts.
#[derive(Debug)]
pub(super) struct NewProduct {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    pub stock: i32,
    pub category_id: i64,
    pub user_id: i64,
}

/// Validated product changes; `None` keeps the stored value.
#[derive(Debug, Default)]
pub(super) struct ProductChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub stock: Option<i32>,
}

/// Lists products, optionally restricted to a category and its direct
/// subcategories and to products in stock.
#[instrument(skip(pool))]
pub(super) async fn fetch_products(
    pool: &PgPool,
    category_id: Option<i64>,
    in_stock_only: bool,
) -> Result<Vec<ProductResponse>, sqlx::Error> {
    let query = format!(
        "{PRODUCT_SELECT} FROM products p {PRODUCT_JOINS}
         WHERE ($1::BIGINT IS NULL OR c.id = $1 OR c.parent_id = $1)
           AND (NOT $2 OR p.stock > 0)
         ORDER BY p.id"
    );
    sqlx::query_as::<_, ProductResponse>(&query)
        .bind(category_id)
        .bind(in_stock_only)
        .fetch_all(pool)
        .await
}

#[instrument(skip(pool))]
pub(super) async fn find_product(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<ProductResponse>, sqlx::Error> {
    if !is_slug(slug) {
        return Ok(None);
    }
    let query = format!("{PRODUCT_SELECT} FROM products p {PRODUCT_JOINS} WHERE p.slug = $1");
    sqlx::query_as::<_, ProductResponse>(&query)
        .bind(slug)
        .fetch_optional(pool)
        .await
}

#[instrument(skip(pool, product), fields(slug = %product.slug))]
pub(super) async fn insert_product(
    pool: &PgPool,
    product: NewProduct,
) -> Result<ProductResponse, sqlx::Error> {
    let query = format!(
        "WITH p AS (
             INSERT INTO products
                 (name, slug, description, price, image_url, stock, category_id, user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *
         )
         {PRODUCT_SELECT} FROM p {PRODUCT_JOINS}"
    );
    sqlx::query_as::<_, ProductResponse>(&query)
        .bind(product.name)
        .bind(product.slug)
        .bind(product.description)
        .bind(product.price)
        .bind(product.image_url)
        .bind(product.stock)
        .bind(product.category_id)
        .bind(product.user_id)
        .fetch_one(pool)
        .await
}

#[instrument(skip(pool, changes))]
pub(super) async fn update_product(
    pool: &PgPool,
    id: i64,
    changes: ProductChanges,
) -> Result<Option<ProductResponse>, sqlx::Error> {
    let query = format!(
        "WITH p AS (
             UPDATE products
             SET name = COALESCE($2, name),
                 slug = COALESCE($3, slug),
                 description = COALESCE($4, description),
                 price = COALESCE($5, price),
                 image_url = COALESCE($6, image_url),
                 stock = COALESCE($7, stock),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING *
         )
         {PRODUCT_SELECT} FROM p {PRODUCT_JOINS}"
    );
    sqlx::query_as::<_, ProductResponse>(&query)
        .bind(id)
        .bind(changes.name)
        .bind(changes.slug)
        .bind(changes.description)
        .bind(changes.price)
        .bind(changes.image_url)
        .bind(changes.stock)
        .fetch_optional(pool)
        .await
}

const REVIEW_SELECT: &str = r"
    SELECT r.id, r.grade, r.text, pr.slug AS product_slug, u.username AS user_username,
           r.product_id, r.user_id";
const REVIEW_JOINS: &str =
    "JOIN products pr ON pr.id = r.product_id JOIN users u ON u.id = r.user_id";

#[instrument(skip(pool))]
pub(super) async fn fetch_reviews(
    pool: &PgPool,
    product_id: Option<i64>,
) -> Result<Vec<ReviewResponse>, sqlx::Error> {
    let query = format!(
        "{REVIEW_SELECT} FROM reviews r {REVIEW_JOINS}
         WHERE ($1::BIGINT IS NULL OR r.product_id = $1)
         ORDER BY r.id"
    );
    sqlx::query_as::<_, ReviewResponse>(&query)
        .bind(product_id)
        .fetch_all(pool)
        .await
}

#[instrument(skip(pool))]
pub(super) async fn find_review(
    pool: &PgPool,
    id: i64,
) -> Result<Option<ReviewResponse>, sqlx::Error> {
    let query = format!("{REVIEW_SELECT} FROM reviews r {REVIEW_JOINS} WHERE r.id = $1");
    sqlx::query_as::<_, ReviewResponse>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

#[instrument(skip(pool))]
pub(super) async fn review_exists(
    pool: &PgPool,
    user_id: i64,
    product_id: i64,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        "SELECT EXISTS (SELECT 1 FROM reviews WHERE user_id = $1 AND product_id = $2)",
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_one(pool)
    .await?;
    row.try_get(0)
}

#[instrument(skip(pool, text))]
pub(super) async fn insert_review(
    pool: &PgPool,
    product_id: i64,
    user_id: i64,
    grade: i16,
    text: Option<String>,
) -> Result<ReviewResponse, sqlx::Error> {
    let query = format!(
        "WITH r AS (
             INSERT INTO reviews (grade, text, product_id, user_id)
             VALUES ($1, $2, $3, $4)
             RETURNING *
         )
         {REVIEW_SELECT} FROM r {REVIEW_JOINS}"
    );
    sqlx::query_as::<_, ReviewResponse>(&query)
        .bind(grade)
        .bind(text)
        .bind(product_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
}

#[instrument(skip(pool, text))]
pub(super) async fn update_review(
    pool: &PgPool,
    id: i64,
    grade: Option<i16>,
    text: Option<String>,
) -> Result<Option<ReviewResponse>, sqlx::Error> {
    let query = format!(
        "WITH r AS (
             UPDATE reviews
             SET grade = COALESCE($2, grade),
                 text = COALESCE($3, text),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING *
         )
         {REVIEW_SELECT} FROM r {REVIEW_JOINS}"
    );
    sqlx::query_as::<_, ReviewResponse>(&query)
        .bind(id)
        .bind(grade)
        .bind(text)
        .fetch_optional(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names() {
        assert_eq!(Table::Categories.as_str(), "categories");
        assert_eq!(Table::Products.as_str(), "products");
        assert_eq!(Table::Reviews.as_str(), "reviews");
        assert_eq!(Slugged::Categories.as_str(), "categories");
        assert_eq!(Slugged::Products.as_str(), "products");
    }

    #[test]
    fn product_reads_carry_rating() {
        assert!(PRODUCT_SELECT.contains("AVG(r.grade)"));
        assert!(PRODUCT_SELECT.contains("AS rating"));
    }
}
