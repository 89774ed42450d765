//! Category, product and review endpoints.
//!
//! Categories form a tree addressed by slug and are managed by administrators.
//! Products belong to a category and to the supplier who listed them; their
//! rating is the mean of their review grades, computed on every read. Reviews
//! hang off a product, one per account, and a supplier cannot review their
//! own listing.
//!
//! The handler modules parse inputs and map the high-level flow, while
//! `storage` owns database queries and response shaping.

pub mod categories;
pub mod products;
pub mod reviews;
mod storage;
pub mod types;

const CATEGORY_NOT_FOUND: &str = "Category not found.";
const PRODUCT_NOT_FOUND: &str = "Product not found.";
const REVIEW_NOT_FOUND: &str = "Review not found.";
