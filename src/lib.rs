//! # Marketplace (catalog, reviews and accounts API)
//!
//! `marketplace` is a REST backend for a small storefront: a category tree,
//! products listed by suppliers, customer reviews and role-tagged user accounts.
//!
//! ## Catalog
//!
//! - **Categories** form a tree through an optional parent. Listing by parent
//!   slug returns only direct subcategories.
//! - **Products** belong to a category and to the supplier who listed them.
//!   Their `rating` is the average review grade, computed on every read and
//!   never stored.
//! - **Reviews** are unique per user and product, and a supplier may not review
//!   a product they own.
//!
//! Slugs are derived from display names and normalized to lowercase, URL-safe
//! strings (`[a-z0-9-]`).
//!
//! ## Authorization
//!
//! Callers authenticate with a bearer JWT issued by `POST /api/v1/auth/token`.
//! Every accounts row carries one role (`customer`, `supplier`, `admin`):
//!
//! - categories are managed by admins only,
//! - products are created by suppliers or admins and changed by their owner or an admin,
//! - reviews are created by any authenticated user and changed by their author or an admin.
//!
//! Failures resolve in a fixed order: `401` (no caller), `404` (missing target),
//! `403` (role or ownership), then payload errors (`422`/`400`).

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
