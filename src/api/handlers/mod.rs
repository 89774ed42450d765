//! Route handlers for the marketplace API.
//!
//! Every mutating handler follows the same order: authenticate the caller,
//! resolve the target by its path parameters, check the caller's permission on
//! it, and only then validate the request body. Storage lives next to the
//! handlers of each area; errors funnel through [`error::ApiError`].

pub mod auth;
pub mod catalog;
pub mod error;
pub mod health;
pub mod slug;
pub mod users;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::ApiError;
