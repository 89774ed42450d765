//! Account endpoints: self-registration and the caller's own profile.

pub mod me;
pub mod registration;
pub(crate) mod storage;
pub mod types;

#[cfg(test)]
mod tests;
