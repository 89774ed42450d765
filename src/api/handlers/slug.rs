//! Slug derivation for categories and products.
//!
//! Slugs are lowercase `a-z0-9-` with collapsed separators. Only ASCII
//! letters and digits survive, so names written entirely in other scripts
//! produce no slug and are rejected by the caller.

/// Longest slug stored in the `slug` columns.
pub const SLUG_MAX: usize = 64;

/// Derives a URL-safe slug from a display name.
/// Returns `None` when nothing slug-worthy remains or the result exceeds `max`.
#[must_use]
pub fn slugify(input: &str, max: usize) -> Option<String> {
    let mut slug = String::with_capacity(input.len());
    let mut prev_dash = false;
    for ch in input.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    let normalized = slug.trim_matches('-');
    if normalized.is_empty() || normalized.len() > max {
        return None;
    }
    Some(normalized.to_string())
}

/// `true` when `value` already has slug shape, used for path and query inputs.
#[must_use]
pub fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= SLUG_MAX
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
