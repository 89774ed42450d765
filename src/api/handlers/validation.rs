//! Field checks applied to request bodies after authorization succeeded.
//!
//! Every failure is a `422` carrying the name of the offending field.

use super::{
    error::ApiError,
    slug::{slugify, SLUG_MAX},
};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

pub const NAME_MAX: usize = 64;
pub const IMAGE_URL_MAX: usize = 128;
pub const EMAIL_MAX: usize = 64;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 64;
pub const GRADE_MIN: i16 = 1;
pub const GRADE_MAX: i16 = 10;

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());
static USERNAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]{1,64}$").ok());

/// Lightweight email sanity check used before persisting data.
pub fn valid_email(email: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

pub fn valid_username(username: &str) -> bool {
    USERNAME_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(username))
}

/// Trims `value` and checks it holds `1..=max` characters.
pub fn display_name(field: &str, value: &str, max: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    let length = trimmed.chars().count();
    if length == 0 || length > max {
        return Err(ApiError::unprocessable(format!(
            "{field}: must be between 1 and {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validates a category or product name and derives its slug.
pub fn named_slug(value: &str) -> Result<(String, String), ApiError> {
    let name = display_name("name", value, NAME_MAX)?;
    let slug = slugify(&name, SLUG_MAX).ok_or_else(|| {
        ApiError::unprocessable("name: must contain at least one latin letter or digit")
    })?;
    Ok((name, slug))
}

pub fn price(value: f64) -> Result<f64, ApiError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ApiError::unprocessable("price: must be greater than 0"))
    }
}

pub fn stock(value: i32) -> Result<i32, ApiError> {
    if value >= 0 {
        Ok(value)
    } else {
        Err(ApiError::unprocessable("stock: must be greater than or equal to 0"))
    }
}

pub fn image_url(value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.len() > IMAGE_URL_MAX {
        return Err(ApiError::unprocessable(format!(
            "image_url: must be at most {IMAGE_URL_MAX} characters"
        )));
    }
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(value.to_string())
        }
        _ => Err(ApiError::unprocessable("image_url: must be an http(s) URL")),
    }
}

pub fn grade(value: i16) -> Result<i16, ApiError> {
    if (GRADE_MIN..=GRADE_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(ApiError::unprocessable(format!(
            "grade: must be between {GRADE_MIN} and {GRADE_MAX}"
        )))
    }
}

pub fn username(value: &str) -> Result<String, ApiError> {
    if valid_username(value) {
        Ok(value.to_string())
    } else {
        Err(ApiError::unprocessable(
            "username: 1 to 64 latin letters, digits or the symbols _ . -",
        ))
    }
}

/// Validates and lowercases an email address.
pub fn email(value: &str) -> Result<String, ApiError> {
    let email = value.trim().to_lowercase();
    if email.len() > EMAIL_MAX || !valid_email(&email) {
        return Err(ApiError::unprocessable("email: invalid email address"));
    }
    Ok(email)
}

pub fn password(value: &str) -> Result<(), ApiError> {
    let length = value.chars().count();
    if (PASSWORD_MIN..=PASSWORD_MAX).contains(&length) {
        Ok(())
    } else {
        Err(ApiError::unprocessable(format!(
            "password: must be between {PASSWORD_MIN} and {PASSWORD_MAX} characters"
        )))
    }
}

/// Empty strings in optional text fields are stored as `NULL`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn patterns_compile() {
        assert!(EMAIL_PATTERN.is_some());
        assert!(USERNAME_PATTERN.is_some());
    }

    #[test]
    fn valid_email_accepts_simple() {
        assert!(valid_email("user@example.com"));
    }

    #[test]
    fn valid_email_rejects_missing_at() {
        assert!(!valid_email("user.example.com"));
    }

    #[test]
    fn email_is_lowercased_and_bounded() {
        assert_eq!(email(" Buyer@Example.COM ").ok().as_deref(), Some("buyer@example.com"));
        let long = format!("{}@example.com", "a".repeat(60));
        assert!(email(&long).is_err());
    }

    #[test]
    fn username_pattern() {
        assert!(valid_username("jane.doe_42"));
        assert!(!valid_username("jane doe"));
        assert!(!valid_username(""));
        assert!(!valid_username(&"x".repeat(65)));
    }

    #[test]
    fn names_produce_slugs() {
        let (name, slug) = named_slug("  Gaming Laptops ").unwrap_or_default();
        assert_eq!(name, "Gaming Laptops");
        assert_eq!(slug, "gaming-laptops");

        let err = named_slug("   ").err().map(|err| err.status());
        assert_eq!(err, Some(StatusCode::UNPROCESSABLE_ENTITY));
        assert!(named_slug(&"n".repeat(NAME_MAX + 1)).is_err());
        assert!(named_slug("***").is_err());
    }

    #[test]
    fn price_and_stock_bounds() {
        assert!(price(0.01).is_ok());
        assert!(price(0.0).is_err());
        assert!(price(-3.0).is_err());
        assert!(price(f64::NAN).is_err());
        assert!(stock(0).is_ok());
        assert!(stock(-1).is_err());
    }

    #[test]
    fn image_url_requires_http() {
        assert!(image_url("https://cdn.example.com/p/1.png").is_ok());
        assert!(image_url("ftp://cdn.example.com/p/1.png").is_err());
        assert!(image_url("not a url").is_err());
        let long = format!("https://example.com/{}", "a".repeat(IMAGE_URL_MAX));
        assert!(image_url(&long).is_err());
    }

    #[test]
    fn grade_range() {
        assert!(grade(1).is_ok());
        assert!(grade(10).is_ok());
        assert!(grade(0).is_err());
        assert!(grade(11).is_err());
    }

    #[test]
    fn password_length() {
        assert!(password("12345678").is_ok());
        assert!(password("1234567").is_err());
        assert!(password(&"p".repeat(PASSWORD_MAX + 1)).is_err());
    }

    #[test]
    fn optional_text_drops_blank() {
        assert_eq!(optional_text(Some("  ".to_string())), None);
        assert_eq!(optional_text(Some(" ok ".to_string())).as_deref(), Some("ok"));
        assert_eq!(optional_text(None), None);
    }
}
