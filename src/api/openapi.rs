//! `OpenAPI` document served at `/api-docs/openapi.json`.
//!
//! Add new endpoints to `paths(...)` so they show up in Swagger UI.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::api::handlers::{auth, catalog, error::ErrorBody, health, users};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::token::issue_token,
        users::registration::register,
        users::me::get_me,
        users::me::update_me,
        users::me::delete_me,
        catalog::categories::list_categories,
        catalog::categories::get_category,
        catalog::categories::create_category,
        catalog::categories::update_category,
        catalog::categories::delete_category,
        catalog::products::list_products,
        catalog::products::get_product,
        catalog::products::create_product,
        catalog::products::update_product,
        catalog::products::delete_product,
        catalog::reviews::list_reviews,
        catalog::reviews::list_product_reviews,
        catalog::reviews::get_review,
        catalog::reviews::create_review,
        catalog::reviews::update_review,
        catalog::reviews::delete_review,
    ),
    components(schemas(
        ErrorBody,
        health::Health,
        auth::role::Role,
        auth::token::TokenRequest,
        auth::token::TokenResponse,
        users::types::RegisterRequest,
        users::types::UpdateUserRequest,
        users::types::UserResponse,
        catalog::types::CategoryResponse,
        catalog::types::CreateCategoryRequest,
        catalog::types::UpdateCategoryRequest,
        catalog::types::ProductResponse,
        catalog::types::CreateProductRequest,
        catalog::types::UpdateProductRequest,
        catalog::types::ReviewResponse,
        catalog::types::CreateReviewRequest,
        catalog::types::UpdateReviewRequest,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Service and database health"),
        (name = "auth", description = "Access tokens"),
        (name = "users", description = "Registration and the caller's account"),
        (name = "categories", description = "Category tree"),
        (name = "products", description = "Product catalog"),
        (name = "reviews", description = "Product reviews"),
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_comes_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn documents_every_route() {
        let spec = openapi();
        for path in [
            "/health",
            "/api/v1/auth/token",
            "/api/v1/users/registration",
            "/api/v1/users/me",
            "/api/v1/categories",
            "/api/v1/categories/{category_slug}",
            "/api/v1/products",
            "/api/v1/products/{product_slug}",
            "/api/v1/products/{product_slug}/reviews",
            "/api/v1/products/{product_slug}/reviews/{review_id}",
            "/api/v1/reviews",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn bearer_scheme_registered() {
        let spec = openapi();
        let has_bearer = spec
            .components
            .as_ref()
            .is_some_and(|components| components.security_schemes.contains_key("bearer"));
        assert!(has_bearer);
    }
}
