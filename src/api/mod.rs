use crate::api::handlers::{auth, catalog, health, users};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::{HeaderName, HeaderValue},
    routing::{get, post},
    Extension, Router, ServiceExt,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::{Layer, ServiceBuilder};
use tower_http::{
    normalize_path::{NormalizePath, NormalizePathLayer}, request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
pub mod openapi;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// Connection settings for the Postgres pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    dsn: String,
    max_connections: u32,
    run_migrations: bool,
}

impl DatabaseConfig {
    #[must_use]
    pub fn new(dsn: String) -> Self {
        Self {
            dsn,
            max_connections: 5,
            run_migrations: true,
        }
    }

    #[must_use]
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    #[must_use]
    pub fn with_migrations(mut self, run_migrations: bool) -> Self {
        self.run_migrations = run_migrations;
        self
    }

    #[must_use]
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    #[must_use]
    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    #[must_use]
    pub fn run_migrations(&self) -> bool {
        self.run_migrations
    }
}

/// Applies `sql/schema.sql`. Every statement in it is idempotent.
///
/// # Errors
/// Returns an error if any schema statement fails.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .context("Failed to apply database schema")?;
    Ok(())
}

/// Build the application router: `/health`, the documented `/api/v1` surface,
/// and Swagger UI backed by the generated `OpenAPI` document.
///
/// Paths are registered without trailing slashes; `app` wraps the router in
/// `NormalizePathLayer` so `/api/v1/products/` resolves to the same handler.
#[must_use]
pub fn router(pool: PgPool, auth_config: Arc<auth::AuthConfig>) -> Router {
    let v1 = Router::new()
        .route(
            "/categories",
            get(catalog::categories::list_categories).post(catalog::categories::create_category),
        )
        .route(
            "/categories/:category_slug",
            get(catalog::categories::get_category)
                .patch(catalog::categories::update_category)
                .delete(catalog::categories::delete_category),
        )
        .route(
            "/products",
            get(catalog::products::list_products).post(catalog::products::create_product),
        )
        .route(
            "/products/:product_slug",
            get(catalog::products::get_product)
                .patch(catalog::products::update_product)
                .delete(catalog::products::delete_product),
        )
        .route(
            "/products/:product_slug/reviews",
            get(catalog::reviews::list_product_reviews).post(catalog::reviews::create_review),
        )
        .route(
            "/products/:product_slug/reviews/:review_id",
            get(catalog::reviews::get_review)
                .patch(catalog::reviews::update_review)
                .delete(catalog::reviews::delete_review),
        )
        .route("/reviews", get(catalog::reviews::list_reviews))
        .route("/auth/token", post(auth::token::issue_token))
        .route("/users/registration", post(users::registration::register))
        .route(
            "/users/me",
            get(users::me::get_me)
                .patch(users::me::update_me)
                .delete(users::me::delete_me),
        );

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", v1)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::openapi()))
        .layer(Extension(auth_config))
        .layer(Extension(pool))
}

/// The served application: routes plus request-id, tracing and path
/// normalization layers.
#[must_use]
pub fn app(pool: PgPool, auth_config: Arc<auth::AuthConfig>) -> NormalizePath<Router> {
    let app = router(pool, auth_config).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    // Path normalization has to run before routing, so it wraps the router.
    NormalizePathLayer::trim_trailing_slash().layer(app)
}

/// router
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be applied,
/// or the server fails to start
pub async fn new(port: u16, db_config: DatabaseConfig, auth_config: auth::AuthConfig) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(db_config.max_connections())
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(db_config.dsn())
        .await
        .context("Failed to connect to database")?;

    if db_config.run_migrations() {
        migrate(&pool).await?;
        info!("Database schema is up to date");
    }

    let app = app(pool, Arc::new(auth_config));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    info!("Gracefully shutdown");
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let method = request.method().as_str();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or(path, MatchedPath::as_str);
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", method, path, route, request_id)
}
