//! Integration-style handler tests for accounts and access tokens.

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
        Request, StatusCode,
    },
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::api::handlers::{
    auth::{
        jwt::{sign_hs256, AccessTokenClaims},
        now_unix_seconds,
        role::Role,
    },
    test_support::{TestDb, TEST_PASSWORD},
};

fn registration(username: &str, email: &str) -> Value {
    json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "username": username,
        "email": email,
        "password": "analytical-engine",
    })
}

/// Posts the login form and returns the status with the decoded body.
async fn login(db: &TestDb, username: &str, password: &str) -> Result<(StatusCode, Value)> {
    let form = format!("username={username}&password={password}");
    let response = db
        .app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/token")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))?,
        )
        .await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
/// Registration defaults to the customer role and rejects taken identities.
async fn registration_validates_and_rejects_duplicates() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let (status, body) = db
        .send(
            "POST",
            "/api/v1/users/registration",
            None,
            Some(registration("ada", "Ada@Example.com")),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["username"], "ada");
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["role"], "customer");
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());

    let (status, body) = db
        .send(
            "POST",
            "/api/v1/users/registration",
            None,
            Some(registration("ada", "other@example.com")),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "A user with this username already exists.");

    let (status, body) = db
        .send(
            "POST",
            "/api/v1/users/registration",
            None,
            Some(registration("grace", "ADA@example.com")),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "A user with this email already exists.");

    let (status, _) = db
        .send(
            "POST",
            "/api/v1/users/registration",
            None,
            Some(registration("grace", "not-an-email")),
        )
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let mut supplier = registration("grace", "grace@example.com");
    supplier["role"] = json!("supplier");
    let (status, body) = db
        .send("POST", "/api/v1/users/registration", None, Some(supplier))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "supplier");

    let mut unknown_role = registration("linus", "linus@example.com");
    unknown_role["role"] = json!("superuser");
    let (status, _) = db
        .send("POST", "/api/v1/users/registration", None, Some(unknown_role))
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
/// The form login issues a bearer token that authenticates `/users/me`.
async fn login_issues_usable_token() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    db.insert_user("ada", Role::Supplier).await?;

    let (status, body) = login(&db, "ada", "wrong-password").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Incorrect username or password");

    let (status, _) = login(&db, "nobody", TEST_PASSWORD).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = login(&db, "ada", TEST_PASSWORD).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap_or_default().to_string();
    assert_eq!(token.split('.').count(), 3);

    let (status, me) = db.send("GET", "/api/v1/users/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "ada");
    assert_eq!(me["role"], "supplier");
    Ok(())
}

#[tokio::test]
/// Missing, malformed, forged, and expired tokens are all `401` with a bearer challenge.
async fn bad_tokens_are_unauthorized() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    db.insert_user("ada", Role::Customer).await?;

    let response = db
        .app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/me")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok()),
        Some("Bearer")
    );

    let response = db
        .app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/me")
                .header(AUTHORIZATION, "Basic YWRhOnNlY3JldA==")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = db
        .send("GET", "/api/v1/users/me", Some("not.a.token"), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid token");

    let iat = now_unix_seconds() - 7200;
    let claims = AccessTokenClaims {
        sub: "ada".to_string(),
        role: "customer".to_string(),
        iat,
        exp: iat + 60,
    };
    let expired = sign_hs256(db.auth.signing_key(), &claims)?;
    let (status, body) = db.send("GET", "/api/v1/users/me", Some(&expired), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Token has expired");

    let forged = sign_hs256(b"some-other-secret", &claims)?;
    let (status, body) = db.send("GET", "/api/v1/users/me", Some(&forged), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid token");

    let ghost = db.token_for("ghost", Role::Admin)?;
    let (status, _) = db.send("GET", "/api/v1/users/me", Some(&ghost), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
/// The signed-in account can edit itself, the role is not editable, and deletion revokes access.
async fn me_update_and_delete() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let (_, token) = db.user_with_token("ada", Role::Customer).await?;
    db.insert_user("grace", Role::Customer).await?;

    let (status, body) = db
        .send("PATCH", "/api/v1/users/me", Some(&token), Some(json!({})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No fields to update.");

    let (status, _) = db
        .send(
            "PATCH",
            "/api/v1/users/me",
            None,
            Some(json!({ "email": "broken" })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = db
        .send(
            "PATCH",
            "/api/v1/users/me",
            Some(&token),
            Some(json!({ "email": "broken" })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = db
        .send(
            "PATCH",
            "/api/v1/users/me",
            Some(&token),
            Some(json!({ "email": "grace@example.com" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "A user with this email already exists.");

    let (status, body) = db
        .send(
            "PATCH",
            "/api/v1/users/me",
            Some(&token),
            Some(json!({ "first_name": "Augusta", "email": "ada@example.com", "role": "admin" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["first_name"], "Augusta");
    assert_eq!(body["role"], "customer");

    let (status, _) = db
        .send(
            "PATCH",
            "/api/v1/users/me",
            Some(&token),
            Some(json!({ "password": "a-much-longer-password" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = login(&db, "ada", TEST_PASSWORD).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&db, "ada", "a-much-longer-password").await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = db.send("DELETE", "/api/v1/users/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = db.send("GET", "/api/v1/users/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
/// Deleting an account removes the products it listed.
async fn deleting_supplier_removes_products() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let (_, admin) = db.user_with_token("admin", Role::Admin).await?;
    let (_, supplier) = db.user_with_token("supplier", Role::Supplier).await?;

    let (status, _) = db
        .send(
            "POST",
            "/api/v1/categories",
            Some(&admin),
            Some(json!({ "name": "Tools" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = db
        .send(
            "POST",
            "/api/v1/products",
            Some(&supplier),
            Some(json!({ "name": "Hammer", "price": 12.5, "stock": 3, "category_slug": "tools" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = db
        .send("DELETE", "/api/v1/users/me", Some(&supplier), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = db.send("GET", "/api/v1/products/hammer", None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = db.send("GET", "/api/v1/categories/tools", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
