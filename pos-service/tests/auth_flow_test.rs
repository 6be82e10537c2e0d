//! HTTP-level authentication flow tests: registration, OTP login,
//! token refresh, and access control on protected routes.

mod common;

use common::TestApp;
use pos_service::models::{OtpPurpose, RequestMeta};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_health_check() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_register_then_confirm_email() {
    let app = TestApp::spawn().await;
    let tenant = app.seed_tenant("register-a").await;
    let email = "new-user@register.test";

    // Act: register
    let response = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({
            "email": email,
            "display_name": "New User",
            "tenant_slug": tenant.tenant_slug,
        }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["email"], email);
    assert_eq!(body["email_verified"], false);

    // Registration issued a code; the HTTP surface never exposes the
    // plaintext, so issue a fresh one through the service for the test.
    let code = app
        .state
        .otp
        .generate(email, OtpPurpose::Register, RequestMeta::default())
        .await
        .expect("Failed to generate code");

    let response = app
        .client
        .post(app.url("/auth/otp/verify"))
        .json(&json!({
            "email": email,
            "code": code,
            "purpose": "register",
        }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["verified"], true);

    let user = app
        .state
        .db
        .find_user_by_email(email)
        .await
        .expect("Lookup errored")
        .expect("User missing");
    assert!(user.email_verified);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::spawn().await;
    let email = "dup@register.test";
    app.seed_user(None, email).await;

    let response = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({
            "email": email,
            "display_name": "Dup",
        }))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_otp_login_returns_token_pair() {
    let app = TestApp::spawn().await;
    let tenant = app.seed_tenant("login-a").await;
    let (user, _) = app
        .seed_user(Some(tenant.tenant_id), "login@flow.test")
        .await;

    let response = app
        .client
        .post(app.url("/auth/otp/request"))
        .json(&json!({ "email": user.email, "purpose": "login" }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);

    // The most recent code wins; issue one more so the test knows the
    // plaintext, then verify over HTTP.
    let code = app
        .state
        .otp
        .generate(&user.email, OtpPurpose::Login, RequestMeta::default())
        .await
        .expect("Failed to generate code");

    let response = app
        .client
        .post(app.url("/auth/otp/verify"))
        .json(&json!({
            "email": user.email,
            "code": code,
            "purpose": "login",
        }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["user_id"], user.user_id.to_string());
    assert_eq!(body["token_type"], "Bearer");
    let access_token = body["access_token"].as_str().expect("Missing access token");

    // The token works on a protected route.
    let response = app
        .client
        .get(app.url("/users/me"))
        .bearer_auth(access_token)
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let me: Value = response.json().await.expect("Invalid JSON");
    assert_eq!(me["email"], user.email);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_wrong_code_is_unauthorized() {
    let app = TestApp::spawn().await;
    let (user, _) = app.seed_user(None, "wrong-code@flow.test").await;

    let code = app
        .state
        .otp
        .generate(&user.email, OtpPurpose::Login, RequestMeta::default())
        .await
        .expect("Failed to generate code");
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let response = app
        .client
        .post(app.url("/auth/otp/verify"))
        .json(&json!({
            "email": user.email,
            "code": wrong,
            "purpose": "login",
        }))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_protected_route_requires_token() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/users/me"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .client
        .get(app.url("/users/me"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_refresh_rotates_tokens() {
    let app = TestApp::spawn().await;
    let (user, _) = app.seed_user(None, "refresh@flow.test").await;
    let tokens = app
        .state
        .jwt
        .generate_token_pair(&user)
        .expect("Failed to generate tokens");

    let response = app
        .client
        .post(app.url("/auth/refresh"))
        .json(&json!({ "refresh_token": tokens.refresh_token }))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid JSON");
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_refresh_rejects_access_token() {
    let app = TestApp::spawn().await;
    let (user, _) = app.seed_user(None, "tokenkind@flow.test").await;
    let tokens = app
        .state
        .jwt
        .generate_token_pair(&user)
        .expect("Failed to generate tokens");

    // The two token kinds are signed with the same key, so the
    // refresh endpoint must not honor a short-lived access token.
    assert!(app
        .state
        .jwt
        .validate_refresh_token(&tokens.access_token)
        .is_err());

    let response = app
        .client
        .post(app.url("/auth/refresh"))
        .json(&json!({ "refresh_token": tokens.access_token }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // And an access-token validation of a refresh token fails too.
    assert!(app
        .state
        .jwt
        .validate_access_token(&tokens.refresh_token)
        .is_err());
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_password_reset_flow() {
    let app = TestApp::spawn().await;
    let (user, _) = app.seed_user(None, "reset@flow.test").await;

    let response = app
        .client
        .post(app.url("/auth/password-reset/request"))
        .json(&json!({ "email": user.email }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let code = app
        .state
        .otp
        .generate(&user.email, OtpPurpose::PasswordReset, RequestMeta::default())
        .await
        .expect("Failed to generate code");

    let response = app
        .client
        .post(app.url("/auth/password-reset/confirm"))
        .json(&json!({
            "email": user.email,
            "code": code,
            "new_password": "brand-new-password",
        }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let stored = app
        .state
        .db
        .find_user_by_email(&user.email)
        .await
        .expect("Lookup errored")
        .expect("User missing");
    assert!(stored.password_hash.is_some());
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_tenant_onboarding_requires_system_principal() {
    let app = TestApp::spawn().await;
    let tenant = app.seed_tenant("onboard-http").await;
    let (_, tenant_token) = app
        .seed_user(Some(tenant.tenant_id), "tenant@onboard.test")
        .await;
    let (_, system_token) = app.seed_user(None, "root@onboard.test").await;

    let body = json!({ "tenant_slug": "fresh-tenant", "tenant_label": "Fresh Tenant" });

    let response = app
        .client
        .post(app.url("/tenants"))
        .bearer_auth(&tenant_token)
        .json(&body)
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .client
        .post(app.url("/tenants"))
        .bearer_auth(&system_token)
        .json(&body)
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.expect("Invalid JSON");
    assert_eq!(created["tenant_slug"], "fresh-tenant");
}
