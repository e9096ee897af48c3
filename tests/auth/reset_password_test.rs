use axum::http::StatusCode;
use chrono::Duration;
use serde_json::json;

use crate::common::{test_email, test_password, TestContext};

const NEW_PASSWORD: &str = "BrandNewPassword456!";

async fn register_and_request_reset(ctx: &TestContext, email: &str) -> String {
    ctx.server
        .post("/auth/register")
        .json(&json!({
            "name": "Test User",
            "email": email,
            "password": test_password()
        }))
        .await
        .assert_status(StatusCode::CREATED);

    ctx.server
        .post("/auth/forgot-password")
        .json(&json!({ "email": email }))
        .await
        .assert_status(StatusCode::OK);

    ctx.last_mailed_otp(email).unwrap()
}

async fn login_status(ctx: &TestContext, email: &str, password: &str) -> StatusCode {
    ctx.server
        .post("/auth/login")
        .json(&json!({
            "email": email,
            "password": password
        }))
        .await
        .status_code()
}

#[tokio::test]
async fn reset_password_with_mailed_otp_swaps_credentials() {
    let ctx = TestContext::new().await;
    let email = test_email();
    let otp = register_and_request_reset(&ctx, &email).await;

    let response = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "email": &email,
            "otp": otp,
            "new_password": NEW_PASSWORD
        }))
        .await;

    response.assert_status(StatusCode::OK);

    // The old password no longer authenticates, the new one does.
    assert_eq!(
        login_status(&ctx, &email, test_password()).await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        login_status(&ctx, &email, NEW_PASSWORD).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn reset_password_clears_otp_after_use() {
    let ctx = TestContext::new().await;
    let email = test_email();
    let otp = register_and_request_reset(&ctx, &email).await;

    ctx.server
        .post("/auth/reset-password")
        .json(&json!({
            "email": &email,
            "otp": &otp,
            "new_password": NEW_PASSWORD
        }))
        .await
        .assert_status(StatusCode::OK);

    let account = ctx.store.snapshot(&email).unwrap();
    assert!(account.reset_otp.is_none());
    assert!(account.reset_otp_expires_at.is_none());

    // A replay of the consumed code fails.
    let replay = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "email": &email,
            "otp": &otp,
            "new_password": "YetAnotherPassword789!"
        }))
        .await;

    replay.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = replay.json();
    assert_eq!(body["error"], "missing_otp");
}

#[tokio::test]
async fn reset_password_with_wrong_otp_leaves_password_unchanged() {
    let ctx = TestContext::new().await;
    let email = test_email();
    register_and_request_reset(&ctx, &email).await;

    let response = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "email": &email,
            "otp": "000000",
            "new_password": NEW_PASSWORD
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "invalid_otp");

    assert_eq!(
        login_status(&ctx, &email, test_password()).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn reset_password_with_expired_otp_returns_otp_expired() {
    let ctx = TestContext::new().await;
    let email = test_email();
    let otp = register_and_request_reset(&ctx, &email).await;

    ctx.clock.advance(Duration::minutes(16));

    let response = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "email": &email,
            "otp": otp,
            "new_password": NEW_PASSWORD
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "otp_expired");

    assert_eq!(
        login_status(&ctx, &email, test_password()).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn second_reset_request_overwrites_previous_code() {
    let ctx = TestContext::new().await;
    let email = test_email();
    let first_otp = register_and_request_reset(&ctx, &email).await;

    ctx.server
        .post("/auth/forgot-password")
        .json(&json!({ "email": &email }))
        .await
        .assert_status(StatusCode::OK);

    let second_otp = ctx.last_mailed_otp(&email).unwrap();
    assert_ne!(first_otp, second_otp);

    let stale = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "email": &email,
            "otp": first_otp,
            "new_password": NEW_PASSWORD
        }))
        .await;

    stale.assert_status(StatusCode::BAD_REQUEST);

    ctx.server
        .post("/auth/reset-password")
        .json(&json!({
            "email": &email,
            "otp": second_otp,
            "new_password": NEW_PASSWORD
        }))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn reset_password_for_unknown_email_returns_not_found() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "email": "nobody@example.com",
            "otp": "123456",
            "new_password": NEW_PASSWORD
        }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reset_password_with_empty_new_password_returns_bad_request() {
    let ctx = TestContext::new().await;
    let email = test_email();
    let otp = register_and_request_reset(&ctx, &email).await;

    let response = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "email": &email,
            "otp": otp,
            "new_password": ""
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "invalid_input");
}
