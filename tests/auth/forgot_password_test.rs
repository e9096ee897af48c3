use axum::http::StatusCode;
use serde_json::json;

use crate::common::{test_email, test_password, TestContext};

async fn register(ctx: &TestContext, email: &str) {
    let response = ctx
        .server
        .post("/auth/register")
        .json(&json!({
            "name": "Test User",
            "email": email,
            "password": test_password()
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn forgot_password_sends_reset_otp() {
    let ctx = TestContext::new().await;
    let email = test_email();
    register(&ctx, &email).await;

    let response = ctx
        .server
        .post("/auth/forgot-password")
        .json(&json!({ "email": &email }))
        .await;

    response.assert_status(StatusCode::OK);

    let sent = ctx.mailer.sent();
    let otp_mail = sent.last().unwrap();
    assert_eq!(otp_mail.to, email);
    assert_eq!(otp_mail.subject, "Password Reset OTP");

    let account = ctx.store.snapshot(&email).unwrap();
    assert!(account.reset_otp.is_some());
    assert!(account.reset_otp_expires_at.is_some());
}

#[tokio::test]
async fn forgot_password_for_unknown_email_returns_neutral_ok() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/auth/forgot-password")
        .json(&json!({ "email": "nobody@example.com" }))
        .await;

    response.assert_status(StatusCode::OK);
    assert!(ctx.mailer.sent().is_empty());
}

#[tokio::test]
async fn forgot_password_does_not_reveal_account_existence() {
    let ctx = TestContext::new().await;
    let email = test_email();
    register(&ctx, &email).await;

    let known = ctx
        .server
        .post("/auth/forgot-password")
        .json(&json!({ "email": &email }))
        .await;

    let unknown = ctx
        .server
        .post("/auth/forgot-password")
        .json(&json!({ "email": "nobody@example.com" }))
        .await;

    known.assert_status(StatusCode::OK);
    unknown.assert_status(StatusCode::OK);

    let body_known: serde_json::Value = known.json();
    let body_unknown: serde_json::Value = unknown.json();
    assert_eq!(body_known, body_unknown);
}

#[tokio::test]
async fn forgot_password_with_uppercase_email_finds_account() {
    let ctx = TestContext::new().await;
    let email = test_email();
    register(&ctx, &email).await;

    let response = ctx
        .server
        .post("/auth/forgot-password")
        .json(&json!({ "email": email.to_uppercase() }))
        .await;

    response.assert_status(StatusCode::OK);

    let account = ctx.store.snapshot(&email).unwrap();
    assert!(account.reset_otp.is_some());
}

#[tokio::test]
async fn forgot_password_with_missing_email_returns_unprocessable() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/auth/forgot-password")
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}
