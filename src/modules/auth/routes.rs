use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::controller;
use crate::AppState;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(controller::register))
        .route("/login", post(controller::login))
        .route("/logout", post(controller::logout))
        .route("/is-authenticated", get(controller::is_authenticated))
        .route("/me", get(controller::me))
        .route("/request-verification", post(controller::request_verification))
        .route("/verify-email", post(controller::verify_email))
        .route("/forgot-password", post(controller::forgot_password))
        .route("/reset-password", post(controller::reset_password))
}
