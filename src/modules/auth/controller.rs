use axum::{
    extract::State,
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::AppState;

use super::interface::AuthError;
use super::schema::{
    ErrorResponse, ForgotPasswordRequest, ForgotPasswordResponse, IsAuthenticatedResponse,
    LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, RegisterResponse,
    RequestVerificationResponse, ResetPasswordRequest, ResetPasswordResponse, UserResponse,
    VerifyEmailRequest, VerifyEmailResponse,
};

const SESSION_COOKIE: &str = "token";

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<RegisterResponse>), (StatusCode, Json<ErrorResponse>)> {
    if let Err(e) = req.validate() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("invalid_input", e.to_string())),
        ));
    }

    let result = state
        .auth
        .register(&req.name, &req.email, &req.password)
        .await
        .map_err(into_error)?;

    let warning = result
        .mail_error
        .as_ref()
        .map(|_| "Account created, but the welcome email could not be delivered".to_string());

    Ok((
        StatusCode::CREATED,
        session_headers(&state, &result.session.token),
        Json(RegisterResponse {
            user: UserResponse::from(&result.account),
            warning,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, HeaderMap, Json<LoginResponse>), (StatusCode, Json<ErrorResponse>)> {
    let result = state
        .auth
        .login(&req.email, &req.password)
        .await
        .map_err(into_error)?;

    Ok((
        StatusCode::OK,
        session_headers(&state, &result.session.token),
        Json(LoginResponse {
            message: "Login successful",
            user: UserResponse::from(&result.account),
        }),
    ))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (StatusCode, HeaderMap, Json<LogoutResponse>) {
    state.auth.logout(session_token(&headers).as_deref());

    (
        StatusCode::OK,
        clear_session_headers(&state),
        Json(LogoutResponse {
            message: "Logged out successfully",
        }),
    )
}

pub async fn is_authenticated(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<IsAuthenticatedResponse> {
    let authenticated = session_token(&headers)
        .map(|token| state.auth.is_authenticated(&token))
        .unwrap_or(false);

    Json(IsAuthenticatedResponse { authenticated })
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, (StatusCode, Json<ErrorResponse>)> {
    let account_id = authenticated_account_id(&state, &headers)?;

    let account = state
        .auth
        .current_account(&account_id)
        .await
        .map_err(into_error)?;

    Ok(Json(UserResponse::from(&account)))
}

pub async fn request_verification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RequestVerificationResponse>, (StatusCode, Json<ErrorResponse>)> {
    let account_id = authenticated_account_id(&state, &headers)?;

    state
        .auth
        .request_email_verification(&account_id)
        .await
        .map_err(into_error)?;

    Ok(Json(RequestVerificationResponse {
        message: "Verification OTP sent on email",
    }))
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<Json<VerifyEmailResponse>, (StatusCode, Json<ErrorResponse>)> {
    let account_id = authenticated_account_id(&state, &headers)?;

    state
        .auth
        .confirm_email_verification(&account_id, &req.otp)
        .await
        .map_err(into_error)?;

    Ok(Json(VerifyEmailResponse {
        message: "Email verified successfully",
    }))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.auth.request_password_reset(&req.email).await {
        // A neutral answer for unknown addresses keeps the endpoint from
        // confirming which emails have accounts.
        Ok(()) | Err(AuthError::AccountNotFound) => Ok(Json(ForgotPasswordResponse {
            message: "If that email has an account, an OTP has been sent",
        })),
        Err(err) => Err(into_error(err)),
    }
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<ResetPasswordResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .auth
        .confirm_password_reset(&req.email, &req.otp, &req.new_password)
        .await
        .map_err(into_error)?;

    Ok(Json(ResetPasswordResponse {
        message: "Password has been reset successfully",
    }))
}

// =============================================================================
// SESSION COOKIE HELPERS
// =============================================================================

fn session_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

fn authenticated_account_id(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    session_token(headers)
        .and_then(|token| state.auth.session_account_id(&token))
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(
                    "invalid_credentials",
                    "Not authenticated",
                )),
            )
        })
}

fn session_headers(state: &AppState, token: &str) -> HeaderMap {
    let max_age = state.auth.session_max_age_secs();
    let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; Max-Age={max_age}");
    cookie.push_str(cookie_site_attributes(state.cookie_secure));
    set_cookie_headers(cookie)
}

fn clear_session_headers(state: &AppState) -> HeaderMap {
    let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0");
    cookie.push_str(cookie_site_attributes(state.cookie_secure));
    set_cookie_headers(cookie)
}

// Cross-site frontends need SameSite=None, which browsers only accept with
// Secure; plain http deployments fall back to Strict.
fn cookie_site_attributes(secure: bool) -> &'static str {
    if secure {
        "; Secure; SameSite=None"
    } else {
        "; SameSite=Strict"
    }
}

fn set_cookie_headers(cookie: String) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        headers.insert(SET_COOKIE, value);
    }
    headers
}

fn into_error(err: AuthError) -> (StatusCode, Json<ErrorResponse>) {
    (err.status_code(), Json(ErrorResponse::from(&err)))
}
