use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::middleware::{SESSION_COOKIE, session_cookie};
use super::service::{AuthResponse, AuthenticatedAccount, LoginRequest, OAuthLogin, RegisterRequest};
use crate::account::AccountView;
use crate::gateway::state::AppState;
use crate::gateway::types::{
    ApiError, ApiResponse, ApiResult, CodeRequest, EmailRequest, MessageData, ResetPasswordRequest,
    UpdatePhoneRequest, created, ok,
};

/// Token handed back by verify-otp, redeemed by register
#[derive(Debug, Serialize, ToSchema)]
pub struct VerificationTokenData {
    pub verification_token: String,
}

type CookieResult<T> =
    Result<(StatusCode, [(header::HeaderName, String); 1], Json<ApiResponse<T>>), ApiError>;

/// Send a registration code
///
/// POST /api/v1/auth/send-otp
#[utoipa::path(
    post,
    path = "/api/v1/auth/send-otp",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Code sent", body = ApiResponse<MessageData>),
        (status = 409, description = "Email already registered"),
        (status = 502, description = "Email delivery failed")
    ),
    tag = "Auth"
)]
pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<MessageData> {
    state.services.auth.send_registration_otp(&req.email).await?;
    ok(MessageData::new("Verification code sent"))
}

/// Verify a registration code
///
/// POST /api/v1/auth/verify-otp
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-otp",
    request_body = CodeRequest,
    responses(
        (status = 200, description = "Code accepted", body = ApiResponse<VerificationTokenData>),
        (status = 400, description = "Invalid or expired code")
    ),
    tag = "Auth"
)]
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CodeRequest>,
) -> ApiResult<VerificationTokenData> {
    let verification_token = state
        .services
        .auth
        .verify_registration_otp(&req.email, &req.code)
        .await?;
    ok(VerificationTokenData { verification_token })
}

/// Register a new account
///
/// POST /api/v1/auth/register
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account registered", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid input or verification token"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    created(state.services.auth.register(req).await?)
}

/// Login with email and password
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    ok(state.services.auth.login(req).await?)
}

/// Complete an OAuth sign-in
///
/// GET /api/v1/auth/session-data
#[utoipa::path(
    get,
    path = "/api/v1/auth/session-data",
    params(
        ("X-Session-ID" = String, Header, description = "Identity provider session id")
    ),
    responses(
        (status = 200, description = "Session created, cookie set", body = ApiResponse<OAuthLogin>),
        (status = 400, description = "Session ID required"),
        (status = 401, description = "Invalid session"),
        (status = 502, description = "Identity provider unavailable")
    ),
    tag = "Auth"
)]
pub async fn session_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> CookieResult<OAuthLogin> {
    let session_id = headers
        .get("X-Session-ID")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("Session ID required"))?;

    let login = state.services.auth.oauth_session(session_id).await?;
    let max_age = (login.expires_at - chrono::Utc::now()).num_seconds().max(0);
    let cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=None",
        SESSION_COOKIE, login.session_token, max_age
    );
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(login)),
    ))
}

/// Logout (drops the cookie session)
///
/// POST /api/v1/auth/logout
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<MessageData>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> CookieResult<MessageData> {
    let token = session_cookie(&headers);
    state.services.auth.logout(token.as_deref()).await?;
    let cookie = format!("{}=; Path=/; Max-Age=0; HttpOnly; Secure; SameSite=None", SESSION_COOKIE);
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(MessageData::new("Logged out successfully"))),
    ))
}

/// Send a password reset code
///
/// POST /api/v1/auth/forgot-password
#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Code sent if the account exists", body = ApiResponse<MessageData>)
    ),
    tag = "Auth"
)]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<MessageData> {
    state.services.auth.forgot_password(&req.email).await?;
    ok(MessageData::new(
        "If the account exists, a reset code has been sent",
    ))
}

/// Reset a password with an emailed code
///
/// POST /api/v1/auth/reset-password
#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<MessageData>),
        (status = 400, description = "Invalid or expired code")
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<MessageData> {
    state
        .services
        .auth
        .reset_password(&req.email, &req.code, &req.new_password)
        .await?;
    ok(MessageData::new("Password updated"))
}

/// Update the caller's phone number
///
/// POST /api/v1/auth/update-phone
#[utoipa::path(
    post,
    path = "/api/v1/auth/update-phone",
    request_body = UpdatePhoneRequest,
    responses(
        (status = 200, description = "Updated account", body = ApiResponse<AccountView>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Auth"
)]
pub async fn update_phone(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedAccount>,
    Json(req): Json<UpdatePhoneRequest>,
) -> ApiResult<AccountView> {
    ok(state
        .services
        .auth
        .update_phone(caller.account_id, &req.phone_number)
        .await?)
}
