//! Coupon handlers

use std::sync::Arc;

use axum::{Extension, Json, extract::State};

use super::super::state::AppState;
use super::super::types::{ApiResponse, ApiResult, MessageData, RedeemCouponRequest, ok};
use crate::coupon::{Coupon, CouponRedemption};
use crate::user_auth::AuthenticatedAccount;

/// List active coupons
///
/// GET /api/v1/coupons
#[utoipa::path(
    get,
    path = "/api/v1/coupons",
    responses(
        (status = 200, description = "Active coupons", body = ApiResponse<Vec<Coupon>>)
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Coupons"
)]
pub async fn list_coupons(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Coupon>> {
    ok(state.services.coupons.list().await?)
}

/// Email a redemption code to the caller
///
/// POST /api/v1/coupons/request-otp
#[utoipa::path(
    post,
    path = "/api/v1/coupons/request-otp",
    responses(
        (status = 200, description = "Code sent", body = ApiResponse<MessageData>),
        (status = 502, description = "Email delivery failed")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Coupons"
)]
pub async fn request_coupon_otp(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedAccount>,
) -> ApiResult<MessageData> {
    state
        .services
        .redemptions
        .request_otp(caller.account_id)
        .await?;
    ok(MessageData::new("Verification code sent"))
}

/// Redeem a coupon against earnings
///
/// POST /api/v1/coupons/redeem
#[utoipa::path(
    post,
    path = "/api/v1/coupons/redeem",
    request_body = RedeemCouponRequest,
    responses(
        (status = 200, description = "Coupon redeemed", body = ApiResponse<CouponRedemption>),
        (status = 400, description = "Invalid or expired code, or expired coupon"),
        (status = 404, description = "Unknown or inactive coupon"),
        (status = 422, description = "Insufficient earnings")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Coupons"
)]
pub async fn redeem_coupon(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedAccount>,
    Json(req): Json<RedeemCouponRequest>,
) -> ApiResult<CouponRedemption> {
    ok(state
        .services
        .redemptions
        .redeem(caller.account_id, req.coupon_id, &req.otp_email, &req.otp_code)
        .await?)
}
