//! Admin handlers. Routed behind the admin middleware.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResponse, ApiResult, MessageData, created, ok};
use crate::account::AccountView;
use crate::coupon::{Coupon, NewCoupon};
use crate::core_types::StrategyId;
use crate::settlement::SettlementReport;
use crate::strategy::{NewStrategy, Strategy};
use crate::subscription::SubscriptionRequest;

/// List all accounts, newest first
///
/// GET /api/v1/admin/users
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    responses(
        (status = 200, description = "Accounts", body = ApiResponse<Vec<AccountView>>),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Admin"
)]
pub async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<Vec<AccountView>> {
    let accounts = state.services.ledger.list_accounts().await?;
    ok(accounts.iter().map(AccountView::from).collect())
}

/// Create a strategy
///
/// POST /api/v1/admin/strategies
#[utoipa::path(
    post,
    path = "/api/v1/admin/strategies",
    request_body = NewStrategy,
    responses(
        (status = 201, description = "Strategy created", body = ApiResponse<Strategy>),
        (status = 409, description = "Name already taken"),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Admin"
)]
pub async fn create_strategy(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewStrategy>,
) -> ApiResult<Strategy> {
    created(state.services.strategies.create(req).await?)
}

/// Deactivate a strategy. Existing positions are kept.
///
/// POST /api/v1/admin/strategies/{id}/deactivate
#[utoipa::path(
    post,
    path = "/api/v1/admin/strategies/{id}/deactivate",
    params(("id" = uuid::Uuid, Path, description = "Strategy id")),
    responses(
        (status = 200, description = "Strategy deactivated", body = ApiResponse<MessageData>),
        (status = 404, description = "Unknown strategy")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Admin"
)]
pub async fn deactivate_strategy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<StrategyId>,
) -> ApiResult<MessageData> {
    state.services.strategies.deactivate(id).await?;
    ok(MessageData::new("Strategy deactivated"))
}

/// Create a coupon
///
/// POST /api/v1/admin/coupons
#[utoipa::path(
    post,
    path = "/api/v1/admin/coupons",
    request_body = NewCoupon,
    responses(
        (status = 201, description = "Coupon created", body = ApiResponse<Coupon>),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Admin"
)]
pub async fn create_coupon(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewCoupon>,
) -> ApiResult<Coupon> {
    created(state.services.coupons.create(req).await?)
}

/// Apply a trading results file to every active position
///
/// POST /api/v1/admin/upload-trading-results (multipart, field `file`)
#[utoipa::path(
    post,
    path = "/api/v1/admin/upload-trading-results",
    request_body(content_type = "multipart/form-data", description = "Results table in field `file`"),
    responses(
        (status = 200, description = "Settlement report", body = ApiResponse<SettlementReport>),
        (status = 400, description = "Unsupported format or missing columns"),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Admin"
)]
pub async fn upload_trading_results(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<SettlementReport> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Malformed upload: {}", e)))?;
        let report = state
            .services
            .settlement
            .process_upload(&filename, &bytes)
            .await?;
        return ok(report);
    }
    ApiError::bad_request("Missing file field").into_err()
}

/// List subscription requests, newest first
///
/// GET /api/v1/admin/subscription-requests
#[utoipa::path(
    get,
    path = "/api/v1/admin/subscription-requests",
    responses(
        (status = 200, description = "Requests", body = ApiResponse<Vec<SubscriptionRequest>>),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Admin"
)]
pub async fn list_subscription_requests(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<SubscriptionRequest>> {
    ok(state.services.subscriptions.list().await?)
}
