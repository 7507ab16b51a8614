//! Position handlers (user-strategies)

use std::sync::Arc;

use axum::{Extension, Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiResponse, ApiResult, OpenPositionRequest, created, ok};
use crate::core_types::{PositionId, TransactionId};
use crate::investment::PositionView;
use crate::user_auth::AuthenticatedAccount;

#[derive(Debug, Serialize, ToSchema)]
pub struct OpenPositionData {
    #[schema(value_type = uuid::Uuid)]
    pub position_id: PositionId,
    #[schema(value_type = uuid::Uuid)]
    pub transaction_id: TransactionId,
    #[schema(example = "Investment successful")]
    pub message: String,
}

/// Invest in a strategy
///
/// POST /api/v1/user-strategies
#[utoipa::path(
    post,
    path = "/api/v1/user-strategies",
    request_body = OpenPositionRequest,
    responses(
        (status = 201, description = "Position opened", body = ApiResponse<OpenPositionData>),
        (status = 400, description = "Below the strategy minimum"),
        (status = 404, description = "Unknown or inactive strategy"),
        (status = 422, description = "Insufficient funds")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Investments"
)]
pub async fn open_position(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedAccount>,
    Json(req): Json<OpenPositionRequest>,
) -> ApiResult<OpenPositionData> {
    let (position, txn) = state
        .services
        .investments
        .open(caller.account_id, req.strategy_id, req.amount)
        .await?;
    created(OpenPositionData {
        position_id: position.id,
        transaction_id: txn.id,
        message: "Investment successful".to_string(),
    })
}

/// List the caller's positions
///
/// GET /api/v1/user-strategies
#[utoipa::path(
    get,
    path = "/api/v1/user-strategies",
    responses(
        (status = 200, description = "Positions with strategy details", body = ApiResponse<Vec<PositionView>>)
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Investments"
)]
pub async fn list_positions(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedAccount>,
) -> ApiResult<Vec<PositionView>> {
    ok(state
        .services
        .investments
        .positions(caller.account_id)
        .await?)
}
