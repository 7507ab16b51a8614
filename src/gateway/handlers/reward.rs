//! Reward handlers

use std::sync::Arc;

use axum::{Extension, Json, extract::State};

use super::super::state::AppState;
use super::super::types::{ApiResponse, ApiResult, VideoAdRequest, ok};
use crate::ledger::Transaction;
use crate::user_auth::AuthenticatedAccount;

/// Claim the reward for a watched video ad
///
/// POST /api/v1/rewards/video-ad
#[utoipa::path(
    post,
    path = "/api/v1/rewards/video-ad",
    request_body = VideoAdRequest,
    responses(
        (status = 200, description = "Reward credited to the task pool", body = ApiResponse<Transaction>),
        (status = 409, description = "Ad view already rewarded")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Rewards"
)]
pub async fn video_ad(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedAccount>,
    Json(req): Json<VideoAdRequest>,
) -> ApiResult<Transaction> {
    ok(state
        .services
        .rewards
        .ad_view(
            caller.account_id,
            &req.transaction_id,
            req.ad_unit_id.as_deref(),
        )
        .await?)
}
