//! Strategy catalog handlers

use std::sync::Arc;

use axum::extract::{Path, State};

use super::super::state::AppState;
use super::super::types::{ApiResponse, ApiResult, ok};
use crate::core_types::StrategyId;
use crate::strategy::Strategy;

/// List active strategies
///
/// GET /api/v1/strategies
#[utoipa::path(
    get,
    path = "/api/v1/strategies",
    responses(
        (status = 200, description = "Active strategies", body = ApiResponse<Vec<Strategy>>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Strategies"
)]
pub async fn list_strategies(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Strategy>> {
    ok(state.services.strategies.list().await?)
}

/// Get one active strategy
///
/// GET /api/v1/strategies/{id}
#[utoipa::path(
    get,
    path = "/api/v1/strategies/{id}",
    params(("id" = uuid::Uuid, Path, description = "Strategy id")),
    responses(
        (status = 200, description = "Strategy", body = ApiResponse<Strategy>),
        (status = 404, description = "Unknown or inactive strategy")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Strategies"
)]
pub async fn get_strategy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<StrategyId>,
) -> ApiResult<Strategy> {
    ok(state.services.strategies.get(id).await?)
}
