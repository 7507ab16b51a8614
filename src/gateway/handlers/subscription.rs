//! Subscription request handler

use std::sync::Arc;

use axum::{Extension, Json, extract::State};

use super::super::state::AppState;
use super::super::types::{ApiResponse, ApiResult, created};
use crate::subscription::{NewSubscriptionRequest, SubscriptionRequest};
use crate::user_auth::AuthenticatedAccount;

/// Ask to be contacted about a strategy
///
/// POST /api/v1/subscription-requests
#[utoipa::path(
    post,
    path = "/api/v1/subscription-requests",
    request_body = NewSubscriptionRequest,
    responses(
        (status = 201, description = "Request recorded", body = ApiResponse<SubscriptionRequest>),
        (status = 404, description = "Unknown or inactive strategy")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Subscriptions"
)]
pub async fn create_subscription_request(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedAccount>,
    Json(req): Json<NewSubscriptionRequest>,
) -> ApiResult<SubscriptionRequest> {
    created(
        state
            .services
            .subscriptions
            .create(caller.account_id, req)
            .await?,
    )
}
