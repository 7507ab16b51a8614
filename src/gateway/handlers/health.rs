//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiResponse, error_codes};
use crate::store::collections;
use crate::store::Filter;

/// Health check response data
#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
    /// Build commit
    #[schema(example = "a1b2c3d")]
    pub version: String,
    /// Storage backend name
    #[schema(example = "memory")]
    pub storage: String,
    pub uptime_secs: u64,
}

/// Health check endpoint
///
/// Pings the document store with a cheap count. Failure details stay in the
/// log; the response only says unavailable.
///
/// - Healthy: 200 OK + {code: 0, data: {...}}
/// - Unhealthy: 503 Service Unavailable + {code: 5001, msg: "unavailable"}
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = ApiResponse<HealthResponse>, content_type = "application/json"),
        (status = 503, description = "Service unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let store = &state.services.store;
    if let Err(e) = store.count(collections::STRATEGIES, &Filter::new()).await {
        tracing::error!(backend = store.name(), error = %e, "Health check failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                code: error_codes::SERVICE_UNAVAILABLE,
                msg: "unavailable".to_string(),
                data: None,
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(HealthResponse {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            version: env!("GIT_HASH").to_string(),
            storage: store.name().to_string(),
            uptime_secs: state.started_at.elapsed().as_secs(),
        })),
    )
}
