//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `ApiError`: error half of every handler result
//! - `error_codes`: Standard error code constants

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::CoreError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Plain acknowledgement payload
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageData {
    #[schema(example = "Logged out successfully")]
    pub message: String,
}

impl MessageData {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Handler results
// ============================================================================

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// 200 with the data wrapped in `ApiResponse`
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// 201 with the data wrapped in `ApiResponse`
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED, msg)
    }

    pub fn missing_auth() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            error_codes::MISSING_AUTH,
            "Missing credentials",
        )
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
        )
    }

    pub fn into_err<T>(self) -> Result<T, Self> {
        Err(self)
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = error_codes::for_error(&e);
        // Backend details stay in the log
        let msg = match &e {
            CoreError::Storage(detail) => {
                tracing::error!(error = %detail, "Storage failure");
                "Internal error".to_string()
            }
            CoreError::PendingRecovery(detail) => {
                tracing::error!(error = %detail, "Side write deferred to recovery");
                e.to_string()
            }
            other => other.to_string(),
        };
        Self::new(status, code, msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.code, self.msg))).into_response()
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    use crate::error::CoreError;

    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;
    pub const BELOW_MINIMUM: i32 = 1003;
    pub const SCHEMA_MISMATCH: i32 = 1004;

    // Verification errors (11xx)
    pub const INVALID_CODE: i32 = 1101;
    pub const EXPIRED: i32 = 1102;
    pub const INVALID_TOKEN: i32 = 1103;

    // Conflicts (12xx)
    pub const ALREADY_EXISTS: i32 = 1201;
    pub const DUPLICATE_CLAIM: i32 = 1202;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const FORBIDDEN: i32 = 2003;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4004;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const UPSTREAM_FAILURE: i32 = 5002;

    pub fn for_error(e: &CoreError) -> i32 {
        match e {
            CoreError::InvalidInput(_) => INVALID_PARAMETER,
            CoreError::InsufficientFunds => INSUFFICIENT_BALANCE,
            CoreError::BelowMinimum { .. } => BELOW_MINIMUM,
            CoreError::SchemaMismatch(_) => SCHEMA_MISMATCH,
            CoreError::InvalidCode => INVALID_CODE,
            CoreError::Expired(_) => EXPIRED,
            CoreError::InvalidToken => INVALID_TOKEN,
            CoreError::AlreadyExists(_) => ALREADY_EXISTS,
            CoreError::DuplicateClaim(_) => DUPLICATE_CLAIM,
            CoreError::Unauthenticated => AUTH_FAILED,
            CoreError::Forbidden => FORBIDDEN,
            CoreError::NotFound(_) => NOT_FOUND,
            CoreError::ExternalServiceFailure(_) => UPSTREAM_FAILURE,
            CoreError::Storage(_) | CoreError::PendingRecovery(_) => INTERNAL_ERROR,
        }
    }
}
