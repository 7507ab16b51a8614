//! Core Error Types
//!
//! One taxonomy for every service operation. Each kind is distinguishable so
//! the gateway can map it onto a status code without inspecting messages.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    // === Reference / validation ===
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // === Balance ===
    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Investment amount {offered} is below the strategy minimum {required}")]
    BelowMinimum { required: String, offered: String },

    // === Verification ===
    #[error("Invalid verification code")]
    InvalidCode,

    #[error("{0} has expired")]
    Expired(String),

    #[error("Invalid or expired verification token")]
    InvalidToken,

    // === Idempotency ===
    #[error("Duplicate claim: {0}")]
    DuplicateClaim(String),

    // === Batch input ===
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    // === Identity ===
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Admin access required")]
    Forbidden,

    // === Collaborators ===
    #[error("External service failure: {0}")]
    ExternalServiceFailure(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// The balance moved but a side write did not; startup recovery finishes it
    #[error("Balance applied, {0} pending recovery")]
    PendingRecovery(String),
}

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound(what.into())
    }

    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::InvalidInput(_) => "INVALID_INPUT",
            CoreError::AlreadyExists(_) => "ALREADY_EXISTS",
            CoreError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            CoreError::BelowMinimum { .. } => "BELOW_MINIMUM",
            CoreError::InvalidCode => "INVALID_CODE",
            CoreError::Expired(_) => "EXPIRED",
            CoreError::InvalidToken => "INVALID_TOKEN",
            CoreError::DuplicateClaim(_) => "DUPLICATE_CLAIM",
            CoreError::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            CoreError::Unauthenticated => "UNAUTHENTICATED",
            CoreError::Forbidden => "FORBIDDEN",
            CoreError::ExternalServiceFailure(_) => "EXTERNAL_SERVICE_FAILURE",
            CoreError::Storage(_) => "STORAGE_ERROR",
            CoreError::PendingRecovery(_) => "PENDING_RECOVERY",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            CoreError::Unauthenticated => 401,
            CoreError::Forbidden => 403,
            CoreError::NotFound(_) => 404,
            CoreError::AlreadyExists(_) | CoreError::DuplicateClaim(_) => 409,
            CoreError::InvalidInput(_)
            | CoreError::BelowMinimum { .. }
            | CoreError::InvalidCode
            | CoreError::Expired(_)
            | CoreError::InvalidToken
            | CoreError::SchemaMismatch(_) => 400,
            CoreError::InsufficientFunds => 422,
            CoreError::ExternalServiceFailure(_) => 502,
            CoreError::Storage(_) | CoreError::PendingRecovery(_) => 500,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        CoreError::Storage(e.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CoreError::InsufficientFunds.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(CoreError::InvalidCode.code(), "INVALID_CODE");
        assert_eq!(
            CoreError::DuplicateClaim("ad-1".into()).code(),
            "DUPLICATE_CLAIM"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(CoreError::Unauthenticated.http_status(), 401);
        assert_eq!(CoreError::Forbidden.http_status(), 403);
        assert_eq!(CoreError::not_found("Strategy").http_status(), 404);
        assert_eq!(CoreError::InsufficientFunds.http_status(), 422);
        assert_eq!(CoreError::Expired("Coupon".into()).http_status(), 400);
        assert_eq!(
            CoreError::ExternalServiceFailure("smtp".into()).http_status(),
            502
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CoreError::not_found("Strategy").to_string(),
            "Strategy not found"
        );
        assert_eq!(
            CoreError::Expired("Verification code".into()).to_string(),
            "Verification code has expired"
        );
    }

    #[test]
    fn test_from_store_error() {
        let err: CoreError = StoreError::Backend("connection reset".into()).into();
        assert!(matches!(err, CoreError::Storage(_)));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn test_pending_recovery() {
        let err = CoreError::PendingRecovery("position update".into());
        assert_eq!(err.code(), "PENDING_RECOVERY");
        assert_eq!(err.http_status(), 500);
        assert_eq!(err.to_string(), "Balance applied, position update pending recovery");
    }
}
