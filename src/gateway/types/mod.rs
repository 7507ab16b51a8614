//! Gateway types module
//!
//! - [`response`]: response wrapper, handler error type and error codes
//! - [`requests`]: JSON request bodies that have no home in a service module

pub mod requests;
pub mod response;

pub use requests::{
    CodeRequest, EmailRequest, OpenPositionRequest, RedeemCouponRequest, ResetPasswordRequest,
    UpdatePhoneRequest, VideoAdRequest,
};
pub use response::{ApiError, ApiResponse, ApiResult, MessageData, created, error_codes, ok};
