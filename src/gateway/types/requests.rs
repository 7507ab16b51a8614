use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::core_types::{CouponId, StrategyId};

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
}

/// Email plus the six-digit code it received
#[derive(Debug, Deserialize, ToSchema)]
pub struct CodeRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "042917")]
    pub code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "042917")]
    pub code: String,
    #[schema(example = "new-password-1")]
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePhoneRequest {
    #[schema(example = "+15550100")]
    pub phone_number: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OpenPositionRequest {
    #[schema(value_type = uuid::Uuid)]
    pub strategy_id: StrategyId,
    #[schema(value_type = String, example = "1000")]
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RedeemCouponRequest {
    #[schema(value_type = uuid::Uuid)]
    pub coupon_id: CouponId,
    /// Address the redemption code was sent to
    #[schema(example = "alice@example.com")]
    pub otp_email: String,
    #[schema(example = "042917")]
    pub otp_code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VideoAdRequest {
    /// Ad network's id for this view; one reward per id
    #[schema(example = "ad-view-7f3a")]
    pub transaction_id: String,
    #[serde(default)]
    pub ad_unit_id: Option<String>,
}
