use chrono::serde::{ts_milliseconds, ts_milliseconds_option};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::core_types::{AccountId, CouponId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coupon {
    #[schema(value_type = uuid::Uuid)]
    pub id: CouponId,
    pub title: String,
    pub description: String,
    /// Earnings debited on redemption
    #[schema(value_type = String, example = "500")]
    pub points_required: Decimal,
    /// Face value shown to the user
    #[schema(value_type = String, example = "5")]
    pub value: Decimal,
    #[serde(default, with = "ts_milliseconds_option")]
    #[schema(value_type = Option<i64>)]
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(default)]
    pub redeemed_count: i64,
    #[serde(with = "ts_milliseconds")]
    #[schema(value_type = i64)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewCoupon {
    #[validate(length(min = 1, max = 128))]
    #[schema(example = "Coffee voucher")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schema(value_type = String, example = "500")]
    pub points_required: Decimal,
    #[schema(value_type = String, example = "5")]
    pub value: Decimal,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CouponRedemption {
    pub id: uuid::Uuid,
    #[schema(value_type = uuid::Uuid)]
    pub account_id: AccountId,
    #[schema(value_type = uuid::Uuid)]
    pub coupon_id: CouponId,
    #[schema(value_type = String)]
    pub points_used: Decimal,
    #[serde(with = "ts_milliseconds")]
    #[schema(value_type = i64)]
    pub redeemed_at: DateTime<Utc>,
}
