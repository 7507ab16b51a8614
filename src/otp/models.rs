use chrono::serde::{ts_milliseconds, ts_milliseconds_option};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core_types::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Registration,
    CouponRedemption,
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Registration => "registration",
            OtpPurpose::CouponRedemption => "coupon_redemption",
            OtpPurpose::PasswordReset => "password_reset",
        }
    }

    pub(crate) fn subject(&self) -> &'static str {
        match self {
            OtpPurpose::Registration => "Verify your email",
            OtpPurpose::CouponRedemption => "Confirm your coupon redemption",
            OtpPurpose::PasswordReset => "Reset your password",
        }
    }
}

/// One issued code. Consumed is terminal; expiry is checked lazily.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSession {
    pub id: SessionId,
    pub email: String,
    pub code: String,
    pub purpose: OtpPurpose,
    #[serde(with = "ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    pub is_consumed: bool,
    #[serde(default, with = "ts_milliseconds_option")]
    pub consumed_at: Option<DateTime<Utc>>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl VerificationSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
