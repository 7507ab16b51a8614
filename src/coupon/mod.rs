//! Coupons: admin catalog plus OTP-gated redemption against earnings

pub mod catalog;
pub mod models;
pub mod redemption;

pub use catalog::CouponCatalog;
pub use models::{Coupon, CouponRedemption, NewCoupon};
pub use redemption::RedemptionEngine;
