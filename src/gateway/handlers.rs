//! HTTP handlers, one module per resource

pub mod admin;
pub mod coupon;
pub mod health;
pub mod investment;
pub mod reward;
pub mod strategy;
pub mod subscription;
pub mod wallet;

pub use admin::{
    create_coupon, create_strategy, deactivate_strategy, list_subscription_requests, list_users,
    upload_trading_results,
};
pub use coupon::{list_coupons, redeem_coupon, request_coupon_otp};
pub use health::{HealthResponse, health_check};
pub use investment::{list_positions, open_position};
pub use reward::video_ad;
pub use strategy::{get_strategy, list_strategies};
pub use subscription::create_subscription_request;
pub use wallet::{get_wallet, list_transactions};
