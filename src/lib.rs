//! TradeSim - trading-simulation rewards backend
//!
//! Users invest virtual money in admin-defined strategies, receive profit or
//! loss from uploaded trading results, earn task rewards and spend trading
//! earnings on coupons.
//!
//! # Modules
//!
//! - [`core_types`] - Id and amount aliases
//! - [`store`] - Document store port, in-memory and PostgreSQL backends, keyed locks
//! - [`account`] - Account record, balance pools and views
//! - [`ledger`] - Multi-pool balance ledger with write-ahead transactions and recovery
//! - [`otp`] - Single-use email verification codes
//! - [`strategy`] - Strategy catalog
//! - [`investment`] - Positions opened against strategies
//! - [`settlement`] - Batch profit/loss settlement from uploaded results
//! - [`rewards`] - Registration, daily login and ad-view bonuses
//! - [`coupon`] - Coupon catalog and OTP-gated redemption
//! - [`subscription`] - Strategy subscription requests
//! - [`user_auth`] - Registration, sign-in, JWT and cookie sessions
//! - [`gateway`] - axum HTTP API

// Core types - must be first!
pub mod core_types;

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

// Storage
pub mod store;

// Domain
pub mod account;
pub mod coupon;
pub mod investment;
pub mod ledger;
pub mod otp;
pub mod rewards;
pub mod settlement;
pub mod strategy;
pub mod subscription;
pub mod user_auth;

// Wiring and HTTP surface
pub mod gateway;
pub mod services;

// Convenient re-exports at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use core_types::{AccountId, Amount, CouponId, PositionId, SeqNum, StrategyId, TransactionId};
pub use error::{CoreError, CoreResult};
pub use ledger::Ledger;
pub use services::Services;
pub use store::{DocumentStore, MemoryStore, PgStore};
