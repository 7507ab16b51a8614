//! Core types used throughout the system
//!
//! Fundamental aliases shared by every module. They give ids and money a
//! semantic name so signatures read as the domain does.

use rust_decimal::Decimal;
use uuid::Uuid;

/// Account ID - globally unique, immutable after assignment.
pub type AccountId = Uuid;

/// Strategy ID
pub type StrategyId = Uuid;

/// Position ID - one open investment of an account in a strategy
pub type PositionId = Uuid;

/// Transaction ID - one ledger entry
pub type TransactionId = Uuid;

/// Coupon ID
pub type CouponId = Uuid;

/// Verification session ID. Doubles as the registration verification token.
pub type SessionId = Uuid;

/// Monetary amount.
///
/// Exact decimal arithmetic; every value is finite by construction, so the
/// ledger never has to reject NaN or infinities.
pub type Amount = Decimal;

/// Ledger sequence number, per account.
pub type SeqNum = u64;
