//! Ledger entries

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::account::Pool;
use crate::core_types::{AccountId, Amount, PositionId, SeqNum, StrategyId, TransactionId};
use crate::investment::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Buy,
    Sell,
    Profit,
    Loss,
    Deposit,
    CouponRedemption,
    DailyLogin,
    VideoAd,
    Registration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TxnStatus {
    /// Written ahead of the balance update, not yet confirmed
    Pending,
    Committed,
}

/// Immutable record of one balance mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    #[schema(value_type = uuid::Uuid)]
    pub id: TransactionId,
    #[schema(value_type = uuid::Uuid)]
    pub account_id: AccountId,
    #[serde(default)]
    #[schema(value_type = Option<uuid::Uuid>)]
    pub strategy_id: Option<StrategyId>,
    #[serde(default)]
    #[schema(value_type = Option<uuid::Uuid>)]
    pub position_id: Option<PositionId>,
    #[serde(rename = "transaction_type")]
    pub kind: TransactionKind,
    /// Signed: spends are negative
    #[schema(value_type = String, example = "-50")]
    pub amount: Amount,
    pub pool: Pool,
    pub description: String,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub trade_details: Option<Value>,
    /// Account ledger version this entry produced
    pub seq: SeqNum,
    pub status: TxnStatus,
    #[serde(with = "ts_milliseconds")]
    #[schema(value_type = i64, example = 1760000000000i64)]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_committed(&self) -> bool {
        self.status == TxnStatus::Committed
    }
}

/// Describes the entry a mutation appends, minus amount and pool
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub kind: TransactionKind,
    pub description: String,
    pub strategy_id: Option<StrategyId>,
    pub position_id: Option<PositionId>,
    pub trade_details: Option<Value>,
}

impl Posting {
    pub fn new(kind: TransactionKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            strategy_id: None,
            position_id: None,
            trade_details: None,
        }
    }

    pub fn with_strategy(mut self, strategy_id: StrategyId) -> Self {
        self.strategy_id = Some(strategy_id);
        self
    }

    pub fn with_position(mut self, position_id: PositionId) -> Self {
        self.position_id = Some(position_id);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.trade_details = Some(details);
        self
    }
}

/// Position record written in the same ledger step as the balance change
#[derive(Debug, Clone, PartialEq)]
pub enum PositionWrite {
    Open(Position),
    Settle {
        position_id: PositionId,
        delta: Amount,
    },
}

/// How an investment debit was split across pools
#[derive(Debug, Clone, PartialEq)]
pub struct DebitOutcome {
    pub earnings_used: Decimal,
    pub virtual_used: Decimal,
    pub transaction: Transaction,
}
