use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core_types::{AccountId, Amount, PositionId, SeqNum, StrategyId};
use crate::strategy::RiskCategory;

/// One investment of an account in a strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub account_id: AccountId,
    pub strategy_id: StrategyId,
    pub invested_amount: Amount,
    /// Cumulative settled profit (negative for loss)
    pub profit_loss: Amount,
    pub is_active: bool,
    #[serde(with = "ts_milliseconds")]
    pub start_date: DateTime<Utc>,
    /// Ledger seq of the last transaction folded into this position
    pub settled_seq: SeqNum,
}

/// Position joined with its strategy, as listed to the owner
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PositionView {
    #[schema(value_type = uuid::Uuid)]
    pub id: PositionId,
    #[schema(value_type = uuid::Uuid)]
    pub strategy_id: StrategyId,
    pub strategy_name: String,
    pub category: RiskCategory,
    #[schema(value_type = String, example = "4.5")]
    pub monthly_return: Decimal,
    #[schema(value_type = String, example = "1000")]
    pub invested_amount: Decimal,
    #[schema(value_type = String, example = "-100")]
    pub profit_loss: Decimal,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
}
