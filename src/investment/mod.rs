//! Investment Tracker
//!
//! Opens positions (one ledger debit each) and lists them with their
//! strategy details.

pub mod models;

pub use models::{Position, PositionView};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::core_types::{AccountId, Amount, StrategyId};
use crate::error::{CoreError, CoreResult};
use crate::ledger::{Ledger, Posting, Transaction, TransactionKind};
use crate::store::{DocumentStore, Filter, collections, from_documents};
use crate::strategy::StrategyCatalog;

pub struct InvestmentTracker {
    store: Arc<dyn DocumentStore>,
    ledger: Arc<Ledger>,
    strategies: Arc<StrategyCatalog>,
}

impl InvestmentTracker {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        ledger: Arc<Ledger>,
        strategies: Arc<StrategyCatalog>,
    ) -> Self {
        Self {
            store,
            ledger,
            strategies,
        }
    }

    /// Invest `amount` in an active strategy. Every call opens a new position.
    pub async fn open(
        &self,
        account_id: AccountId,
        strategy_id: StrategyId,
        amount: Amount,
    ) -> CoreResult<(Position, Transaction)> {
        let strategy = self.strategies.get(strategy_id).await?;
        if amount < strategy.capital_required {
            return Err(CoreError::BelowMinimum {
                required: strategy.capital_required.to_string(),
                offered: amount.to_string(),
            });
        }

        let mut session = self.ledger.open(account_id).await?;
        let position = Position {
            id: uuid::Uuid::new_v4(),
            account_id,
            strategy_id,
            invested_amount: amount,
            profit_loss: Amount::ZERO,
            is_active: true,
            // both stamped by the ledger from the buy entry
            start_date: chrono::DateTime::UNIX_EPOCH,
            settled_seq: 0,
        };
        let posting = Posting::new(
            TransactionKind::Buy,
            format!("Investment in {}", strategy.name),
        )
        .with_strategy(strategy_id)
        .with_position(position.id);

        let outcome = session.debit(amount, posting, Some(position.clone())).await?;
        let position = Position {
            start_date: outcome.transaction.created_at,
            settled_seq: outcome.transaction.seq,
            ..position
        };

        info!(
            account_id = %account_id,
            position_id = %position.id,
            strategy = %strategy.name,
            %amount,
            "Position opened"
        );
        Ok((position, outcome.transaction))
    }

    /// Active positions of one account joined with strategy details
    pub async fn positions(&self, account_id: AccountId) -> CoreResult<Vec<PositionView>> {
        let positions = self.active_positions(Some(account_id), None).await?;

        let mut strategies = HashMap::new();
        let mut views = Vec::with_capacity(positions.len());
        for p in positions {
            if !strategies.contains_key(&p.strategy_id) {
                let strategy = self.strategies.get_any(p.strategy_id).await?;
                strategies.insert(p.strategy_id, strategy);
            }
            let Some(Some(strategy)) = strategies.get(&p.strategy_id) else {
                continue;
            };
            views.push(PositionView {
                id: p.id,
                strategy_id: p.strategy_id,
                strategy_name: strategy.name.clone(),
                category: strategy.category,
                monthly_return: strategy.monthly_return,
                invested_amount: p.invested_amount,
                profit_loss: p.profit_loss,
                is_active: p.is_active,
                start_date: p.start_date,
            });
        }
        Ok(views)
    }

    /// Active positions filtered by owner and/or strategy
    pub async fn active_positions(
        &self,
        account_id: Option<AccountId>,
        strategy_id: Option<StrategyId>,
    ) -> CoreResult<Vec<Position>> {
        let mut filter = Filter::new().eq("is_active", true);
        if let Some(id) = account_id {
            filter = filter.eq("account_id", id.to_string());
        }
        if let Some(id) = strategy_id {
            filter = filter.eq("strategy_id", id.to_string());
        }
        let docs = self
            .store
            .find(collections::POSITIONS, &filter, None, None)
            .await?;
        Ok(from_documents(docs)?)
    }
}
