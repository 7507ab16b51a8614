use futures::StreamExt;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::tabular::{SettlementRow, TabularFormat};
use crate::core_types::PositionId;
use crate::error::{CoreError, CoreResult};
use crate::investment::{InvestmentTracker, Position};
use crate::ledger::{Ledger, Posting, Transaction, TransactionKind};
use crate::strategy::{Strategy, StrategyCatalog};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SettlementFailure {
    /// 1-based data row
    pub row: usize,
    #[schema(value_type = Option<uuid::Uuid>)]
    pub position_id: Option<PositionId>,
    pub reason: String,
    /// Earnings were credited; only the position record lags until recovery
    pub balance_applied: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct SettlementReport {
    pub rows_total: usize,
    /// Rows naming no known strategy
    pub rows_skipped: usize,
    /// Position updates applied (not rows)
    pub positions_updated: usize,
    pub failures: Vec<SettlementFailure>,
}

pub struct SettlementProcessor {
    ledger: Arc<Ledger>,
    strategies: Arc<StrategyCatalog>,
    investments: Arc<InvestmentTracker>,
    concurrency: usize,
}

impl SettlementProcessor {
    pub fn new(
        ledger: Arc<Ledger>,
        strategies: Arc<StrategyCatalog>,
        investments: Arc<InvestmentTracker>,
        concurrency: usize,
    ) -> Self {
        Self {
            ledger,
            strategies,
            investments,
            concurrency: concurrency.max(1),
        }
    }

    /// Parse an uploaded file, then apply it
    pub async fn process_upload(&self, filename: &str, bytes: &[u8]) -> CoreResult<SettlementReport> {
        let rows = TabularFormat::from_filename(filename)?.parser().parse(bytes)?;
        info!(filename, rows = rows.len(), "Settlement upload parsed");
        self.process(rows).await
    }

    /// Apply rows in order. Best effort: one failed position does not stop
    /// the rest of the batch.
    pub async fn process(&self, rows: Vec<SettlementRow>) -> CoreResult<SettlementReport> {
        let mut report = SettlementReport {
            rows_total: rows.len(),
            ..Default::default()
        };

        for (i, row) in rows.iter().enumerate() {
            let row_no = i + 1;
            let Some(strategy) = self.strategies.find_by_name(&row.strategy_name).await? else {
                debug!(row = row_no, strategy = %row.strategy_name, "Unknown strategy, row skipped");
                report.rows_skipped += 1;
                continue;
            };

            let positions = self
                .investments
                .active_positions(None, Some(strategy.id))
                .await?;
            let results: Vec<_> = futures::stream::iter(positions)
                .map(|position| {
                    let strategy = &strategy;
                    async move {
                        let id = position.id;
                        (id, self.settle_position(row, strategy, position).await)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            for (position_id, result) in results {
                match result {
                    Ok(_) => report.positions_updated += 1,
                    Err(e) => {
                        warn!(row = row_no, %position_id, error = %e, "Position settlement failed");
                        report.failures.push(SettlementFailure {
                            row: row_no,
                            position_id: Some(position_id),
                            balance_applied: matches!(e, CoreError::PendingRecovery(_)),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            rows = report.rows_total,
            skipped = report.rows_skipped,
            updated = report.positions_updated,
            failed = report.failures.len(),
            "Settlement batch complete"
        );
        Ok(report)
    }

    async fn settle_position(
        &self,
        row: &SettlementRow,
        strategy: &Strategy,
        position: Position,
    ) -> CoreResult<Transaction> {
        let delta = position
            .invested_amount
            .checked_mul(row.profit_loss_percentage)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(|| {
                CoreError::InvalidInput(format!(
                    "{}% of {} is out of range",
                    row.profit_loss_percentage, position.invested_amount
                ))
            })?;
        let kind = if delta >= Decimal::ZERO {
            TransactionKind::Profit
        } else {
            TransactionKind::Loss
        };
        let details = json!({
            "date": row.date,
            "transaction_type": row.transaction_type,
            "profit_loss_percentage": row.profit_loss_percentage.to_string(),
            "trade_details": row.trade_details,
        });
        let posting = Posting::new(
            kind,
            format!("{} {}% on {}", strategy.name, row.profit_loss_percentage, row.date),
        )
        .with_strategy(strategy.id)
        .with_details(details);

        let mut session = self.ledger.open(position.account_id).await?;
        session.credit_settlement(delta, posting, position.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountDraft, Pool};
    use crate::clock::SystemClock;
    use crate::core_types::AccountId;
    use crate::ledger::service::tests::{d, ledger_with};
    use crate::store::testing::FlakyStore;
    use crate::store::{DocumentStore, MemoryStore, collections};
    use crate::strategy::tests::new_strategy;

    struct Fixture {
        ledger: Arc<Ledger>,
        strategies: Arc<StrategyCatalog>,
        investments: Arc<InvestmentTracker>,
        processor: SettlementProcessor,
    }

    fn fixture() -> Fixture {
        fixture_on(Arc::new(MemoryStore::new()))
    }

    fn fixture_on(store: Arc<dyn DocumentStore>) -> Fixture {
        let (ledger, _) = ledger_with(store.clone());
        let ledger = Arc::new(ledger);
        let strategies = Arc::new(StrategyCatalog::new(store.clone(), Arc::new(SystemClock)));
        let investments = Arc::new(InvestmentTracker::new(
            store,
            ledger.clone(),
            strategies.clone(),
        ));
        let processor =
            SettlementProcessor::new(ledger.clone(), strategies.clone(), investments.clone(), 4);
        Fixture {
            ledger,
            strategies,
            investments,
            processor,
        }
    }

    async fn account(f: &Fixture, email: &str) -> AccountId {
        let draft = AccountDraft {
            email: email.into(),
            name: "S".into(),
            ..Default::default()
        };
        f.ledger.create_account(draft, d("0")).await.unwrap().0.id
    }

    fn row(strategy: &str, pct: &str) -> SettlementRow {
        SettlementRow {
            date: "2026-03-01".into(),
            transaction_type: "SELL".into(),
            strategy_name: strategy.into(),
            trade_details: "EURUSD".into(),
            profit_loss_percentage: d(pct),
        }
    }

    #[tokio::test]
    async fn test_loss_row_and_unknown_strategy() {
        let f = fixture();
        let id = account(&f, "s1@example.com").await;
        let strategy = f.strategies.create(new_strategy("Alpha", 100)).await.unwrap();
        let (position, _) = f.investments.open(id, strategy.id, d("1000")).await.unwrap();

        let report = f
            .processor
            .process(vec![row("Alpha", "-10"), row("Nope", "50")])
            .await
            .unwrap();
        assert_eq!(report.rows_total, 2);
        assert_eq!(report.rows_skipped, 1);
        assert_eq!(report.positions_updated, 1);
        assert!(report.failures.is_empty());

        let wallet = f.ledger.wallet(id).await.unwrap();
        assert_eq!(wallet.earnings_balance, d("-100"));

        let losses: Vec<_> = f
            .ledger
            .history(id)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.kind == TransactionKind::Loss)
            .collect();
        assert_eq!(losses.len(), 1);
        assert_eq!(losses[0].amount, d("-100"));
        assert_eq!(losses[0].pool, Pool::Earnings);
        assert_eq!(losses[0].position_id, Some(position.id));
        let details = losses[0].trade_details.as_ref().unwrap();
        assert_eq!(details["transaction_type"], "SELL");
        assert_eq!(details["profit_loss_percentage"], "-10");

        let views = f.investments.positions(id).await.unwrap();
        assert_eq!(views[0].profit_loss, d("-100"));
    }

    #[tokio::test]
    async fn test_counts_positions_not_rows() {
        let f = fixture();
        let a = account(&f, "a@example.com").await;
        let b = account(&f, "b@example.com").await;
        let strategy = f.strategies.create(new_strategy("Alpha", 10)).await.unwrap();
        f.investments.open(a, strategy.id, d("100")).await.unwrap();
        f.investments.open(a, strategy.id, d("200")).await.unwrap();
        f.investments.open(b, strategy.id, d("400")).await.unwrap();

        let report = f
            .processor
            .process(vec![row("Alpha", "5"), row("Alpha", "5")])
            .await
            .unwrap();
        assert_eq!(report.positions_updated, 6);

        assert_eq!(f.ledger.wallet(a).await.unwrap().earnings_balance, d("30"));
        assert_eq!(f.ledger.wallet(b).await.unwrap().earnings_balance, d("40"));
        let profit = f
            .ledger
            .history(a)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.kind == TransactionKind::Profit)
            .count();
        assert_eq!(profit, 4);
    }

    #[tokio::test]
    async fn test_inactive_strategy_still_settles() {
        let f = fixture();
        let id = account(&f, "i@example.com").await;
        let strategy = f.strategies.create(new_strategy("Alpha", 10)).await.unwrap();
        f.investments.open(id, strategy.id, d("100")).await.unwrap();
        f.strategies.deactivate(strategy.id).await.unwrap();

        let report = f.processor.process(vec![row("Alpha", "1")]).await.unwrap();
        assert_eq!(report.positions_updated, 1);
        assert_eq!(f.ledger.wallet(id).await.unwrap().earnings_balance, d("1"));
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_file_before_applying() {
        let f = fixture();
        let id = account(&f, "u@example.com").await;
        let strategy = f.strategies.create(new_strategy("Alpha", 10)).await.unwrap();
        f.investments.open(id, strategy.id, d("100")).await.unwrap();

        let csv = "Date,TransactionType,StrategyName,TradeDetails,ProfitLossPercentage\n\
                   2026-03-01,SELL,Alpha,x,10\n\
                   2026-03-02,SELL,Alpha,x,oops\n";
        assert!(f.processor.process_upload("r.csv", csv.as_bytes()).await.is_err());
        assert_eq!(f.ledger.wallet(id).await.unwrap().earnings_balance, d("0"));

        let csv = "Date,TransactionType,StrategyName,TradeDetails,ProfitLossPercentage\n\
                   2026-03-01,SELL,Alpha,x,10\n";
        let report = f.processor.process_upload("r.csv", csv.as_bytes()).await.unwrap();
        assert_eq!(report.positions_updated, 1);
        assert_eq!(f.ledger.wallet(id).await.unwrap().earnings_balance, d("10"));
    }

    #[tokio::test]
    async fn test_out_of_range_percentage_fails_one_position_only() {
        let f = fixture();
        let id = account(&f, "big@example.com").await;
        let strategy = f.strategies.create(new_strategy("Alpha", 10)).await.unwrap();
        let (position, _) = f.investments.open(id, strategy.id, d("1000")).await.unwrap();

        let huge = SettlementRow {
            profit_loss_percentage: Decimal::from_scientific("1e27").unwrap(),
            ..row("Alpha", "0")
        };
        let report = f
            .processor
            .process(vec![huge, row("Alpha", "10")])
            .await
            .unwrap();

        assert_eq!(report.positions_updated, 1);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.row, 1);
        assert_eq!(failure.position_id, Some(position.id));
        assert!(!failure.balance_applied);
        assert!(failure.reason.contains("out of range"));

        assert_eq!(f.ledger.wallet(id).await.unwrap().earnings_balance, d("100"));
    }

    #[tokio::test]
    async fn test_position_write_failure_reports_applied_balance() {
        let store = Arc::new(FlakyStore::new(collections::POSITIONS));
        let f = fixture_on(store.clone());
        let id = account(&f, "lag@example.com").await;
        let strategy = f.strategies.create(new_strategy("Alpha", 10)).await.unwrap();
        let (position, _) = f.investments.open(id, strategy.id, d("200")).await.unwrap();

        store.fail_always();
        let report = f.processor.process(vec![row("Alpha", "5")]).await.unwrap();
        assert_eq!(report.positions_updated, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].balance_applied);
        assert_eq!(f.ledger.wallet(id).await.unwrap().earnings_balance, d("10"));

        store.heal();
        let recovered = f.ledger.recover().await.unwrap();
        assert_eq!(recovered.committed, 1);
        assert_eq!(recovered.positions_repaired, 1);
        let views = f.investments.positions(id).await.unwrap();
        assert_eq!(views[0].id, position.id);
        assert_eq!(views[0].profit_loss, d("10"));
    }

    #[tokio::test]
    async fn test_xlsx_upload_settles() {
        let f = fixture();
        let id = account(&f, "sheet@example.com").await;
        let strategy = f.strategies.create(new_strategy("Alpha", 10)).await.unwrap();
        f.investments.open(id, strategy.id, d("1000")).await.unwrap();

        let report = f
            .processor
            .process_upload(
                "march.xlsx",
                include_bytes!("../../tests/fixtures/settlement.xlsx"),
            )
            .await
            .unwrap();
        assert_eq!(report.rows_total, 3);
        assert_eq!(report.rows_skipped, 1);
        assert_eq!(report.positions_updated, 2);
        // -10% then +1.5% of 1000
        assert_eq!(f.ledger.wallet(id).await.unwrap().earnings_balance, d("-85"));
    }

    #[tokio::test]
    async fn test_bad_xlsx_upload_applies_nothing() {
        let f = fixture();
        let id = account(&f, "badsheet@example.com").await;
        let strategy = f.strategies.create(new_strategy("Alpha", 10)).await.unwrap();
        f.investments.open(id, strategy.id, d("1000")).await.unwrap();

        let err = f
            .processor
            .process_upload(
                "march.xlsx",
                include_bytes!("../../tests/fixtures/settlement_bad_percentage.xlsx"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SchemaMismatch(_)));
        assert_eq!(f.ledger.wallet(id).await.unwrap().earnings_balance, d("0"));
    }
}
