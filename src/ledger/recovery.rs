//! Startup resolution of pending ledger entries.
//!
//! A pending entry whose seq is covered by the account's `ledger_version`
//! landed: its position side write is replayed if missing and the entry is
//! committed. Anything else never reached the account and is deleted.

use tracing::{info, warn};

use super::models::{PositionWrite, Transaction, TransactionKind};
use super::service::Ledger;
use crate::account::Account;
use crate::error::CoreResult;
use crate::investment::Position;
use crate::store::{Filter, collections, from_document, from_documents};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub committed: usize,
    pub discarded: usize,
    pub positions_repaired: usize,
}

impl Ledger {
    pub async fn recover(&self) -> CoreResult<RecoveryReport> {
        let docs = self
            .store
            .find(
                collections::TRANSACTIONS,
                &Filter::new().eq("status", "pending"),
                None,
                None,
            )
            .await?;
        let pending: Vec<Transaction> = from_documents(docs)?;

        let mut report = RecoveryReport::default();
        for mut txn in pending {
            let _guard = self
                .locks()
                .lock(&crate::store::locks::account_key(&txn.account_id))
                .await;

            let account: Option<Account> = match self
                .store
                .get(collections::ACCOUNTS, &txn.account_id.to_string())
                .await?
            {
                Some(doc) => Some(from_document(doc)?),
                None => None,
            };

            match account {
                Some(account) if account.ledger_version >= txn.seq => {
                    if self.repair_position(&txn).await? {
                        report.positions_repaired += 1;
                    }
                    self.commit(&mut txn).await;
                    report.committed += 1;
                }
                _ => {
                    warn!(txn_id = %txn.id, account_id = %txn.account_id, seq = txn.seq, "Discarding unapplied ledger entry");
                    self.discard_pending(&txn).await;
                    report.discarded += 1;
                }
            }
        }

        if report != RecoveryReport::default() {
            info!(
                committed = report.committed,
                discarded = report.discarded,
                positions_repaired = report.positions_repaired,
                "Ledger recovery complete"
            );
        }
        Ok(report)
    }

    /// Replay the position side of a landed entry. Returns whether anything was written.
    async fn repair_position(&self, txn: &Transaction) -> CoreResult<bool> {
        let Some(position_id) = txn.position_id else {
            return Ok(false);
        };
        let existing: Option<Position> = match self
            .store
            .get(collections::POSITIONS, &position_id.to_string())
            .await?
        {
            Some(doc) => Some(from_document(doc)?),
            None => None,
        };

        match (txn.kind, existing) {
            (TransactionKind::Buy, None) => {
                let Some(strategy_id) = txn.strategy_id else {
                    warn!(txn_id = %txn.id, "Buy entry without strategy, position not rebuilt");
                    return Ok(false);
                };
                let position = Position {
                    id: position_id,
                    account_id: txn.account_id,
                    strategy_id,
                    invested_amount: -txn.amount,
                    profit_loss: rust_decimal::Decimal::ZERO,
                    is_active: true,
                    start_date: txn.created_at,
                    settled_seq: txn.seq,
                };
                self.write_position(PositionWrite::Open(position), txn.seq)
                    .await?;
                Ok(true)
            }
            (TransactionKind::Profit | TransactionKind::Loss, Some(position))
                if position.settled_seq < txn.seq =>
            {
                self.write_position(
                    PositionWrite::Settle {
                        position_id,
                        delta: txn.amount,
                    },
                    txn.seq,
                )
                .await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
