//! Reward / Bonus Issuer
//!
//! Task-pool grants: registration bonus, once-per-UTC-day login bonus and
//! one grant per watched ad.

use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::account::{Account, AccountDraft, Pool};
use crate::core_types::AccountId;
use crate::error::{CoreError, CoreResult};
use crate::ledger::{Ledger, Posting, Transaction, TransactionKind};

pub struct RewardIssuer {
    ledger: Arc<Ledger>,
}

impl RewardIssuer {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Create an account credited with the registration bonus
    pub async fn open_account(&self, draft: AccountDraft) -> CoreResult<(Account, Transaction)> {
        let bonus = self.ledger.config().registration_bonus;
        self.ledger.create_account(draft, bonus).await
    }

    /// Grant the daily bonus unless one was already granted on today's UTC date
    pub async fn daily_login(&self, account_id: AccountId) -> CoreResult<Option<Transaction>> {
        let mut session = self.ledger.open(account_id).await?;
        let today = self.ledger.clock().now().date_naive();
        if session
            .account()
            .last_daily_login
            .is_some_and(|last| last.date_naive() == today)
        {
            return Ok(None);
        }

        let amount = self.ledger.config().daily_login_bonus;
        let txn = session
            .credit_daily_login(amount, Posting::new(TransactionKind::DailyLogin, "Daily login bonus"))
            .await?;
        info!(%account_id, %amount, "Daily login bonus granted");
        Ok(Some(txn))
    }

    /// Grant the ad-view bonus once per external transaction id
    pub async fn ad_view(
        &self,
        account_id: AccountId,
        external_id: &str,
        ad_unit_id: Option<&str>,
    ) -> CoreResult<Transaction> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Err(CoreError::InvalidInput("transaction_id is required".into()));
        }

        let mut session = self.ledger.open(account_id).await?;
        if !self
            .ledger
            .find_by_detail(account_id, "transaction_id", external_id)
            .await?
            .is_empty()
        {
            return Err(CoreError::DuplicateClaim(external_id.to_string()));
        }

        let amount = self.ledger.config().video_ad_bonus;
        let posting = Posting::new(TransactionKind::VideoAd, "Video ad reward").with_details(json!({
            "transaction_id": external_id,
            "ad_unit_id": ad_unit_id,
        }));
        let txn = session.credit(Pool::Task, amount, posting).await?;
        info!(%account_id, external_id, %amount, "Ad reward granted");
        Ok(txn)
    }
}
