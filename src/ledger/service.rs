//! Balance ledger
//!
//! The only writer of account balances. Each mutation runs while holding the
//! account's lock and follows the same four steps:
//!
//! 1. append the transaction as `pending` with `seq = ledger_version + 1`
//! 2. rewrite the ledger fields and `ledger_version` in one record update
//! 3. write the position side effect, if any
//! 4. flip the transaction to `committed`
//!
//! A crash between steps leaves a pending entry that [`Ledger::recover`]
//! resolves by comparing its seq with the account's version.

use rust_decimal::Decimal;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::models::{DebitOutcome, PositionWrite, Posting, Transaction, TransactionKind, TxnStatus};
use crate::account::{Account, AccountDraft, Pool, WalletSummary, normalize_email};
use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::core_types::{AccountId, Amount, PositionId, SeqNum};
use crate::error::{CoreError, CoreResult};
use crate::investment::Position;
use crate::store::locks::{KeyedGuard, account_key, email_key};
use crate::store::{
    DocumentStore, Filter, KeyedLocks, Sort, collections, from_document, from_documents,
    to_document, to_fields,
};

/// Target for the ledger audit stream
pub const LEDGER_TARGET: &str = "LEDGER";

pub struct Ledger {
    pub(super) store: Arc<dyn DocumentStore>,
    locks: Arc<KeyedLocks>,
    pub(super) clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        locks: Arc<KeyedLocks>,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            locks,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn locks(&self) -> &Arc<KeyedLocks> {
        &self.locks
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn account(&self, id: AccountId) -> CoreResult<Account> {
        self.load(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> CoreResult<Option<Account>> {
        let email = normalize_email(email)?;
        let docs = self
            .store
            .find(
                collections::ACCOUNTS,
                &Filter::new().eq("email", email),
                None,
                Some(1),
            )
            .await?;
        Ok(from_documents::<Account>(docs)?.into_iter().next())
    }

    pub async fn wallet(&self, id: AccountId) -> CoreResult<WalletSummary> {
        Ok(WalletSummary::from(&self.load(id).await?))
    }

    /// Committed entries, newest first, capped at `history_limit`
    pub async fn history(&self, id: AccountId) -> CoreResult<Vec<Transaction>> {
        let docs = self
            .store
            .find(
                collections::TRANSACTIONS,
                &Filter::new()
                    .eq("account_id", id.to_string())
                    .eq("status", "committed"),
                Some(&Sort::desc("seq")),
                Some(self.config.history_limit),
            )
            .await?;
        Ok(from_documents(docs)?)
    }

    /// Entries of one account whose `trade_details.{path}` equals `value`
    pub async fn find_by_detail(
        &self,
        id: AccountId,
        path: &str,
        value: &str,
    ) -> CoreResult<Vec<Transaction>> {
        let docs = self
            .store
            .find(
                collections::TRANSACTIONS,
                &Filter::new()
                    .eq("account_id", id.to_string())
                    .eq(&format!("trade_details.{}", path), value),
                None,
                None,
            )
            .await?;
        Ok(from_documents(docs)?)
    }

    async fn load(&self, id: AccountId) -> CoreResult<Account> {
        let doc = self
            .store
            .get(collections::ACCOUNTS, &id.to_string())
            .await?
            .ok_or_else(|| CoreError::not_found("Account"))?;
        Ok(from_document(doc)?)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Lock the account and load it; mutations go through the returned session
    pub async fn open(&self, id: AccountId) -> CoreResult<AccountSession<'_>> {
        let guard = self.locks.lock(&account_key(&id)).await;
        let account = self.load(id).await?;
        Ok(AccountSession {
            ledger: self,
            account,
            _guard: guard,
        })
    }

    /// Create an account together with its registration entry.
    ///
    /// `task_balance` starts at `bonus` and `virtual_balance` at the configured
    /// seed. Serialized per email, so two concurrent sign-ups cannot both pass
    /// the uniqueness check.
    pub async fn create_account(
        &self,
        draft: AccountDraft,
        bonus: Amount,
    ) -> CoreResult<(Account, Transaction)> {
        let email = normalize_email(&draft.email)?;
        let _email_guard = self.locks.lock(&email_key(&email)).await;

        if self.find_by_email(&email).await?.is_some() {
            return Err(CoreError::AlreadyExists(format!(
                "Account with email {}",
                email
            )));
        }

        let now = self.clock.now();
        let account = Account {
            id: uuid::Uuid::new_v4(),
            email,
            name: draft.name,
            phone_number: draft.phone_number,
            password_hash: draft.password_hash,
            role: draft.role,
            virtual_balance: self.config.default_virtual_seed,
            earnings_balance: Decimal::ZERO,
            task_balance: bonus,
            total_investment: Decimal::ZERO,
            external_id: draft.external_id,
            picture: draft.picture,
            is_active: true,
            email_verified: draft.email_verified,
            last_daily_login: None,
            last_login: None,
            created_at: now,
            ledger_version: 1,
        };
        let mut txn = Transaction {
            id: uuid::Uuid::new_v4(),
            account_id: account.id,
            strategy_id: None,
            position_id: None,
            kind: TransactionKind::Registration,
            amount: bonus,
            pool: Pool::Task,
            description: "Registration bonus".to_string(),
            trade_details: None,
            seq: 1,
            status: TxnStatus::Pending,
            created_at: now,
        };

        let _account_guard = self.locks.lock(&account_key(&account.id)).await;
        self.store
            .put(collections::TRANSACTIONS, &txn.id.to_string(), to_document(&txn)?)
            .await?;
        if let Err(e) = self
            .store
            .put(collections::ACCOUNTS, &account.id.to_string(), to_document(&account)?)
            .await
        {
            self.discard_pending(&txn).await;
            return Err(e.into());
        }
        self.commit(&mut txn).await;

        info!(account_id = %account.id, email = %account.email, "Account created");
        audit(&account, &txn);
        Ok((account, txn))
    }

    /// Overwrite non-ledger profile fields of an account
    pub async fn update_profile(&self, id: AccountId, fields: Map<String, Value>) -> CoreResult<()> {
        let _guard = self.locks.lock(&account_key(&id)).await;
        if !self
            .store
            .update_set(collections::ACCOUNTS, &id.to_string(), fields)
            .await?
        {
            return Err(CoreError::not_found("Account"));
        }
        Ok(())
    }

    pub async fn list_accounts(&self) -> CoreResult<Vec<Account>> {
        let docs = self
            .store
            .find(
                collections::ACCOUNTS,
                &Filter::new(),
                Some(&Sort::desc("created_at")),
                None,
            )
            .await?;
        Ok(from_documents(docs)?)
    }

    // ========================================================================
    // Apply protocol
    // ========================================================================

    async fn apply(
        &self,
        current: &Account,
        mut next: Account,
        txn: &mut Transaction,
        extra: Map<String, Value>,
        position: Option<PositionWrite>,
    ) -> CoreResult<Account> {
        let key = current.id.to_string();
        next.ledger_version = txn.seq;

        // 1. write-ahead
        self.store
            .put(collections::TRANSACTIONS, &txn.id.to_string(), to_document(&*txn)?)
            .await?;

        // 2. balances + version, one record
        let mut fields = to_fields(&next.ledger_fields())?;
        fields.extend(extra);
        match self.store.update_set(collections::ACCOUNTS, &key, fields).await {
            Ok(true) => {}
            Ok(false) => {
                self.discard_pending(txn).await;
                return Err(CoreError::not_found("Account"));
            }
            Err(e) => {
                // The write may still have landed; only the version can tell
                match self.load(current.id).await {
                    Ok(stored) if stored.ledger_version >= txn.seq => {
                        warn!(account_id = %current.id, seq = txn.seq, "Account update reported failure but landed");
                    }
                    Ok(_) => {
                        self.discard_pending(txn).await;
                        return Err(e.into());
                    }
                    Err(_) => return Err(e.into()),
                }
            }
        }

        // 3. position side write, retried once; past that the entry stays
        // pending and recovery replays it
        if let Some(write) = position {
            if let Err(first) = self.write_position(write.clone(), txn.seq).await {
                warn!(txn_id = %txn.id, seq = txn.seq, error = %first, "Position write failed, retrying");
                if let Err(e) = self.write_position(write, txn.seq).await {
                    error!(txn_id = %txn.id, account_id = %current.id, seq = txn.seq, error = %e, "Position write left to recovery");
                    return Err(CoreError::PendingRecovery(format!(
                        "position update for entry {}",
                        txn.id
                    )));
                }
            }
        }

        // 4. commit
        self.commit(txn).await;
        audit(&next, txn);
        Ok(next)
    }

    pub(super) async fn write_position(&self, write: PositionWrite, seq: SeqNum) -> CoreResult<()> {
        match write {
            PositionWrite::Open(mut position) => {
                position.settled_seq = seq;
                self.store
                    .put(
                        collections::POSITIONS,
                        &position.id.to_string(),
                        to_document(&position)?,
                    )
                    .await?;
            }
            PositionWrite::Settle { position_id, delta } => {
                let doc = self
                    .store
                    .get(collections::POSITIONS, &position_id.to_string())
                    .await?
                    .ok_or_else(|| CoreError::not_found("Position"))?;
                let position: Position = from_document(doc)?;
                if position.settled_seq >= seq {
                    return Ok(());
                }
                let mut fields = Map::new();
                let profit_loss = checked_add(position.profit_loss, delta, "profit_loss")?;
                fields.insert("profit_loss".into(), to_document(&profit_loss)?);
                fields.insert("settled_seq".into(), json!(seq));
                self.store
                    .update_set(collections::POSITIONS, &position_id.to_string(), fields)
                    .await?;
            }
        }
        Ok(())
    }

    pub(super) async fn commit(&self, txn: &mut Transaction) {
        let mut fields = Map::new();
        fields.insert("status".into(), json!("committed"));
        match self
            .store
            .update_set(collections::TRANSACTIONS, &txn.id.to_string(), fields)
            .await
        {
            Ok(_) => txn.status = TxnStatus::Committed,
            Err(e) => {
                warn!(txn_id = %txn.id, error = %e, "Commit deferred to recovery");
            }
        }
    }

    pub(super) async fn discard_pending(&self, txn: &Transaction) {
        if let Err(e) = self
            .store
            .delete(collections::TRANSACTIONS, &txn.id.to_string())
            .await
        {
            warn!(txn_id = %txn.id, error = %e, "Failed to discard pending transaction");
        }
    }

    fn draft_txn(&self, account: &Account, amount: Amount, pool: Pool, posting: Posting) -> Transaction {
        Transaction {
            id: uuid::Uuid::new_v4(),
            account_id: account.id,
            strategy_id: posting.strategy_id,
            position_id: posting.position_id,
            kind: posting.kind,
            amount,
            pool,
            description: posting.description,
            trade_details: posting.trade_details,
            seq: account.ledger_version + 1,
            status: TxnStatus::Pending,
            created_at: self.clock.now(),
        }
    }
}

fn audit(account: &Account, txn: &Transaction) {
    info!(
        target: LEDGER_TARGET,
        account_id = %account.id,
        seq = txn.seq,
        kind = ?txn.kind,
        pool = txn.pool.as_str(),
        amount = %txn.amount,
        virtual_balance = %account.virtual_balance,
        earnings_balance = %account.earnings_balance,
        task_balance = %account.task_balance,
        "posted"
    );
}

/// Addition that reports overflow instead of panicking
pub(crate) fn checked_add(current: Amount, delta: Amount, what: &str) -> CoreResult<Amount> {
    current.checked_add(delta).ok_or_else(|| {
        CoreError::InvalidInput(format!("{} out of range: {} + {}", what, current, delta))
    })
}

fn ensure_positive(amount: Amount) -> CoreResult<()> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::InvalidInput(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

// ============================================================================
// AccountSession
// ============================================================================

/// A locked account. Every mutation appends exactly one transaction.
///
/// The lock is released on drop, so callers can make decisions against
/// `account()` and act on them without a race.
pub struct AccountSession<'a> {
    ledger: &'a Ledger,
    account: Account,
    _guard: KeyedGuard,
}

impl AccountSession<'_> {
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Add `amount` (possibly negative) to one pool
    pub async fn credit(
        &mut self,
        pool: Pool,
        amount: Amount,
        posting: Posting,
    ) -> CoreResult<Transaction> {
        self.credit_inner(pool, amount, posting, Map::new(), None).await
    }

    /// Credit that also folds `delta` into a position's profit/loss
    pub async fn credit_settlement(
        &mut self,
        amount: Amount,
        posting: Posting,
        position_id: PositionId,
    ) -> CoreResult<Transaction> {
        let write = PositionWrite::Settle {
            position_id,
            delta: amount,
        };
        let posting = posting.with_position(position_id);
        self.credit_inner(Pool::Earnings, amount, posting, Map::new(), Some(write))
            .await
    }

    /// Task-pool credit that stamps `last_daily_login` in the same record update
    pub async fn credit_daily_login(
        &mut self,
        amount: Amount,
        posting: Posting,
    ) -> CoreResult<Transaction> {
        let now = self.ledger.clock.now();
        let mut extra = Map::new();
        extra.insert("last_daily_login".into(), json!(now.timestamp_millis()));
        let txn = self
            .credit_inner(Pool::Task, amount, posting, extra, None)
            .await?;
        self.account.last_daily_login = Some(now);
        Ok(txn)
    }

    async fn credit_inner(
        &mut self,
        pool: Pool,
        amount: Amount,
        posting: Posting,
        extra: Map<String, Value>,
        position: Option<PositionWrite>,
    ) -> CoreResult<Transaction> {
        let mut next = self.account.clone();
        let balance = next.balance_mut(pool);
        *balance = checked_add(*balance, amount, pool.as_str())?;

        let mut txn = self.ledger.draft_txn(&self.account, amount, pool, posting);
        self.account = self
            .ledger
            .apply(&self.account, next, &mut txn, extra, position)
            .await?;
        Ok(txn)
    }

    /// Investment spend: earnings first, then virtual.
    ///
    /// Negative earnings are never "used"; the whole amount then comes from
    /// virtual, which the funds check guarantees stays non-negative.
    pub async fn debit(
        &mut self,
        amount: Amount,
        posting: Posting,
        position: Option<Position>,
    ) -> CoreResult<DebitOutcome> {
        ensure_positive(amount)?;
        if self.account.investable() < amount {
            return Err(CoreError::InsufficientFunds);
        }

        let earnings_used = self.account.earnings_balance.min(amount).max(Decimal::ZERO);
        let virtual_used = amount - earnings_used;
        let pool = if earnings_used > Decimal::ZERO {
            Pool::Earnings
        } else {
            Pool::Virtual
        };

        let mut next = self.account.clone();
        next.earnings_balance -= earnings_used;
        next.virtual_balance -= virtual_used;
        next.total_investment = checked_add(next.total_investment, amount, "total_investment")?;

        let mut txn = self.ledger.draft_txn(&self.account, -amount, pool, posting);
        let position = position.map(|p| {
            PositionWrite::Open(Position {
                start_date: txn.created_at,
                ..p
            })
        });
        self.account = self
            .ledger
            .apply(&self.account, next, &mut txn, Map::new(), position)
            .await?;

        debug!(account_id = %self.account.id, %earnings_used, %virtual_used, "Debit split");
        Ok(DebitOutcome {
            earnings_used,
            virtual_used,
            transaction: txn,
        })
    }

    /// Spend from earnings only (coupon redemption)
    pub async fn debit_earnings_only(
        &mut self,
        amount: Amount,
        posting: Posting,
    ) -> CoreResult<Transaction> {
        ensure_positive(amount)?;
        if self.account.earnings_balance < amount {
            return Err(CoreError::InsufficientFunds);
        }

        let mut next = self.account.clone();
        next.earnings_balance -= amount;

        let mut txn = self
            .ledger
            .draft_txn(&self.account, -amount, Pool::Earnings, posting);
        self.account = self
            .ledger
            .apply(&self.account, next, &mut txn, Map::new(), None)
            .await?;
        Ok(txn)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    pub(crate) fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    pub(crate) fn ledger_with(store: Arc<dyn DocumentStore>) -> (Ledger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let ledger = Ledger::new(
            store,
            Arc::new(KeyedLocks::new()),
            clock.clone(),
            LedgerConfig::default(),
        );
        (ledger, clock)
    }

    fn draft(email: &str) -> AccountDraft {
        AccountDraft {
            email: email.into(),
            name: "Test".into(),
            email_verified: true,
            ..Default::default()
        }
    }

    /// Sets balances directly, bypassing the ledger
    pub(crate) async fn set_balances(
        store: &dyn DocumentStore,
        id: AccountId,
        virtual_balance: &str,
        earnings: &str,
    ) {
        let mut fields = Map::new();
        fields.insert("virtual_balance".into(), json!(virtual_balance));
        fields.insert("earnings_balance".into(), json!(earnings));
        store
            .update_set(collections::ACCOUNTS, &id.to_string(), fields)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_account_with_registration_entry() {
        let (ledger, _) = ledger_with(Arc::new(MemoryStore::new()));
        let (account, txn) = ledger
            .create_account(draft("Alice@Example.com"), d("10000"))
            .await
            .unwrap();

        assert_eq!(account.email, "alice@example.com");
        assert_eq!(account.task_balance, d("10000"));
        assert_eq!(account.virtual_balance, d("10000"));
        assert_eq!(account.ledger_version, 1);
        assert_eq!(txn.kind, TransactionKind::Registration);
        assert_eq!(txn.amount, d("10000"));
        assert!(txn.is_committed());

        let wallet = ledger.wallet(account.id).await.unwrap();
        assert_eq!(wallet.task_balance, d("10000"));
        let history = ledger.history(account.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].amount, wallet.task_balance);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (ledger, _) = ledger_with(Arc::new(MemoryStore::new()));
        ledger.create_account(draft("a@b.io"), d("1")).await.unwrap();
        let err = ledger
            .create_account(draft("A@B.io"), d("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_debit_uses_earnings_first() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let (ledger, _) = ledger_with(store.clone());
        let (account, _) = ledger.create_account(draft("e@f.io"), d("0")).await.unwrap();
        set_balances(store.as_ref(), account.id, "100", "30").await;

        let mut session = ledger.open(account.id).await.unwrap();
        let outcome = session
            .debit(d("50"), Posting::new(TransactionKind::Buy, "Invest"), None)
            .await
            .unwrap();

        assert_eq!(outcome.earnings_used, d("30"));
        assert_eq!(outcome.virtual_used, d("20"));
        assert_eq!(outcome.transaction.amount, d("-50"));
        assert_eq!(outcome.transaction.pool, Pool::Earnings);
        assert_eq!(session.account().earnings_balance, d("0"));
        assert_eq!(session.account().virtual_balance, d("80"));
        assert_eq!(session.account().total_investment, d("50"));
        drop(session);

        let stored = ledger.account(account.id).await.unwrap();
        assert_eq!(stored.virtual_balance, d("80"));
        assert_eq!(stored.ledger_version, 2);
    }

    #[tokio::test]
    async fn test_debit_with_negative_earnings_draws_virtual() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let (ledger, _) = ledger_with(store.clone());
        let (account, _) = ledger.create_account(draft("n@f.io"), d("0")).await.unwrap();
        set_balances(store.as_ref(), account.id, "100", "-20").await;

        let mut session = ledger.open(account.id).await.unwrap();
        let outcome = session
            .debit(d("80"), Posting::new(TransactionKind::Buy, "Invest"), None)
            .await
            .unwrap();
        assert_eq!(outcome.earnings_used, d("0"));
        assert_eq!(outcome.transaction.pool, Pool::Virtual);
        assert_eq!(session.account().virtual_balance, d("20"));
        assert_eq!(session.account().earnings_balance, d("-20"));

        // 20 + (-20) = 0 left to invest
        let err = session
            .debit(d("1"), Posting::new(TransactionKind::Buy, "Invest"), None)
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::InsufficientFunds);
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_no_trace() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let (ledger, _) = ledger_with(store.clone());
        let (account, _) = ledger.create_account(draft("i@f.io"), d("0")).await.unwrap();
        set_balances(store.as_ref(), account.id, "10", "5").await;

        let mut session = ledger.open(account.id).await.unwrap();
        let err = session
            .debit(d("16"), Posting::new(TransactionKind::Buy, "Invest"), None)
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::InsufficientFunds);
        let err = session
            .debit(d("0"), Posting::new(TransactionKind::Buy, "Invest"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        drop(session);

        assert_eq!(ledger.history(account.id).await.unwrap().len(), 1);
        assert_eq!(ledger.account(account.id).await.unwrap().ledger_version, 1);
    }

    #[tokio::test]
    async fn test_debit_earnings_only() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let (ledger, _) = ledger_with(store.clone());
        let (account, _) = ledger.create_account(draft("c@f.io"), d("0")).await.unwrap();
        set_balances(store.as_ref(), account.id, "10000", "40").await;

        let mut session = ledger.open(account.id).await.unwrap();
        let err = session
            .debit_earnings_only(d("50"), Posting::new(TransactionKind::CouponRedemption, "c"))
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::InsufficientFunds);

        let txn = session
            .debit_earnings_only(d("40"), Posting::new(TransactionKind::CouponRedemption, "c"))
            .await
            .unwrap();
        assert_eq!(txn.pool, Pool::Earnings);
        assert_eq!(session.account().earnings_balance, d("0"));
        assert_eq!(session.account().virtual_balance, d("10000"));
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let (ledger, clock) = ledger_with(Arc::new(MemoryStore::new()));
        let (account, _) = ledger.create_account(draft("h@f.io"), d("5")).await.unwrap();

        let mut session = ledger.open(account.id).await.unwrap();
        for i in 1..=3 {
            clock.advance(chrono::Duration::seconds(1));
            session
                .credit(
                    Pool::Task,
                    Decimal::from(i),
                    Posting::new(TransactionKind::Deposit, format!("deposit {}", i)),
                )
                .await
                .unwrap();
        }
        drop(session);

        let history = ledger.history(account.id).await.unwrap();
        let seqs: Vec<_> = history.iter().map(|t| t.seq).collect();
        assert_eq!(seqs, vec![4, 3, 2, 1]);
        assert_eq!(ledger.wallet(account.id).await.unwrap().task_balance, d("11"));
    }

    #[tokio::test]
    async fn test_concurrent_credits_are_serialized() {
        let (ledger, _) = ledger_with(Arc::new(MemoryStore::new()));
        let ledger = Arc::new(ledger);
        let (account, _) = ledger.create_account(draft("x@f.io"), d("0")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                let mut session = ledger.open(account.id).await.unwrap();
                session
                    .credit(Pool::Earnings, d("1.5"), Posting::new(TransactionKind::Profit, "p"))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let stored = ledger.account(account.id).await.unwrap();
        assert_eq!(stored.earnings_balance, d("30"));
        assert_eq!(stored.ledger_version, 21);
        assert_eq!(ledger.history(account.id).await.unwrap().len(), 21);
    }

    #[tokio::test]
    async fn test_credit_out_of_range_is_rejected() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let (ledger, _) = ledger_with(store.clone());
        let (account, _) = ledger.create_account(draft("max@f.io"), d("0")).await.unwrap();
        set_balances(store.as_ref(), account.id, "0", &Decimal::MAX.to_string()).await;

        let mut session = ledger.open(account.id).await.unwrap();
        let err = session
            .credit(Pool::Earnings, d("1"), Posting::new(TransactionKind::Profit, "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        drop(session);

        let stored = ledger.account(account.id).await.unwrap();
        assert_eq!(stored.earnings_balance, Decimal::MAX);
        assert_eq!(stored.ledger_version, 1);
        assert_eq!(ledger.history(account.id).await.unwrap().len(), 1);
    }
}
