//! Coupon Redemption Engine
//!
//! OTP check, earnings debit and redemption record as one logical unit.
//! Failures after the OTP claim are compensated: a failed debit releases the
//! claim; a failed record write reverses the debit and releases the claim.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::catalog::CouponCatalog;
use super::models::CouponRedemption;
use crate::account::{Pool, normalize_email};
use crate::clock::Clock;
use crate::core_types::{AccountId, CouponId, SessionId};
use crate::error::{CoreError, CoreResult};
use crate::ledger::{Ledger, Posting, TransactionKind};
use crate::otp::{OtpGate, OtpPurpose};
use crate::store::{DocumentStore, collections, to_document};

pub struct RedemptionEngine {
    store: Arc<dyn DocumentStore>,
    ledger: Arc<Ledger>,
    coupons: Arc<CouponCatalog>,
    otp: Arc<OtpGate>,
    clock: Arc<dyn Clock>,
}

impl RedemptionEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        ledger: Arc<Ledger>,
        coupons: Arc<CouponCatalog>,
        otp: Arc<OtpGate>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            coupons,
            otp,
            clock,
        }
    }

    /// Email a redemption code to the account's address
    pub async fn request_otp(&self, account_id: AccountId) -> CoreResult<()> {
        let account = self.ledger.account(account_id).await?;
        self.otp
            .issue(&account.email, OtpPurpose::CouponRedemption)
            .await?;
        Ok(())
    }

    pub async fn redeem(
        &self,
        account_id: AccountId,
        coupon_id: CouponId,
        otp_email: &str,
        otp_code: &str,
    ) -> CoreResult<CouponRedemption> {
        // OTP first; a code sent to another address never authorizes this account
        let account = self.ledger.account(account_id).await?;
        if normalize_email(otp_email)? != account.email {
            return Err(CoreError::InvalidCode);
        }
        let otp_session = self
            .otp
            .check(otp_email, otp_code, OtpPurpose::CouponRedemption)
            .await?;

        let coupon = self.coupons.get(coupon_id).await?;
        let now = self.clock.now();
        if coupon.expiry_date.is_some_and(|at| at < now) {
            return Err(CoreError::Expired("Coupon".into()));
        }

        let mut session = self.ledger.open(account_id).await?;
        if session.account().earnings_balance < coupon.points_required {
            return Err(CoreError::InsufficientFunds);
        }

        self.otp.claim(otp_session.id).await?;

        let posting = Posting::new(
            TransactionKind::CouponRedemption,
            format!("Redeemed coupon: {}", coupon.title),
        );
        if let Err(e) = session
            .debit_earnings_only(coupon.points_required, posting)
            .await
        {
            self.release_claim(otp_session.id).await;
            return Err(e);
        }

        let redemption = CouponRedemption {
            id: uuid::Uuid::new_v4(),
            account_id,
            coupon_id,
            points_used: coupon.points_required,
            redeemed_at: now,
        };
        let written = match to_document(&redemption) {
            Ok(doc) => self
                .store
                .put(collections::COUPON_REDEMPTIONS, &redemption.id.to_string(), doc)
                .await
                .map_err(CoreError::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = written {
            warn!(%account_id, %coupon_id, error = %e, "Redemption record failed, reversing debit");
            let reversal = Posting::new(
                TransactionKind::CouponRedemption,
                format!("Reversed coupon redemption: {}", coupon.title),
            );
            if let Err(re) = session
                .credit(Pool::Earnings, coupon.points_required, reversal)
                .await
            {
                error!(%account_id, %coupon_id, error = %re, "Compensating credit failed");
            }
            self.release_claim(otp_session.id).await;
            return Err(e);
        }

        if let Err(e) = self.coupons.bump_redeemed(coupon_id).await {
            warn!(%coupon_id, error = %e, "Failed to bump redemption counter");
        }
        info!(%account_id, %coupon_id, points = %coupon.points_required, "Coupon redeemed");
        Ok(redemption)
    }

    async fn release_claim(&self, otp_session: SessionId) {
        if let Err(e) = self.otp.release(otp_session).await {
            error!(session_id = %otp_session, error = %e, "Failed to release OTP claim");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountDraft;
    use crate::clock::ManualClock;
    use crate::config::OtpConfig;
    use crate::coupon::models::NewCoupon;
    use crate::ledger::service::tests::{d, set_balances};
    use crate::otp::MemoryOutbox;
    use crate::store::KeyedLocks;
    use crate::store::testing::FlakyStore;
    use chrono::{Duration, TimeZone, Utc};

    struct Fixture {
        store: Arc<FlakyStore>,
        ledger: Arc<Ledger>,
        coupons: Arc<CouponCatalog>,
        otp: Arc<OtpGate>,
        outbox: Arc<MemoryOutbox>,
        clock: Arc<ManualClock>,
        engine: RedemptionEngine,
        account: AccountId,
    }

    const EMAIL: &str = "coupon@example.com";

    async fn fixture() -> Fixture {
        let store = Arc::new(FlakyStore::new(collections::COUPON_REDEMPTIONS));
        let dyn_store: Arc<dyn DocumentStore> = store.clone();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let locks = Arc::new(KeyedLocks::new());
        let ledger = Arc::new(Ledger::new(
            dyn_store.clone(),
            locks.clone(),
            clock.clone(),
            Default::default(),
        ));
        let outbox = Arc::new(MemoryOutbox::new());
        let otp = Arc::new(OtpGate::new(
            dyn_store.clone(),
            locks,
            clock.clone(),
            outbox.clone(),
            OtpConfig::default(),
        ));
        let coupons = Arc::new(CouponCatalog::new(dyn_store.clone(), clock.clone()));
        let engine = RedemptionEngine::new(
            dyn_store,
            ledger.clone(),
            coupons.clone(),
            otp.clone(),
            clock.clone(),
        );
        let (account, _) = ledger
            .create_account(
                AccountDraft {
                    email: EMAIL.into(),
                    name: "C".into(),
                    ..Default::default()
                },
                d("10000"),
            )
            .await
            .unwrap();
        Fixture {
            store,
            ledger,
            coupons,
            otp,
            outbox,
            clock,
            engine,
            account: account.id,
        }
    }

    async fn coupon(f: &Fixture, points: &str) -> CouponId {
        f.coupons
            .create(NewCoupon {
                title: "Coffee".into(),
                description: String::new(),
                points_required: d(points),
                value: d("5"),
                expiry_date: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn code(f: &Fixture) -> String {
        f.engine.request_otp(f.account).await.unwrap();
        f.outbox.last_code(EMAIL).unwrap()
    }

    #[tokio::test]
    async fn test_redeem_debits_earnings_only() {
        let f = fixture().await;
        set_balances(f.store.as_ref(), f.account, "10000", "600").await;
        let coupon_id = coupon(&f, "500").await;
        let code = code(&f).await;

        let redemption = f
            .engine
            .redeem(f.account, coupon_id, EMAIL, &code)
            .await
            .unwrap();
        assert_eq!(redemption.points_used, d("500"));

        let wallet = f.ledger.wallet(f.account).await.unwrap();
        assert_eq!(wallet.earnings_balance, d("100"));
        assert_eq!(wallet.virtual_balance, d("10000"));
        assert_eq!(f.coupons.get(coupon_id).await.unwrap().redeemed_count, 1);

        // Code is spent
        assert_eq!(
            f.engine
                .redeem(f.account, coupon_id, EMAIL, &code)
                .await
                .unwrap_err(),
            CoreError::InvalidCode
        );
    }

    #[tokio::test]
    async fn test_virtual_balance_does_not_count() {
        let f = fixture().await;
        set_balances(f.store.as_ref(), f.account, "10000", "499").await;
        let coupon_id = coupon(&f, "500").await;
        let code = code(&f).await;

        assert_eq!(
            f.engine
                .redeem(f.account, coupon_id, EMAIL, &code)
                .await
                .unwrap_err(),
            CoreError::InsufficientFunds
        );
        // Nothing consumed: the same code still works once funds arrive
        set_balances(f.store.as_ref(), f.account, "10000", "500").await;
        f.engine
            .redeem(f.account, coupon_id, EMAIL, &code)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_otp_and_coupon_rejections() {
        let f = fixture().await;
        set_balances(f.store.as_ref(), f.account, "0", "1000").await;
        let coupon_id = coupon(&f, "100").await;
        let code = code(&f).await;

        assert_eq!(
            f.engine
                .redeem(f.account, coupon_id, "someone@else.com", &code)
                .await
                .unwrap_err(),
            CoreError::InvalidCode
        );
        assert!(matches!(
            f.engine
                .redeem(f.account, uuid::Uuid::new_v4(), EMAIL, &code)
                .await,
            Err(CoreError::NotFound(_))
        ));

        let expiring = f
            .coupons
            .create(NewCoupon {
                title: "Soon".into(),
                description: String::new(),
                points_required: d("100"),
                value: d("1"),
                expiry_date: Some(f.clock.now() + Duration::minutes(5)),
            })
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(6));
        assert!(matches!(
            f.engine.redeem(f.account, expiring.id, EMAIL, &code).await,
            Err(CoreError::Expired(_))
        ));

        f.clock.advance(Duration::minutes(5));
        assert!(matches!(
            f.engine.redeem(f.account, coupon_id, EMAIL, &code).await,
            Err(CoreError::Expired(_))
        ));
        assert_eq!(f.ledger.wallet(f.account).await.unwrap().earnings_balance, d("1000"));
    }

    #[tokio::test]
    async fn test_failed_record_reverses_debit_and_releases_code() {
        let f = fixture().await;
        set_balances(f.store.as_ref(), f.account, "0", "800").await;
        let coupon_id = coupon(&f, "500").await;
        let code = code(&f).await;

        f.store.fail_always();
        let err = f
            .engine
            .redeem(f.account, coupon_id, EMAIL, &code)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert_eq!(f.ledger.wallet(f.account).await.unwrap().earnings_balance, d("800"));
        assert_eq!(f.coupons.get(coupon_id).await.unwrap().redeemed_count, 0);

        // The debit and its reversal are both on record
        let kinds: Vec<_> = f
            .ledger
            .history(f.account)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.kind == TransactionKind::CouponRedemption)
            .map(|t| t.amount)
            .collect();
        assert_eq!(kinds, vec![d("500"), d("-500")]);

        // Claim was released
        assert!(
            f.otp
                .check(EMAIL, &code, OtpPurpose::CouponRedemption)
                .await
                .is_ok()
        );
        f.store.heal();
        f.engine
            .redeem(f.account, coupon_id, EMAIL, &code)
            .await
            .unwrap();
        assert_eq!(f.ledger.wallet(f.account).await.unwrap().earnings_balance, d("300"));
    }
}
