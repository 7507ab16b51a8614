//! Service wiring
//!
//! Builds every component over one store, one lock table and one clock.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::coupon::{CouponCatalog, RedemptionEngine};
use crate::investment::InvestmentTracker;
use crate::ledger::Ledger;
use crate::otp::{EmailSender, OtpGate};
use crate::rewards::RewardIssuer;
use crate::settlement::SettlementProcessor;
use crate::store::{DocumentStore, KeyedLocks};
use crate::strategy::StrategyCatalog;
use crate::subscription::SubscriptionService;
use crate::user_auth::{OAuthProvider, UserAuthService};

#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn DocumentStore>,
    pub ledger: Arc<Ledger>,
    pub otp: Arc<OtpGate>,
    pub rewards: Arc<RewardIssuer>,
    pub strategies: Arc<StrategyCatalog>,
    pub investments: Arc<InvestmentTracker>,
    pub settlement: Arc<SettlementProcessor>,
    pub coupons: Arc<CouponCatalog>,
    pub redemptions: Arc<RedemptionEngine>,
    pub subscriptions: Arc<SubscriptionService>,
    pub auth: Arc<UserAuthService>,
}

impl Services {
    pub fn build(
        config: &AppConfig,
        store: Arc<dyn DocumentStore>,
        email: Arc<dyn EmailSender>,
        oauth: Arc<dyn OAuthProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let locks = Arc::new(KeyedLocks::new());

        let ledger = Arc::new(Ledger::new(
            store.clone(),
            locks.clone(),
            clock.clone(),
            config.ledger.clone(),
        ));
        let otp = Arc::new(OtpGate::new(
            store.clone(),
            locks,
            clock.clone(),
            email,
            config.otp.clone(),
        ));
        let rewards = Arc::new(RewardIssuer::new(ledger.clone()));
        let strategies = Arc::new(StrategyCatalog::new(store.clone(), clock.clone()));
        let investments = Arc::new(InvestmentTracker::new(
            store.clone(),
            ledger.clone(),
            strategies.clone(),
        ));
        let settlement = Arc::new(SettlementProcessor::new(
            ledger.clone(),
            strategies.clone(),
            investments.clone(),
            config.settlement.concurrency,
        ));
        let coupons = Arc::new(CouponCatalog::new(store.clone(), clock.clone()));
        let redemptions = Arc::new(RedemptionEngine::new(
            store.clone(),
            ledger.clone(),
            coupons.clone(),
            otp.clone(),
            clock.clone(),
        ));
        let subscriptions = Arc::new(SubscriptionService::new(
            store.clone(),
            strategies.clone(),
            clock.clone(),
        ));
        let auth = Arc::new(UserAuthService::new(
            store.clone(),
            ledger.clone(),
            rewards.clone(),
            otp.clone(),
            oauth,
            clock,
            config.auth.clone(),
        ));

        Self {
            store,
            ledger,
            otp,
            rewards,
            strategies,
            investments,
            settlement,
            coupons,
            redemptions,
            subscriptions,
            auth,
        }
    }
}
