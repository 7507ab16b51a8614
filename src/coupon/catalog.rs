use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use super::models::{Coupon, NewCoupon};
use crate::clock::Clock;
use crate::core_types::CouponId;
use crate::error::{CoreError, CoreResult};
use crate::store::{DocumentStore, Filter, collections, from_document, from_documents, to_document};

pub struct CouponCatalog {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl CouponCatalog {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, req: NewCoupon) -> CoreResult<Coupon> {
        req.validate()
            .map_err(|e| CoreError::InvalidInput(e.to_string()))?;
        if req.points_required <= Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "points_required must be positive".into(),
            ));
        }

        let coupon = Coupon {
            id: uuid::Uuid::new_v4(),
            title: req.title.trim().to_string(),
            description: req.description,
            points_required: req.points_required,
            value: req.value,
            expiry_date: req.expiry_date,
            is_active: true,
            redeemed_count: 0,
            created_at: self.clock.now(),
        };
        self.store
            .put(collections::COUPONS, &coupon.id.to_string(), to_document(&coupon)?)
            .await?;
        info!(coupon_id = %coupon.id, title = %coupon.title, "Coupon created");
        Ok(coupon)
    }

    /// Active coupons, expired ones included so clients can show them greyed out
    pub async fn list(&self) -> CoreResult<Vec<Coupon>> {
        let docs = self
            .store
            .find(
                collections::COUPONS,
                &Filter::new().eq("is_active", true),
                None,
                None,
            )
            .await?;
        Ok(from_documents(docs)?)
    }

    /// Active coupon by id
    pub async fn get(&self, id: CouponId) -> CoreResult<Coupon> {
        let coupon: Option<Coupon> = match self
            .store
            .get(collections::COUPONS, &id.to_string())
            .await?
        {
            Some(doc) => Some(from_document(doc)?),
            None => None,
        };
        match coupon {
            Some(c) if c.is_active => Ok(c),
            _ => Err(CoreError::not_found("Coupon")),
        }
    }

    pub(super) async fn bump_redeemed(&self, id: CouponId) -> CoreResult<()> {
        self.store
            .update_increment(collections::COUPONS, &id.to_string(), "redeemed_count", 1)
            .await?;
        Ok(())
    }
}
