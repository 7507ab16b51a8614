//! Subscription requests
//!
//! Users ask to be contacted about a strategy; admins review the queue.

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::clock::Clock;
use crate::core_types::{AccountId, StrategyId};
use crate::error::{CoreError, CoreResult};
use crate::store::{DocumentStore, Filter, Sort, collections, from_documents, to_document};
use crate::strategy::StrategyCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionRequest {
    pub id: uuid::Uuid,
    #[schema(value_type = uuid::Uuid)]
    pub account_id: AccountId,
    #[schema(value_type = uuid::Uuid)]
    pub strategy_id: StrategyId,
    pub strategy_name: String,
    pub user_name: String,
    pub user_email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub status: SubscriptionStatus,
    #[serde(with = "ts_milliseconds")]
    #[schema(value_type = i64)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewSubscriptionRequest {
    #[schema(value_type = uuid::Uuid)]
    pub strategy_id: StrategyId,
    #[validate(length(min = 1, max = 128))]
    pub user_name: String,
    #[validate(email)]
    pub user_email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub message: Option<String>,
}

pub struct SubscriptionService {
    store: Arc<dyn DocumentStore>,
    strategies: Arc<StrategyCatalog>,
    clock: Arc<dyn Clock>,
}

impl SubscriptionService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        strategies: Arc<StrategyCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            strategies,
            clock,
        }
    }

    pub async fn create(
        &self,
        account_id: AccountId,
        req: NewSubscriptionRequest,
    ) -> CoreResult<SubscriptionRequest> {
        req.validate()
            .map_err(|e| CoreError::InvalidInput(e.to_string()))?;
        let strategy = self.strategies.get(req.strategy_id).await?;

        let request = SubscriptionRequest {
            id: uuid::Uuid::new_v4(),
            account_id,
            strategy_id: strategy.id,
            strategy_name: strategy.name,
            user_name: req.user_name,
            user_email: req.user_email.trim().to_lowercase(),
            phone_number: req.phone_number,
            message: req.message,
            status: SubscriptionStatus::Pending,
            created_at: self.clock.now(),
        };
        self.store
            .put(
                collections::SUBSCRIPTION_REQUESTS,
                &request.id.to_string(),
                to_document(&request)?,
            )
            .await?;
        info!(request_id = %request.id, %account_id, strategy = %request.strategy_name, "Subscription request created");
        Ok(request)
    }

    /// All requests, newest first
    pub async fn list(&self) -> CoreResult<Vec<SubscriptionRequest>> {
        let docs = self
            .store
            .find(
                collections::SUBSCRIPTION_REQUESTS,
                &Filter::new(),
                Some(&Sort::desc("created_at")),
                None,
            )
            .await?;
        Ok(from_documents(docs)?)
    }
}
