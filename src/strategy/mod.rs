//! Strategy Catalog
//!
//! Admin-curated investment strategies. Strategies are never deleted; a
//! deactivated strategy disappears from listings and rejects new positions
//! but keeps settling the positions already opened in it.

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, json};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::clock::Clock;
use crate::core_types::StrategyId;
use crate::error::{CoreError, CoreResult};
use crate::store::{DocumentStore, Filter, collections, from_document, from_documents, to_document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Risky,
    Guaranteed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Strategy {
    #[schema(value_type = uuid::Uuid)]
    pub id: StrategyId,
    pub name: String,
    pub description: String,
    pub logic_description: String,
    pub category: RiskCategory,
    /// Advertised monthly return, percent
    #[schema(value_type = String, example = "4.5")]
    pub monthly_return: Decimal,
    /// Minimum amount accepted by a new position
    #[schema(value_type = String, example = "1000")]
    pub capital_required: Decimal,
    pub is_active: bool,
    #[serde(with = "ts_milliseconds")]
    #[schema(value_type = i64)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewStrategy {
    #[validate(length(min = 1, max = 128))]
    #[schema(example = "Momentum Alpha")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub logic_description: String,
    pub category: RiskCategory,
    #[schema(value_type = String, example = "4.5")]
    pub monthly_return: Decimal,
    #[schema(value_type = String, example = "1000")]
    pub capital_required: Decimal,
}

pub struct StrategyCatalog {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl StrategyCatalog {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, req: NewStrategy) -> CoreResult<Strategy> {
        req.validate()
            .map_err(|e| CoreError::InvalidInput(e.to_string()))?;
        if req.capital_required < Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "capital_required must not be negative".into(),
            ));
        }
        let name = req.name.trim().to_string();
        if self.find_by_name(&name).await?.is_some() {
            return Err(CoreError::AlreadyExists(format!("Strategy '{}'", name)));
        }

        let strategy = Strategy {
            id: uuid::Uuid::new_v4(),
            name,
            description: req.description,
            logic_description: req.logic_description,
            category: req.category,
            monthly_return: req.monthly_return,
            capital_required: req.capital_required,
            is_active: true,
            created_at: self.clock.now(),
        };
        self.store
            .put(
                collections::STRATEGIES,
                &strategy.id.to_string(),
                to_document(&strategy)?,
            )
            .await?;
        info!(strategy_id = %strategy.id, name = %strategy.name, "Strategy created");
        Ok(strategy)
    }

    /// Active strategy by id
    pub async fn get(&self, id: StrategyId) -> CoreResult<Strategy> {
        match self.get_any(id).await? {
            Some(s) if s.is_active => Ok(s),
            _ => Err(CoreError::not_found("Strategy")),
        }
    }

    /// Strategy by id regardless of the active flag
    pub async fn get_any(&self, id: StrategyId) -> CoreResult<Option<Strategy>> {
        match self
            .store
            .get(collections::STRATEGIES, &id.to_string())
            .await?
        {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Active strategies in creation order
    pub async fn list(&self) -> CoreResult<Vec<Strategy>> {
        let docs = self
            .store
            .find(
                collections::STRATEGIES,
                &Filter::new().eq("is_active", true),
                None,
                None,
            )
            .await?;
        Ok(from_documents(docs)?)
    }

    /// Exact-name lookup, including inactive strategies
    pub async fn find_by_name(&self, name: &str) -> CoreResult<Option<Strategy>> {
        let docs = self
            .store
            .find(
                collections::STRATEGIES,
                &Filter::new().eq("name", name),
                None,
                Some(1),
            )
            .await?;
        Ok(from_documents::<Strategy>(docs)?.into_iter().next())
    }

    pub async fn deactivate(&self, id: StrategyId) -> CoreResult<()> {
        let mut fields = Map::new();
        fields.insert("is_active".into(), json!(false));
        if !self
            .store
            .update_set(collections::STRATEGIES, &id.to_string(), fields)
            .await?
        {
            return Err(CoreError::not_found("Strategy"));
        }
        info!(strategy_id = %id, "Strategy deactivated");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::store::MemoryStore;

    pub(crate) fn new_strategy(name: &str, minimum: i64) -> NewStrategy {
        NewStrategy {
            name: name.to_string(),
            description: "test strategy".into(),
            logic_description: "buy low, sell high".into(),
            category: RiskCategory::Risky,
            monthly_return: Decimal::new(45, 1),
            capital_required: Decimal::from(minimum),
        }
    }

    fn catalog() -> StrategyCatalog {
        StrategyCatalog::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn test_create_list_get() {
        let catalog = catalog();
        let a = catalog.create(new_strategy("Alpha", 100)).await.unwrap();
        let b = catalog.create(new_strategy("Beta", 200)).await.unwrap();

        let listed: Vec<_> = catalog.list().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(listed, vec![a.id, b.id]);
        assert_eq!(catalog.get(a.id).await.unwrap().name, "Alpha");
        assert!(matches!(
            catalog.get(uuid::Uuid::new_v4()).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deactivate_hides_but_keeps_name_lookup() {
        let catalog = catalog();
        let a = catalog.create(new_strategy("Alpha", 100)).await.unwrap();
        catalog.deactivate(a.id).await.unwrap();

        assert!(catalog.list().await.unwrap().is_empty());
        assert!(matches!(catalog.get(a.id).await, Err(CoreError::NotFound(_))));
        assert!(catalog.find_by_name("Alpha").await.unwrap().is_some());
        assert!(catalog.find_by_name("alpha").await.unwrap().is_none());
        assert!(matches!(
            catalog.deactivate(uuid::Uuid::new_v4()).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_duplicate_and_empty_names() {
        let catalog = catalog();
        catalog.create(new_strategy("Alpha", 100)).await.unwrap();
        assert!(matches!(
            catalog.create(new_strategy("Alpha", 5)).await,
            Err(CoreError::AlreadyExists(_))
        ));
        assert!(matches!(
            catalog.create(new_strategy("", 5)).await,
            Err(CoreError::InvalidInput(_))
        ));
    }
}
