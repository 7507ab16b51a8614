//! Document store port
//!
//! Persistence is reached through a minimal document interface: every call
//! targets a single record, there is no multi-record transaction. Callers
//! that need multi-record consistency (the ledger) build it on top with
//! [`KeyedLocks`] and a write-ahead protocol.
//!
//! - [`MemoryStore`] - DashMap-backed, default for dev and tests
//! - [`PgStore`] - PostgreSQL, one JSONB `documents` table

pub mod locks;
pub mod memory;
pub mod postgres;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use thiserror::Error;

pub use locks::KeyedLocks;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Collection names
pub mod collections {
    pub const ACCOUNTS: &str = "accounts";
    pub const TRANSACTIONS: &str = "transactions";
    pub const STRATEGIES: &str = "strategies";
    pub const POSITIONS: &str = "positions";
    pub const VERIFICATION_SESSIONS: &str = "verification_sessions";
    pub const LOGIN_SESSIONS: &str = "login_sessions";
    pub const COUPONS: &str = "coupons";
    pub const COUPON_REDEMPTIONS: &str = "coupon_redemptions";
    pub const SUBSCRIPTION_REQUESTS: &str = "subscription_requests";
}

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Record {collection}/{key} is not a JSON object")]
    NotAnObject { collection: String, key: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Equality filter over document fields.
///
/// Paths are dot separated (`trade_details.transaction_id`) and address
/// nested objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((path.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(path, expected)| lookup(doc, path) == Some(expected))
    }

    /// Nested object such that `doc @> containment` iff `self.matches(doc)`
    pub fn to_containment(&self) -> Value {
        let mut root = Map::new();
        for (path, value) in &self.conditions {
            let nested = path.rsplit('.').fold(value.clone(), |acc, segment| {
                let mut level = Map::new();
                level.insert(segment.to_string(), acc);
                Value::Object(level)
            });
            if let Value::Object(nested) = nested {
                merge_into(&mut root, nested);
            }
        }
        Value::Object(root)
    }
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |value, segment| value.get(segment))
}

fn merge_into(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        if let Value::Object(incoming) = value {
            if let Some(Value::Object(existing)) = target.get_mut(&key) {
                merge_into(existing, incoming);
                continue;
            }
            target.insert(key, Value::Object(incoming));
        } else {
            target.insert(key, value);
        }
    }
}

/// Sort order for `find`
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }

    pub(crate) fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ord = compare_values(lookup(a, &self.field), lookup(b, &self.field));
        if self.descending { ord.reverse() } else { ord }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) | (Some(Value::Null), Some(_)) => Ordering::Less,
        (Some(_), None) | (Some(_), Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Storage port.
///
/// Every operation targets a single logical record. `find` without a sort
/// returns records in insertion order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Insert or replace a record
    async fn put(&self, collection: &str, key: &str, record: Value) -> Result<(), StoreError>;

    /// Add `delta` to an integer field. Returns false if the record is absent.
    async fn update_increment(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<bool, StoreError>;

    /// Overwrite the given top-level fields. Returns false if the record is absent.
    async fn update_set(
        &self,
        collection: &str,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError>;

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, StoreError>;

    /// Returns false if the record was absent
    async fn delete(&self, collection: &str, key: &str) -> Result<bool, StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError>;
}

// ============================================================================
// Typed helpers
// ============================================================================

pub fn to_document<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

pub fn from_document<T: DeserializeOwned>(doc: Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(doc)?)
}

pub fn from_documents<T: DeserializeOwned>(docs: Vec<Value>) -> Result<Vec<T>, StoreError> {
    docs.into_iter().map(from_document).collect()
}

/// Build an `update_set` field map from a serializable patch struct
pub fn to_fields<T: Serialize>(patch: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(patch)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::Serialization(format!(
            "patch must serialize to an object, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_nested_paths() {
        let doc = json!({
            "account_id": "a-1",
            "trade_details": { "transaction_id": "ad-42" }
        });
        assert!(
            Filter::new()
                .eq("account_id", "a-1")
                .eq("trade_details.transaction_id", "ad-42")
                .matches(&doc)
        );
        assert!(
            !Filter::new()
                .eq("trade_details.transaction_id", "ad-43")
                .matches(&doc)
        );
        assert!(!Filter::new().eq("missing.path", "x").matches(&doc));
        assert!(Filter::new().matches(&doc));
    }

    #[test]
    fn test_filter_containment_merges_shared_prefixes() {
        let filter = Filter::new()
            .eq("status", "pending")
            .eq("trade_details.transaction_id", "ad-1")
            .eq("trade_details.ad_unit_id", "unit-7");
        assert_eq!(
            filter.to_containment(),
            json!({
                "status": "pending",
                "trade_details": { "transaction_id": "ad-1", "ad_unit_id": "unit-7" }
            })
        );
    }

    #[test]
    fn test_sort_numbers_and_missing_fields() {
        let newer = json!({ "created_at": 2000 });
        let older = json!({ "created_at": 1000 });
        let missing = json!({});

        assert_eq!(Sort::asc("created_at").compare(&older, &newer), Ordering::Less);
        assert_eq!(Sort::desc("created_at").compare(&older, &newer), Ordering::Greater);
        assert_eq!(Sort::asc("created_at").compare(&missing, &older), Ordering::Less);
    }

    #[test]
    fn test_to_fields_rejects_scalars() {
        assert!(to_fields(&42).is_err());
        let fields = to_fields(&json!({ "a": 1 })).unwrap();
        assert_eq!(fields.get("a"), Some(&json!(1)));
    }
}
