//! In-memory document store
//!
//! DashMap of collections. Each record remembers its insertion sequence so
//! unsorted `find` calls return insertion order.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{DocumentStore, Filter, Sort, StoreError};

struct StoredDoc {
    seq: u64,
    body: Value,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, HashMap<String, StoredDoc>>,
    next_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_an_object(collection: &str, key: &str) -> StoreError {
        StoreError::NotAnObject {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(key).map(|d| d.body.clone())))
    }

    async fn put(&self, collection: &str, key: &str, record: Value) -> Result<(), StoreError> {
        if !record.is_object() {
            return Err(Self::not_an_object(collection, key));
        }
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        match docs.get_mut(key) {
            Some(existing) => existing.body = record,
            None => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                docs.insert(key.to_string(), StoredDoc { seq, body: record });
            }
        }
        Ok(())
    }

    async fn update_increment(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<bool, StoreError> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(doc) = docs.get_mut(key) else {
            return Ok(false);
        };
        let body = doc
            .body
            .as_object_mut()
            .ok_or_else(|| Self::not_an_object(collection, key))?;
        let current = body.get(field).and_then(Value::as_i64).unwrap_or(0);
        body.insert(field.to_string(), Value::from(current + delta));
        Ok(true)
    }

    async fn update_set(
        &self,
        collection: &str,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(doc) = docs.get_mut(key) else {
            return Ok(false);
        };
        let body = doc
            .body
            .as_object_mut()
            .ok_or_else(|| Self::not_an_object(collection, key))?;
        body.extend(fields);
        Ok(true)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, StoreError> {
        let mut matched: Vec<(u64, Value)> = match self.collections.get(collection) {
            Some(docs) => docs
                .values()
                .filter(|d| filter.matches(&d.body))
                .map(|d| (d.seq, d.body.clone()))
                .collect(),
            None => Vec::new(),
        };

        matched.sort_by_key(|(seq, _)| *seq);
        if let Some(sort) = sort {
            matched.sort_by(|(_, a), (_, b)| sort.compare(a, b));
        }

        let limit = limit.unwrap_or(usize::MAX);
        Ok(matched.into_iter().take(limit).map(|(_, doc)| doc).collect())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .collections
            .get_mut(collection)
            .map(|mut docs| docs.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.values().filter(|d| filter.matches(&d.body)).count())
            .unwrap_or(0))
    }
}
