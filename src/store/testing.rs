//! Fault injection for tests

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{DocumentStore, Filter, MemoryStore, Sort, StoreError};

/// MemoryStore whose writes to one collection fail on demand
pub(crate) struct FlakyStore {
    pub(crate) inner: MemoryStore,
    fail_collection: &'static str,
    failures_left: AtomicUsize,
}

impl FlakyStore {
    pub(crate) fn new(fail_collection: &'static str) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_collection,
            failures_left: AtomicUsize::new(0),
        }
    }

    /// Fail the next `n` writes to the collection
    pub(crate) fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub(crate) fn fail_always(&self) {
        self.fail_next(usize::MAX);
    }

    pub(crate) fn heal(&self) {
        self.fail_next(0);
    }

    fn check(&self, collection: &str) -> Result<(), StoreError> {
        if collection != self.fail_collection {
            return Ok(());
        }
        let tripped = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                usize::MAX => Some(n),
                _ => Some(n - 1),
            })
            .is_ok();
        if tripped {
            Err(StoreError::Backend("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    fn name(&self) -> &'static str {
        "flaky"
    }
    async fn get(&self, c: &str, k: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(c, k).await
    }
    async fn put(&self, c: &str, k: &str, r: Value) -> Result<(), StoreError> {
        self.check(c)?;
        self.inner.put(c, k, r).await
    }
    async fn update_increment(&self, c: &str, k: &str, f: &str, d: i64) -> Result<bool, StoreError> {
        self.check(c)?;
        self.inner.update_increment(c, k, f, d).await
    }
    async fn update_set(&self, c: &str, k: &str, f: Map<String, Value>) -> Result<bool, StoreError> {
        self.check(c)?;
        self.inner.update_set(c, k, f).await
    }
    async fn find(
        &self,
        c: &str,
        f: &Filter,
        s: Option<&Sort>,
        l: Option<usize>,
    ) -> Result<Vec<Value>, StoreError> {
        self.inner.find(c, f, s, l).await
    }
    async fn delete(&self, c: &str, k: &str) -> Result<bool, StoreError> {
        self.check(c)?;
        self.inner.delete(c, k).await
    }
    async fn count(&self, c: &str, f: &Filter) -> Result<usize, StoreError> {
        self.inner.count(c, f).await
    }
}
