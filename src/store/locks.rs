//! Per-key async mutual exclusion.
//!
//! One `tokio::sync::Mutex` per key in a DashMap, created on first use and
//! removed once the last holder or waiter lets go. Holding the returned
//! guard serializes every check-then-act sequence on that key without a
//! global lock.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

#[derive(Default)]
pub struct KeyedLocks {
    locks: Arc<LockMap>,
}

/// Held lock on one key. Dropping it unlocks and, when nobody else holds or
/// waits on the key, removes the key's entry.
pub struct KeyedGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: Arc<LockMap>,
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        // Release our reference first so an idle entry has a count of one
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock for `key`
    pub async fn lock(&self, key: &str) -> KeyedGuard {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        KeyedGuard {
            guard: Some(guard),
            key: key.to_string(),
            locks: self.locks.clone(),
        }
    }

    /// Keys currently held or waited on
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub fn account_key(id: &uuid::Uuid) -> String {
    format!("account:{}", id)
}

pub fn email_key(email: &str) -> String {
    format!("email:{}", email)
}

pub fn otp_key(id: &uuid::Uuid) -> String {
    format!("otp:{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("account:1").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("account:a").await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.lock("account:b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_entries_removed_after_release() {
        let locks = KeyedLocks::new();
        let a = locks.lock("otp:a").await;
        let b = locks.lock("otp:b").await;
        assert_eq!(locks.len(), 2);

        drop(a);
        assert_eq!(locks.len(), 1);
        drop(b);
        assert_eq!(locks.len(), 0);

        // A released key can be taken again
        let again = locks.lock("otp:a").await;
        assert_eq!(locks.len(), 1);
        drop(again);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_kept_while_waiter_queued() {
        let locks = Arc::new(KeyedLocks::new());
        let first = locks.lock("account:1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("account:1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // The queued waiter still references the entry
        drop(first);
        assert!(locks.len() <= 1);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
