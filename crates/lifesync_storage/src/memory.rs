//! In-memory key-value store for testing.

use crate::backend::KvStore;
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// An in-memory key-value store.
///
/// This store keeps all values in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral sessions that don't need persistence
///
/// Writes can be made to fail on demand to exercise local storage
/// error paths.
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across tasks.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    data: RwLock<BTreeMap<String, String>>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl InMemoryKvStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store with pre-existing entries.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            data: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Makes every subsequent `set_item` and `remove_item` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of successful writes (sets and removes).
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns all keys currently stored, in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Returns a copy of the value under `key` without going through the
    /// async interface.
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        self.check_writable()?;
        self.data.write().insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.check_writable()?;
        self.data.write().remove(key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_new_is_empty() {
        let store = InMemoryKvStore::new();
        assert!(store.keys().is_empty());
        assert_eq!(store.get_item("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_set_then_get() {
        let store = InMemoryKvStore::new();
        store.set_item("a", "1").await.unwrap();
        store.set_item("a", "2").await.unwrap();

        assert_eq!(store.get_item("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn memory_remove_missing_is_ok() {
        let store = InMemoryKvStore::new();
        store.remove_item("nothing").await.unwrap();
        assert_eq!(store.get_item("nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_empty_key_rejected() {
        let store = InMemoryKvStore::new();
        let result = store.set_item("", "x").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn memory_with_entries() {
        let store = InMemoryKvStore::with_entries([("k1", "v1"), ("k2", "v2")]);
        assert_eq!(store.keys(), vec!["k1".to_string(), "k2".to_string()]);
        assert_eq!(store.snapshot("k2").as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn memory_failing_writes_keep_previous_value() {
        let store = InMemoryKvStore::new();
        store.set_item("k", "old").await.unwrap();

        store.set_fail_writes(true);
        assert!(matches!(
            store.set_item("k", "new").await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(store.remove_item("k").await.is_err());
        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("old"));

        store.set_fail_writes(false);
        store.set_item("k", "new").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("new"));
    }
}
