//! Persisted id sets: tombstones and pending pushes.

use crate::error::{SyncError, SyncResult};
use lifesync_storage::KvStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A set of record ids persisted as a JSON array under one key.
///
/// Updates are serialized by an async lock so concurrent adds and removes
/// never overwrite each other.
#[derive(Clone)]
pub struct IdSet {
    store: Arc<dyn KvStore>,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for IdSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdSet").field("key", &self.key).finish()
    }
}

impl IdSet {
    /// Creates a set stored under `key`.
    pub fn new(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the storage key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns every id in the set.
    pub async fn all(&self) -> SyncResult<BTreeSet<String>> {
        match self.store.get_item(&self.key).await? {
            None => Ok(BTreeSet::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| SyncError::codec(&self.key, e)),
        }
    }

    /// Returns true if `id` is in the set.
    pub async fn contains(&self, id: &str) -> SyncResult<bool> {
        Ok(self.all().await?.contains(id))
    }

    /// Adds one id.
    pub async fn add(&self, id: &str) -> SyncResult<()> {
        self.add_many([id.to_string()]).await
    }

    /// Adds several ids in one write.
    pub async fn add_many<I>(&self, ids: I) -> SyncResult<()>
    where
        I: IntoIterator<Item = String>,
    {
        self.update(|set| {
            let before = set.len();
            set.extend(ids);
            set.len() != before
        })
        .await
    }

    /// Removes one id.
    pub async fn remove(&self, id: &str) -> SyncResult<()> {
        self.remove_many([id.to_string()]).await
    }

    /// Removes several ids in one write.
    pub async fn remove_many<I>(&self, ids: I) -> SyncResult<()>
    where
        I: IntoIterator<Item = String>,
    {
        self.update(|set| {
            let before = set.len();
            for id in ids {
                set.remove(&id);
            }
            set.len() != before
        })
        .await
    }

    async fn update<F>(&self, f: F) -> SyncResult<()>
    where
        F: FnOnce(&mut BTreeSet<String>) -> bool,
    {
        let _guard = self.lock.lock().await;
        let mut set = self.all().await?;
        if !f(&mut set) {
            return Ok(());
        }
        let raw = serde_json::to_string(&set).map_err(|e| SyncError::codec(&self.key, e))?;
        self.store.set_item(&self.key, &raw).await?;
        Ok(())
    }
}

/// Ids deleted locally whose remote deletion is not yet confirmed.
///
/// A pull never writes a tombstoned id back into the collection. An id
/// leaves the set only when the remote confirms the delete.
#[derive(Debug, Clone)]
pub struct TombstoneTracker(IdSet);

impl TombstoneTracker {
    /// Creates a tracker stored under `key`.
    pub fn new(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self(IdSet::new(store, key))
    }

    /// Records a local deletion.
    pub async fn add(&self, id: &str) -> SyncResult<()> {
        self.0.add(id).await
    }

    /// Records several local deletions.
    pub async fn add_many<I>(&self, ids: I) -> SyncResult<()>
    where
        I: IntoIterator<Item = String>,
    {
        self.0.add_many(ids).await
    }

    /// Clears a tombstone after the remote confirmed the delete.
    pub async fn remove(&self, id: &str) -> SyncResult<()> {
        self.0.remove(id).await
    }

    /// Returns true if `id` is tombstoned.
    pub async fn contains(&self, id: &str) -> SyncResult<bool> {
        self.0.contains(id).await
    }

    /// Returns every tombstoned id.
    pub async fn all(&self) -> SyncResult<BTreeSet<String>> {
        self.0.all().await
    }
}

/// Ids written locally whose push has not yet succeeded.
#[derive(Debug, Clone)]
pub struct PendingPushes(IdSet);

impl PendingPushes {
    /// Creates an outbox stored under `key`.
    pub fn new(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self(IdSet::new(store, key))
    }

    /// Marks ids as awaiting a push.
    pub async fn mark<I>(&self, ids: I) -> SyncResult<()>
    where
        I: IntoIterator<Item = String>,
    {
        self.0.add_many(ids).await
    }

    /// Clears an id after its push succeeded or became moot.
    pub async fn clear(&self, id: &str) -> SyncResult<()> {
        self.0.remove(id).await
    }

    /// Clears several ids.
    pub async fn clear_many<I>(&self, ids: I) -> SyncResult<()>
    where
        I: IntoIterator<Item = String>,
    {
        self.0.remove_many(ids).await
    }

    /// Returns true if `id` awaits a push.
    pub async fn contains(&self, id: &str) -> SyncResult<bool> {
        self.0.contains(id).await
    }

    /// Returns every pending id.
    pub async fn all(&self) -> SyncResult<BTreeSet<String>> {
        self.0.all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifesync_storage::InMemoryKvStore;

    fn store() -> Arc<InMemoryKvStore> {
        Arc::new(InMemoryKvStore::new())
    }

    #[tokio::test]
    async fn add_and_remove() {
        let tombstones = TombstoneTracker::new(store(), "t");
        tombstones.add("a").await.unwrap();
        tombstones
            .add_many(["b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert!(tombstones.contains("b").await.unwrap());

        tombstones.remove("b").await.unwrap();
        let all: Vec<_> = tombstones.all().await.unwrap().into_iter().collect();
        assert_eq!(all, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn persists_across_instances() {
        let backing = store();
        PendingPushes::new(backing.clone(), "p")
            .mark(["x".to_string()])
            .await
            .unwrap();
        let reopened = PendingPushes::new(backing.clone(), "p");
        assert!(reopened.contains("x").await.unwrap());
        assert_eq!(backing.snapshot("p").as_deref(), Some(r#"["x"]"#));
    }

    #[tokio::test]
    async fn no_op_updates_skip_the_write() {
        let backing = store();
        let set = IdSet::new(backing.clone(), "s");
        set.add("a").await.unwrap();
        let writes = backing.write_count();
        set.add("a").await.unwrap();
        set.remove("missing").await.unwrap();
        assert_eq!(backing.write_count(), writes);
    }

    #[tokio::test]
    async fn concurrent_adds_are_all_kept() {
        let set = IdSet::new(store(), "s");
        let mut handles = Vec::new();
        for i in 0..20 {
            let set = set.clone();
            handles.push(tokio::spawn(async move {
                set.add(&format!("id{i}")).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(set.all().await.unwrap().len(), 20);
    }
}
