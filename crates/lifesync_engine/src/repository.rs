//! Whole-collection persistence for one entity type.

use crate::error::{SyncError, SyncResult};
use lifesync_protocol::Record;
use lifesync_storage::KvStore;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Loads and saves the full collection of one entity type as a single
/// JSON array under one storage key.
///
/// Every read-modify-write goes through [`Repository::try_mutate`], which
/// holds a per-collection async lock for the whole cycle. Concurrent
/// mutations of the same collection therefore never lose updates.
pub struct Repository<R: Record> {
    store: Arc<dyn KvStore>,
    key: String,
    lock: Arc<Mutex<()>>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key.clone(),
            lock: Arc::clone(&self.lock),
            _marker: PhantomData,
        }
    }
}

impl<R: Record> std::fmt::Debug for Repository<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("kind", &R::KIND)
            .field("key", &self.key)
            .finish()
    }
}

impl<R: Record> Repository<R> {
    /// Creates a repository storing its collection under `key`.
    pub fn new(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            lock: Arc::new(Mutex::new(())),
            _marker: PhantomData,
        }
    }

    /// Returns the storage key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the full collection. A missing key is an empty collection.
    pub async fn load(&self) -> SyncResult<Vec<R>> {
        match self.store.get_item(&self.key).await? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| SyncError::codec(&self.key, e)),
        }
    }

    /// Replaces the full collection.
    ///
    /// Duplicate ids are collapsed, keeping the last occurrence in its
    /// position.
    pub async fn save(&self, records: Vec<R>) -> SyncResult<()> {
        let _guard = self.lock.lock().await;
        self.write(records).await
    }

    /// Returns the record with `id`, if any.
    pub async fn find(&self, id: &str) -> SyncResult<Option<R>> {
        Ok(self.load().await?.into_iter().find(|r| r.id() == id))
    }

    /// Runs a read-modify-write cycle under the collection lock.
    ///
    /// The collection is persisted only when `f` returns `Ok`.
    pub async fn try_mutate<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Vec<R>) -> Result<T, E>,
        E: From<SyncError>,
    {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let value = f(&mut records)?;
        self.write(records).await?;
        Ok(value)
    }

    /// Runs an infallible read-modify-write cycle under the collection lock.
    pub async fn mutate<T, F>(&self, f: F) -> SyncResult<T>
    where
        F: FnOnce(&mut Vec<R>) -> T,
    {
        self.try_mutate(|records| Ok::<T, SyncError>(f(records)))
            .await
    }

    async fn write(&self, records: Vec<R>) -> SyncResult<()> {
        let records = dedupe_keep_last(records, &self.key);
        let raw = serde_json::to_string(&records).map_err(|e| SyncError::codec(&self.key, e))?;
        self.store.set_item(&self.key, &raw).await?;
        Ok(())
    }
}

fn dedupe_keep_last<R: Record>(records: Vec<R>, key: &str) -> Vec<R> {
    let mut last: HashMap<String, usize> = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        last.insert(record.id().to_string(), i);
    }
    if last.len() == records.len() {
        return records;
    }
    tracing::warn!(
        key,
        duplicates = records.len() - last.len(),
        "collapsing duplicate ids before save"
    );
    records
        .into_iter()
        .enumerate()
        .filter(|(i, r)| last.get(r.id()) == Some(i))
        .map(|(_, r)| r)
        .collect()
}
