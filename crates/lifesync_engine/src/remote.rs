//! Remote client abstraction and an in-memory mock.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use lifesync_protocol::Record;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// A partial record: the fields to overwrite, keyed by wire name.
pub type RecordPatch = Map<String, Value>;

/// Builds an update patch carrying every field of `record` except `id`.
pub fn patch_of<R: Record>(record: &R) -> SyncResult<RecordPatch> {
    match serde_json::to_value(record).map_err(|e| SyncError::codec(record.id(), e))? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(SyncError::Protocol(format!(
            "{} record serialized to non-object {other}",
            R::KIND
        ))),
    }
}

/// CRUD over one entity type on the remote store.
#[async_trait]
pub trait RemoteClient<R: Record>: Send + Sync {
    /// Returns the full remote collection.
    async fn list(&self) -> SyncResult<Vec<R>>;

    /// Creates `record` remotely and returns the stored version.
    async fn create(&self, record: &R) -> SyncResult<R>;

    /// Applies `patch` to the remote record `id`.
    async fn update(&self, id: &str, patch: &RecordPatch) -> SyncResult<R>;

    /// Deletes the remote record `id`.
    async fn delete(&self, id: &str) -> SyncResult<()>;
}

/// A remote for pure local mode: every call fails with a non-retryable
/// network error. Used when no server is configured and the cloud flag
/// stays off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedRemote;

#[async_trait]
impl<R: Record> RemoteClient<R> for DetachedRemote {
    async fn list(&self) -> SyncResult<Vec<R>> {
        Err(SyncError::network_fatal("no remote configured"))
    }

    async fn create(&self, _record: &R) -> SyncResult<R> {
        Err(SyncError::network_fatal("no remote configured"))
    }

    async fn update(&self, _id: &str, _patch: &RecordPatch) -> SyncResult<R> {
        Err(SyncError::network_fatal("no remote configured"))
    }

    async fn delete(&self, _id: &str) -> SyncResult<()> {
        Err(SyncError::network_fatal("no remote configured"))
    }
}

/// Remote operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOp {
    /// `list`
    List,
    /// `create`
    Create,
    /// `update`
    Update,
    /// `delete`
    Delete,
}

/// A failure the mock returns once for a given operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Retryable network error.
    Network,
    /// Timeout.
    Timeout,
    /// Remote "not found".
    NotFound,
    /// Remote "already exists".
    AlreadyExists,
    /// Generic server error.
    Server(String),
}

impl MockFailure {
    fn into_error(self, id: &str) -> SyncError {
        match self {
            MockFailure::Network => SyncError::network_retryable("injected network failure"),
            MockFailure::Timeout => SyncError::Timeout,
            MockFailure::NotFound => SyncError::RemoteNotFound(format!("{id} 不存在")),
            MockFailure::AlreadyExists => SyncError::RemoteAlreadyExists(format!("{id} 已存在")),
            MockFailure::Server(message) => SyncError::Remote { code: 500, message },
        }
    }
}

/// Per-operation call counts of a [`MockRemoteClient`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteCalls {
    /// `list` calls.
    pub list: u64,
    /// `create` calls.
    pub create: u64,
    /// `update` calls.
    pub update: u64,
    /// `delete` calls.
    pub delete: u64,
}

impl RemoteCalls {
    /// Total number of calls.
    pub fn total(&self) -> u64 {
        self.list + self.create + self.update + self.delete
    }

    /// Number of write calls (create, update, delete).
    pub fn writes(&self) -> u64 {
        self.create + self.update + self.delete
    }
}

/// An in-memory remote store for tests.
///
/// Counts every call (including failed ones), can be switched offline and
/// can fail the next call of a given operation.
#[derive(Debug)]
pub struct MockRemoteClient<R> {
    records: Mutex<Vec<R>>,
    failures: Mutex<VecDeque<(RemoteOp, MockFailure)>>,
    online: AtomicBool,
    latency: Mutex<Option<Duration>>,
    list_calls: AtomicU64,
    create_calls: AtomicU64,
    update_calls: AtomicU64,
    delete_calls: AtomicU64,
}

impl<R: Record> Default for MockRemoteClient<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> MockRemoteClient<R> {
    /// Creates an empty, online mock.
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Creates an online mock holding `records`.
    pub fn with_records(records: Vec<R>) -> Self {
        Self {
            records: Mutex::new(records),
            failures: Mutex::new(VecDeque::new()),
            online: AtomicBool::new(true),
            latency: Mutex::new(None),
            list_calls: AtomicU64::new(0),
            create_calls: AtomicU64::new(0),
            update_calls: AtomicU64::new(0),
            delete_calls: AtomicU64::new(0),
        }
    }

    /// Switches the mock online or offline. Offline calls fail with a
    /// retryable network error.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Fails the next call of `op` with `failure`.
    pub fn fail_next(&self, op: RemoteOp, failure: MockFailure) {
        self.failures.lock().push_back((op, failure));
    }

    /// Returns the remote collection.
    pub fn records(&self) -> Vec<R> {
        self.records.lock().clone()
    }

    /// Returns the remote record `id`.
    pub fn get(&self, id: &str) -> Option<R> {
        self.records.lock().iter().find(|r| r.id() == id).cloned()
    }

    /// Inserts or replaces a remote record directly, without counting.
    pub fn insert(&self, record: R) {
        let mut records = self.records.lock();
        match records.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Returns the call counts.
    pub fn calls(&self) -> RemoteCalls {
        RemoteCalls {
            list: self.list_calls.load(Ordering::SeqCst),
            create: self.create_calls.load(Ordering::SeqCst),
            update: self.update_calls.load(Ordering::SeqCst),
            delete: self.delete_calls.load(Ordering::SeqCst),
        }
    }

    async fn enter(&self, op: RemoteOp, id: &str) -> SyncResult<()> {
        let counter = match op {
            RemoteOp::List => &self.list_calls,
            RemoteOp::Create => &self.create_calls,
            RemoteOp::Update => &self.update_calls,
            RemoteOp::Delete => &self.delete_calls,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(SyncError::network_retryable("remote unreachable"));
        }
        let injected = {
            let mut failures = self.failures.lock();
            let pos = failures.iter().position(|(o, _)| *o == op);
            pos.and_then(|pos| failures.remove(pos))
        };
        match injected {
            Some((_, failure)) => Err(failure.into_error(id)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<R: Record> RemoteClient<R> for MockRemoteClient<R> {
    async fn list(&self) -> SyncResult<Vec<R>> {
        self.enter(RemoteOp::List, "").await?;
        Ok(self.records())
    }

    async fn create(&self, record: &R) -> SyncResult<R> {
        self.enter(RemoteOp::Create, record.id()).await?;
        let mut records = self.records.lock();
        if records.iter().any(|r| r.id() == record.id()) {
            return Err(MockFailure::AlreadyExists.into_error(record.id()));
        }
        records.push(record.clone());
        Ok(record.clone())
    }

    async fn update(&self, id: &str, patch: &RecordPatch) -> SyncResult<R> {
        self.enter(RemoteOp::Update, id).await?;
        let mut records = self.records.lock();
        let existing = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| MockFailure::NotFound.into_error(id))?;

        let mut value = serde_json::to_value(&*existing).map_err(|e| SyncError::codec(id, e))?;
        if let Value::Object(fields) = &mut value {
            for (name, field) in patch {
                if name != "id" {
                    fields.insert(name.clone(), field.clone());
                }
            }
        }
        let updated: R = serde_json::from_value(value).map_err(|e| SyncError::codec(id, e))?;
        *existing = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> SyncResult<()> {
        self.enter(RemoteOp::Delete, id).await?;
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Err(MockFailure::NotFound.into_error(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifesync_protocol::RecordMeta;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Card {
        #[serde(flatten)]
        meta: RecordMeta,
        front: String,
    }

    impl Record for Card {
        const KIND: &'static str = "cards";
        const ID_PREFIX: &'static str = "card";

        fn meta(&self) -> &RecordMeta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut RecordMeta {
            &mut self.meta
        }
    }

    fn card(id: &str, front: &str, updated: i64) -> Card {
        Card {
            meta: RecordMeta::with_id(id, 0, updated),
            front: front.into(),
        }
    }

    #[test]
    fn patch_omits_id() {
        let patch = patch_of(&card("c1", "hola", 5)).unwrap();
        assert!(!patch.contains_key("id"));
        assert_eq!(patch["front"], "hola");
        assert_eq!(patch["updatedAt"], 5);
    }

    #[tokio::test]
    async fn crud_semantics() {
        let remote = MockRemoteClient::<Card>::new();
        remote.create(&card("c1", "a", 1)).await.unwrap();
        assert!(remote
            .create(&card("c1", "a", 1))
            .await
            .unwrap_err()
            .is_already_exists());

        let patch = patch_of(&card("c1", "b", 2)).unwrap();
        let updated = remote.update("c1", &patch).await.unwrap();
        assert_eq!(updated.front, "b");
        assert!(remote.update("nope", &patch).await.unwrap_err().is_not_found());

        remote.delete("c1").await.unwrap();
        assert!(remote.delete("c1").await.unwrap_err().is_not_found());
        assert!(remote.list().await.unwrap().is_empty());

        let calls = remote.calls();
        assert_eq!(calls.create, 2);
        assert_eq!(calls.update, 2);
        assert_eq!(calls.delete, 2);
        assert_eq!(calls.list, 1);
        assert_eq!(calls.total(), 7);
    }

    #[tokio::test]
    async fn offline_and_injected_failures() {
        let remote = MockRemoteClient::with_records(vec![card("c1", "a", 1)]);
        remote.set_online(false);
        let err = remote.list().await.unwrap_err();
        assert!(err.is_retryable());
        remote.set_online(true);

        remote.fail_next(RemoteOp::Delete, MockFailure::Server("boom".into()));
        assert!(matches!(
            remote.delete("c1").await,
            Err(SyncError::Remote { code: 500, .. })
        ));
        remote.delete("c1").await.unwrap();
        assert_eq!(remote.calls().delete, 2);
    }
}
