//! Key-value store trait definition.

use crate::error::StorageResult;
use async_trait::async_trait;

/// A durable local key-value store.
///
/// Stores are **opaque string maps**. They provide get, set and remove on
/// string keys. LifeSync owns all value interpretation - stores do not
/// understand collections, tombstones, or sync markers.
///
/// # Invariants
///
/// - `get_item` returns exactly the value most recently passed to `set_item`
/// - `set_item` replaces the whole value atomically (no torn writes)
/// - `remove_item` on a missing key is not an error
/// - Stores must be `Send + Sync` for shared access
///
/// # Implementors
///
/// - [`super::InMemoryKvStore`] - For testing
/// - [`super::FileKvStore`] - For persistent storage
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key has never been written or was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read.
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    async fn remove_item(&self, key: &str) -> StorageResult<()>;
}
