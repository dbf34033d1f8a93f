//! # LifeSync Storage
//!
//! Local key-value storage trait and implementations for LifeSync.
//!
//! This crate provides the lowest-level storage abstraction for LifeSync.
//! Stores are **opaque string maps** - they do not interpret the values
//! they hold.
//!
//! ## Design Principles
//!
//! - Stores are simple key-value maps (get, set, remove)
//! - No knowledge of record layouts, tombstones, or sync cursors
//! - Must be `Send + Sync` for shared access from services and background jobs
//! - A successful `set_item` is durable; a single write is never torn
//!
//! ## Available Stores
//!
//! - [`InMemoryKvStore`] - For testing and ephemeral storage
//! - [`FileKvStore`] - For persistent storage, one file per key
//!
//! ## Example
//!
//! ```rust
//! use lifesync_storage::{InMemoryKvStore, KvStore};
//!
//! # async fn demo() -> lifesync_storage::StorageResult<()> {
//! let store = InMemoryKvStore::new();
//! store.set_item("greeting", "hello").await?;
//! assert_eq!(store.get_item("greeting").await?.as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::KvStore;
pub use error::{StorageError, StorageResult};
pub use file::FileKvStore;
pub use memory::InMemoryKvStore;
