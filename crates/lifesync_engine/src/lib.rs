//! # LifeSync Engine
//!
//! Local-first sync coordinator for LifeSync entity collections.
//!
//! This crate provides:
//! - Whole-collection repositories over a local key-value store
//! - Tombstone and pending-push tracking
//! - Sync cursors and the day-boundary marker
//! - The remote client abstraction, an HTTP implementation and a mock
//! - A bounded background queue for fire-and-forget remote work
//! - The sync coordinator (pull, merge, push, delete)
//!
//! ## Architecture
//!
//! Every public write completes against local storage first; remote work
//! is queued and never fails the caller:
//! 1. Write the collection locally (serialized per entity type)
//! 2. Record the change as pending
//! 3. Queue a push (or a remote delete) on the background queue
//!
//! A pull lists the remote collection, merges it into the local snapshot
//! with last-writer-wins and persists the result.
//!
//! ## Key Invariants
//!
//! - A tombstoned id is never written back into a collection by a pull
//! - A tombstone is cleared only when the remote confirms the delete
//! - Only local storage failures reach the caller
//! - While a pull runs, the writes it performs push nothing
//! - With the cloud flag off, no remote call is made

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod cloud;
mod config;
mod context;
mod coordinator;
mod error;
mod http;
mod idset;
mod markers;
mod queue;
mod remote;
mod repository;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cloud::CloudFlag;
pub use config::{
    StorageKeys, SyncConfig, DEFAULT_GRACE_WINDOW, DEFAULT_KEY_NAMESPACE, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_REMOTE_TIMEOUT, DEFAULT_SKEW_TOLERANCE,
};
pub use context::SyncContext;
pub use coordinator::{
    PostMergeHook, PullReport, PullStatus, PushMode, SyncCoordinator, SyncReport, SyncState,
    SyncStats, UnionReport, WriteOptions, WriteOrigin,
};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpMethod, HttpRemoteClient, HttpRequest, HttpResponse};
pub use idset::{IdSet, PendingPushes, TombstoneTracker};
pub use markers::MarkerStore;
pub use queue::{BackgroundQueue, QueueStats};
pub use remote::{
    patch_of, DetachedRemote, MockFailure, MockRemoteClient, RecordPatch, RemoteCalls,
    RemoteClient, RemoteOp,
};
pub use repository::Repository;
