//! # LifeSync Protocol
//!
//! Record model, wire envelope and merge rules for LifeSync.
//!
//! This crate provides:
//! - [`Record`] and [`RecordMeta`], the shape every synced entity shares
//! - Locally generated record ids (`prefix_timestamp_random`)
//! - [`ApiEnvelope`], the `{code, message, data}` wire response
//! - Remote failure classification (not found / already exists)
//! - Last-writer-wins and union merges that never resurrect tombstoned ids
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
mod id;
mod merge;
mod record;

pub use envelope::{classify_failure, ApiEnvelope, FailureKind, RemoteFailure};
pub use id::generate_id;
pub use merge::{
    merge_last_writer_wins, merge_union, retain_latest_by, MergeOutcome, MergePolicy,
    UnionOutcome, DEFAULT_GRACE_WINDOW_MS, DEFAULT_SKEW_TOLERANCE_MS,
};
pub use record::{ids, Record, RecordMeta};
