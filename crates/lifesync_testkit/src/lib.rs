//! # LifeSync Testkit
//!
//! Test utilities for LifeSync.
//!
//! This crate provides:
//! - [`TestWorld`]: every service over a store, a manual clock and mock
//!   remotes, in memory or on disk
//! - Property-based test generators using proptest
//! - Concurrency stress helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lifesync_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn creates_offline() {
//!     let world = TestWorld::offline();
//!     world.services.tasks.create(NewTask::titled("a")).await.unwrap();
//!     world.flush().await;
//!     assert_eq!(world.remotes.total_calls(), 0);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use lifesync_engine::{Clock, PullStatus, SyncState};
    pub use lifesync_protocol::Record;
    pub use lifesync_services::{NewTask, ReviewType};
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
