//! # LifeSync Services
//!
//! Entity services and sync policies for a local-first productivity app.
//!
//! This crate provides:
//! - The synced models: tasks, ideas, reviews, presets and daily tasks
//! - One service per model, with its domain rules
//! - The day-boundary initializer that generates each day's task list
//! - [`AppServices`], which wires everything onto one
//!   [`SyncContext`](lifesync_engine::SyncContext)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 AppServices                  │
//! │  tasks · ideas · reviews · presets · daily   │
//! ├──────────────────────────────────────────────┤
//! │        SyncCoordinator<R> (per model)        │
//! ├──────────────────────────────────────────────┤
//! │      KvStore            RemoteClient<R>      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Key Invariants
//!
//! - A call succeeds whenever local storage is healthy, online or offline
//! - Remote failures never reach callers; policy violations always do
//! - Only the current period of a review is editable
//! - An exported daily task can be neither uncompleted nor deleted

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod app;
mod day_boundary;
mod error;
pub mod model;
mod service;
#[cfg(test)]
mod testing;

pub use app::{AppServices, RemoteClients, SyncAllReport};
pub use day_boundary::{DayBoundaryInitializer, DayInitAction, DayInitReport, DAILY_INIT_MARKER};
pub use error::{PolicyViolation, ServiceError, ServiceResult};
pub use model::{
    DailyTask, DailyTaskState, Idea, IdeaPatch, NewIdea, NewTask, Preset, PresetPatch, Priority,
    Review, ReviewType, Task, TaskPatch,
};
pub use service::{
    compact_reviews, DailyTaskService, IdeaService, PresetService, ReviewService, TaskService,
};
