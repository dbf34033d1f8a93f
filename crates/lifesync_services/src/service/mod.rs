//! Entity services.
//!
//! Each service owns the [`SyncCoordinator`](lifesync_engine::SyncCoordinator)
//! of its entity type. Public calls resolve once local storage is written;
//! remote work is scheduled in the background.

mod daily;
mod idea;
mod preset;
mod review;
mod task;

pub use daily::DailyTaskService;
pub use idea::IdeaService;
pub use preset::PresetService;
pub use review::{compact_reviews, ReviewService};
pub use task::TaskService;
