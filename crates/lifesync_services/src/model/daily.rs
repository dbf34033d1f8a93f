use chrono::NaiveDate;
use lifesync_protocol::{Record, RecordMeta};
use serde::{Deserialize, Serialize};

/// Where a daily task is in its export lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyTaskState {
    /// Not completed.
    Pending,
    /// Completed; the export to the task collection has not happened yet.
    CompletedUnsynced,
    /// Completed and exported. Terminal.
    CompletedSynced,
}

/// A task of one day's list, generated from a [`Preset`](super::Preset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTask {
    /// Identity and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Preset this task was generated from.
    pub preset_id: String,
    /// Title copied from the preset.
    pub title: String,
    /// Local calendar date the task belongs to.
    pub date: NaiveDate,
    /// Whether the task is done.
    #[serde(default)]
    pub completed: bool,
    /// When the task was completed, Unix milliseconds.
    #[serde(default)]
    pub completed_at: Option<i64>,
    /// Whether the completion was exported to the task collection.
    #[serde(default)]
    pub synced_to_collection: bool,
}

impl DailyTask {
    /// Creates a pending task for `date`.
    pub fn new(preset_id: String, title: String, date: NaiveDate, now_ms: i64) -> Self {
        Self {
            meta: RecordMeta::new(Self::ID_PREFIX, now_ms),
            preset_id,
            title,
            date,
            completed: false,
            completed_at: None,
            synced_to_collection: false,
        }
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> DailyTaskState {
        match (self.completed, self.synced_to_collection) {
            (_, true) => DailyTaskState::CompletedSynced,
            (true, false) => DailyTaskState::CompletedUnsynced,
            (false, false) => DailyTaskState::Pending,
        }
    }
}
