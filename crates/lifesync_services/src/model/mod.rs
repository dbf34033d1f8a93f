//! Synced entity models.
//!
//! Every model embeds [`RecordMeta`](lifesync_protocol::RecordMeta) with
//! `#[serde(flatten)]`, so records serialize as flat camelCase objects:
//! `{"id": .., "createdAt": .., "updatedAt": .., <domain fields>}`.

mod daily;
mod idea;
mod preset;
mod review;
mod task;

pub use daily::{DailyTask, DailyTaskState};
pub use idea::{Idea, IdeaPatch, NewIdea};
pub use preset::{Preset, PresetPatch};
pub use review::{Review, ReviewType};
pub use task::{NewTask, Priority, Task, TaskPatch};

macro_rules! impl_record {
    ($ty:ty, $kind:literal, $prefix:literal) => {
        impl lifesync_protocol::Record for $ty {
            const KIND: &'static str = $kind;
            const ID_PREFIX: &'static str = $prefix;

            fn meta(&self) -> &lifesync_protocol::RecordMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut lifesync_protocol::RecordMeta {
                &mut self.meta
            }
        }
    };
}

impl_record!(Task, "tasks", "task");
impl_record!(Idea, "ideas", "idea");
impl_record!(Review, "reviews", "review");
impl_record!(Preset, "presets", "preset");
impl_record!(DailyTask, "daily_tasks", "daily");

/// Trims `value` and rejects it if empty.
pub(crate) fn required_text(field: &str, value: &str) -> Result<String, crate::ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::ServiceError::InvalidInput(format!(
            "{field} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}
