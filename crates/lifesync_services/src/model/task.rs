use chrono::NaiveDate;
use lifesync_protocol::{Record, RecordMeta};
use serde::{Deserialize, Serialize};

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low.
    Low,
    /// Medium.
    #[default]
    Medium,
    /// High.
    High,
}

/// An entry of the general task collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Identity and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Title.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// Whether the task is done.
    #[serde(default)]
    pub completed: bool,
    /// When the task was completed, Unix milliseconds.
    #[serde(default)]
    pub completed_at: Option<i64>,
    /// Optional due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// The daily task this entry was exported from.
    #[serde(default)]
    pub source_daily_task_id: Option<String>,
}

impl Task {
    /// Creates a task from validated input.
    pub fn new(input: NewTask, now_ms: i64) -> Self {
        Self {
            meta: RecordMeta::new(Self::ID_PREFIX, now_ms),
            title: input.title,
            description: input.description,
            priority: input.priority,
            completed: false,
            completed_at: None,
            due_date: input.due_date,
            tags: input.tags,
            source_daily_task_id: None,
        }
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    /// Title, must not be blank.
    pub title: String,
    /// Description.
    pub description: String,
    /// Priority.
    pub priority: Priority,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Tags.
    pub tags: Vec<String>,
}

impl NewTask {
    /// Creates input with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// A partial task update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New due date; `Some(None)` clears it.
    pub due_date: Option<Option<NaiveDate>>,
    /// New tags.
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
    }
}
