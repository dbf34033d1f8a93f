use lifesync_protocol::{Record, RecordMeta};
use serde::{Deserialize, Serialize};

/// A captured idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    /// Identity and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Title.
    pub title: String,
    /// Body.
    #[serde(default)]
    pub content: String,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Idea {
    /// Creates an idea from validated input.
    pub fn new(input: NewIdea, now_ms: i64) -> Self {
        Self {
            meta: RecordMeta::new(Self::ID_PREFIX, now_ms),
            title: input.title,
            content: input.content,
            tags: input.tags,
        }
    }
}

/// Input for creating an idea.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewIdea {
    /// Title, must not be blank.
    pub title: String,
    /// Body.
    pub content: String,
    /// Tags.
    pub tags: Vec<String>,
}

/// A partial idea update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdeaPatch {
    /// New title.
    pub title: Option<String>,
    /// New body.
    pub content: Option<String>,
    /// New tags.
    pub tags: Option<Vec<String>>,
}

impl IdeaPatch {
    pub(crate) fn apply(self, idea: &mut Idea) {
        if let Some(title) = self.title {
            idea.title = title;
        }
        if let Some(content) = self.content {
            idea.content = content;
        }
        if let Some(tags) = self.tags {
            idea.tags = tags;
        }
    }
}
