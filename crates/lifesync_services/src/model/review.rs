use chrono::{Datelike, NaiveDate};
use lifesync_protocol::{Record, RecordMeta};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Review granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewType {
    /// One review per day, period `YYYY-MM-DD`.
    Daily,
    /// One review per ISO week, period `YYYY-Www`.
    Weekly,
    /// One review per month, period `YYYY-MM`.
    Monthly,
    /// One review per year, period `YYYY`.
    Yearly,
}

impl ReviewType {
    /// Every granularity.
    pub const ALL: [ReviewType; 4] = [
        ReviewType::Daily,
        ReviewType::Weekly,
        ReviewType::Monthly,
        ReviewType::Yearly,
    ];

    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewType::Daily => "daily",
            ReviewType::Weekly => "weekly",
            ReviewType::Monthly => "monthly",
            ReviewType::Yearly => "yearly",
        }
    }

    /// Returns the period key containing `date`.
    pub fn period_of(&self, date: NaiveDate) -> String {
        match self {
            ReviewType::Daily => date.format("%Y-%m-%d").to_string(),
            ReviewType::Weekly => {
                let week = date.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            ReviewType::Monthly => date.format("%Y-%m").to_string(),
            ReviewType::Yearly => format!("{:04}", date.year()),
        }
    }

    /// Returns the sync cursor scope of this granularity.
    pub fn cursor_scope(&self) -> String {
        format!("{}.{}", Review::KIND, self.as_str())
    }
}

impl fmt::Display for ReviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One version of a periodic reflection.
///
/// The remote keeps every version; the local collection keeps only the
/// newest version per `(review_type, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Identity and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Granularity.
    #[serde(rename = "type")]
    pub review_type: ReviewType,
    /// Period key, see [`ReviewType::period_of`].
    pub date: String,
    /// Body.
    #[serde(default)]
    pub content: String,
}

impl Review {
    /// Creates a new version.
    pub fn new(review_type: ReviewType, date: String, content: String, now_ms: i64) -> Self {
        Self {
            meta: RecordMeta::new(Self::ID_PREFIX, now_ms),
            review_type,
            date,
            content,
        }
    }

    /// Returns the `(type, period)` compaction key.
    pub fn period_key(&self) -> (ReviewType, String) {
        (self.review_type, self.date.clone())
    }
}
