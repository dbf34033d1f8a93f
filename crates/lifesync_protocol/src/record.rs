//! The record shape shared by every synced entity.

use crate::id::generate_id;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identity and timestamps carried by every record.
///
/// Entities embed this with `#[serde(flatten)]`, so on the wire and on disk
/// the fields appear as `id`, `createdAt` and `updatedAt` next to the domain
/// fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    /// Opaque id, generated locally.
    pub id: String,
    /// Creation time, Unix milliseconds.
    pub created_at: i64,
    /// Last modification time, Unix milliseconds.
    pub updated_at: i64,
}

impl RecordMeta {
    /// Creates metadata for a brand-new record with a fresh id.
    pub fn new(prefix: &str, now_ms: i64) -> Self {
        Self {
            id: generate_id(prefix, now_ms),
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Creates metadata with an explicit id.
    pub fn with_id(id: impl Into<String>, created_at: i64, updated_at: i64) -> Self {
        Self {
            id: id.into(),
            created_at,
            updated_at,
        }
    }
}

/// A synced entity.
///
/// # Invariants
///
/// - `id` is unique within a collection
/// - `updated_at` never moves backwards for a local edit
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name, used for storage keys and logs (e.g. `tasks`).
    const KIND: &'static str;

    /// Prefix for generated ids (e.g. `task`).
    const ID_PREFIX: &'static str;

    /// Returns the record metadata.
    fn meta(&self) -> &RecordMeta;

    /// Returns the record metadata mutably.
    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Returns the record id.
    fn id(&self) -> &str {
        &self.meta().id
    }

    /// Returns the creation time in Unix milliseconds.
    fn created_at(&self) -> i64 {
        self.meta().created_at
    }

    /// Returns the modification time in Unix milliseconds.
    fn updated_at(&self) -> i64 {
        self.meta().updated_at
    }

    /// Refreshes `updated_at` after a local edit.
    fn touch(&mut self, now_ms: i64) {
        let meta = self.meta_mut();
        meta.updated_at = now_ms.max(meta.updated_at);
    }
}

/// Collects the ids of a snapshot.
pub fn ids<R: Record>(records: &[R]) -> BTreeSet<String> {
    records.iter().map(|r| r.id().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Memo {
        #[serde(flatten)]
        meta: RecordMeta,
        body: String,
    }

    impl Record for Memo {
        const KIND: &'static str = "memos";
        const ID_PREFIX: &'static str = "memo";

        fn meta(&self) -> &RecordMeta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut RecordMeta {
            &mut self.meta
        }
    }

    #[test]
    fn meta_new_uses_prefix_and_time() {
        let meta = RecordMeta::new("memo", 1_700_000_000_000);
        assert!(meta.id.starts_with("memo_1700000000000_"));
        assert_eq!(meta.created_at, meta.updated_at);
    }

    #[test]
    fn flattened_fields_are_camel_case() {
        let memo = Memo {
            meta: RecordMeta::with_id("memo_1", 10, 20),
            body: "hi".into(),
        };
        let json = serde_json::to_value(&memo).unwrap();
        assert_eq!(json["id"], "memo_1");
        assert_eq!(json["createdAt"], 10);
        assert_eq!(json["updatedAt"], 20);
        assert_eq!(json["body"], "hi");

        let back: Memo = serde_json::from_value(json).unwrap();
        assert_eq!(back.id(), "memo_1");
        assert_eq!(back.updated_at(), 20);
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut memo = Memo {
            meta: RecordMeta::with_id("memo_1", 10, 500),
            body: String::new(),
        };
        memo.touch(100);
        assert_eq!(memo.updated_at(), 500);
        memo.touch(900);
        assert_eq!(memo.updated_at(), 900);
    }

    #[test]
    fn ids_collects_snapshot_ids() {
        let memos = vec![
            Memo {
                meta: RecordMeta::with_id("a", 0, 0),
                body: String::new(),
            },
            Memo {
                meta: RecordMeta::with_id("b", 0, 0),
                body: String::new(),
            },
        ];
        let set = ids(&memos);
        assert!(set.contains("a") && set.contains("b"));
    }
}
