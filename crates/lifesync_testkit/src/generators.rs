//! Property-based test generators using proptest.
//!
//! Ids are drawn from small pools so that generated snapshots overlap.

use lifesync_protocol::{Record, RecordMeta};
use lifesync_services::{NewTask, Review, ReviewType, Task};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Strategy for task ids drawn from a pool of `pool` ids.
pub fn task_id_strategy(pool: usize) -> impl Strategy<Value = String> {
    (0..pool.max(1)).prop_map(|n| format!("task_{n}"))
}

/// Strategy for `updatedAt` timestamps spread over a few seconds, so that
/// differences both below and above the skew tolerance occur.
pub fn timestamp_strategy() -> impl Strategy<Value = i64> {
    0i64..10_000
}

/// Strategy for a task with an id from the pool.
pub fn task_strategy(pool: usize) -> impl Strategy<Value = Task> {
    (
        task_id_strategy(pool),
        timestamp_strategy(),
        "[a-z]{1,8}",
        any::<bool>(),
    )
        .prop_map(|(id, updated, title, completed)| {
            let mut task = Task::new(NewTask::titled(title), 0);
            task.meta = RecordMeta::with_id(id, 0, updated);
            task.completed = completed;
            task
        })
}

/// Strategy for an id-unique snapshot of up to `max` tasks.
pub fn snapshot_strategy(pool: usize, max: usize) -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(task_strategy(pool), 0..=max).prop_map(|tasks| {
        let unique: BTreeMap<String, Task> = tasks
            .into_iter()
            .map(|t| (t.id().to_string(), t))
            .collect();
        unique.into_values().collect()
    })
}

/// Strategy for a tombstone set over the same pool.
pub fn tombstone_strategy(pool: usize) -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(task_id_strategy(pool), 0..=pool)
}

/// Strategy for review versions over a few `(type, period)` pairs.
pub fn review_versions_strategy(max: usize) -> impl Strategy<Value = Vec<Review>> {
    let period = prop_oneof![
        Just((ReviewType::Daily, "2024-06-01")),
        Just((ReviewType::Daily, "2024-06-02")),
        Just((ReviewType::Weekly, "2024-W22")),
        Just((ReviewType::Monthly, "2024-06")),
    ];
    prop::collection::vec((period, timestamp_strategy()), 0..=max).prop_map(|versions| {
        versions
            .into_iter()
            .enumerate()
            .map(|(i, ((review_type, date), updated))| Review {
                meta: RecordMeta::with_id(format!("review_{i}"), 0, updated),
                review_type,
                date: date.to_string(),
                content: format!("v{i}"),
            })
            .collect()
    })
}

/// A service-level operation for model-based tests.
#[derive(Debug, Clone)]
pub enum ServiceOperation {
    /// Create a task.
    Create {
        /// Title.
        title: String,
    },
    /// Complete the task at `index` (modulo the list length).
    Complete {
        /// Position in the local list.
        index: usize,
    },
    /// Delete the task at `index` (modulo the list length).
    Delete {
        /// Position in the local list.
        index: usize,
    },
    /// Take every remote online or offline.
    RemoteOnline {
        /// Target reachability.
        online: bool,
    },
}

/// Strategy for service operations.
pub fn service_operation_strategy() -> impl Strategy<Value = ServiceOperation> {
    prop_oneof![
        4 => "[a-z]{1,8}".prop_map(|title| ServiceOperation::Create { title }),
        2 => any::<usize>().prop_map(|index| ServiceOperation::Complete { index }),
        2 => any::<usize>().prop_map(|index| ServiceOperation::Delete { index }),
        1 => any::<bool>().prop_map(|online| ServiceOperation::RemoteOnline { online }),
    ]
}

/// Strategy for a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<ServiceOperation>> {
    prop::collection::vec(service_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn snapshots_are_id_unique(snapshot in snapshot_strategy(8, 12)) {
            let ids: BTreeSet<_> = snapshot.iter().map(|t| t.id().to_string()).collect();
            prop_assert_eq!(ids.len(), snapshot.len());
        }

        #[test]
        fn tombstones_come_from_the_pool(tombstones in tombstone_strategy(4)) {
            prop_assert!(tombstones.len() <= 4);
            prop_assert!(tombstones.iter().all(|id| id.starts_with("task_")));
        }

        #[test]
        fn review_ids_are_unique(versions in review_versions_strategy(10)) {
            let ids: BTreeSet<_> = versions.iter().map(|r| r.id().to_string()).collect();
            prop_assert_eq!(ids.len(), versions.len());
        }
    }
}
