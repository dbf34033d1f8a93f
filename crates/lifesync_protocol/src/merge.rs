//! Merge rules between a local snapshot and a remote snapshot.
//!
//! Both merges treat the local snapshot as the baseline and never let a
//! tombstoned id back in, whatever its remote `updated_at`.

use crate::record::Record;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hash;

/// Remote wins only when it is newer by strictly more than this.
pub const DEFAULT_SKEW_TOLERANCE_MS: i64 = 1_000;

/// Local-only records younger than this survive a union merge.
pub const DEFAULT_GRACE_WINDOW_MS: i64 = 60 * 60 * 1_000;

/// Tunables for merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    /// Clock-skew tolerance for last-writer-wins, in milliseconds.
    pub skew_tolerance_ms: i64,
    /// Grace window for local-only records in a union merge, in milliseconds.
    pub grace_window_ms: i64,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            skew_tolerance_ms: DEFAULT_SKEW_TOLERANCE_MS,
            grace_window_ms: DEFAULT_GRACE_WINDOW_MS,
        }
    }
}

/// Result of a last-writer-wins merge.
#[derive(Debug, Clone)]
pub struct MergeOutcome<R> {
    /// The merged snapshot.
    pub records: Vec<R>,
    /// Ids whose local version was replaced by the remote one.
    pub replaced: Vec<String>,
    /// Ids that only existed remotely and were appended.
    pub added: Vec<String>,
    /// Remote ids skipped because they are tombstoned.
    pub suppressed: Vec<String>,
}

impl<R> MergeOutcome<R> {
    /// Returns true if the merge changed the local snapshot.
    pub fn changed(&self) -> bool {
        !self.replaced.is_empty() || !self.added.is_empty()
    }
}

/// Merges `remote` into `local` with last-writer-wins.
///
/// - tombstoned ids are never taken from either side
/// - an id present on both sides takes the remote version only if
///   `remote.updated_at - local.updated_at > policy.skew_tolerance_ms`
/// - remote-only ids are appended in remote order
///
/// Local records keep their order.
pub fn merge_last_writer_wins<R: Record>(
    local: &[R],
    remote: &[R],
    tombstones: &BTreeSet<String>,
    policy: &MergePolicy,
) -> MergeOutcome<R> {
    let mut records: Vec<R> = local
        .iter()
        .filter(|r| !tombstones.contains(r.id()))
        .cloned()
        .collect();
    let mut index: HashMap<String, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id().to_string(), i))
        .collect();

    let mut outcome = MergeOutcome {
        records: Vec::new(),
        replaced: Vec::new(),
        added: Vec::new(),
        suppressed: Vec::new(),
    };

    for candidate in remote {
        let id = candidate.id();
        if tombstones.contains(id) {
            outcome.suppressed.push(id.to_string());
            continue;
        }
        match index.get(id) {
            Some(&pos) => {
                let local_updated = records[pos].updated_at();
                let lead = candidate.updated_at().saturating_sub(local_updated);
                if lead > policy.skew_tolerance_ms {
                    records[pos] = candidate.clone();
                    outcome.replaced.push(id.to_string());
                }
            }
            None => {
                index.insert(id.to_string(), records.len());
                records.push(candidate.clone());
                outcome.added.push(id.to_string());
            }
        }
    }

    outcome.records = records;
    outcome
}

/// Result of a union merge.
#[derive(Debug, Clone)]
pub struct UnionOutcome<R> {
    /// The merged snapshot.
    pub records: Vec<R>,
    /// Ids present on both sides where the remote version won.
    pub remote_newer: Vec<String>,
    /// Remote-only ids that were added.
    pub added: Vec<String>,
    /// Local-only ids kept (young or still pending push).
    pub kept_local_only: Vec<String>,
    /// Local-only ids dropped because the remote no longer has them.
    pub dropped_local_only: Vec<String>,
}

/// Computes the union of both snapshots by id.
///
/// - ids on both sides: the strictly newer `updated_at` wins, ties keep local
/// - remote-only ids are added unless tombstoned
/// - local-only ids are kept if created less than `grace_window_ms` before
///   `now_ms`, or if listed in `pending`; otherwise they are treated as
///   deleted elsewhere and dropped
pub fn merge_union<R: Record>(
    local: &[R],
    remote: &[R],
    tombstones: &BTreeSet<String>,
    pending: &BTreeSet<String>,
    now_ms: i64,
    policy: &MergePolicy,
) -> UnionOutcome<R> {
    let remote_by_id: HashMap<&str, &R> = remote
        .iter()
        .filter(|r| !tombstones.contains(r.id()))
        .map(|r| (r.id(), r))
        .collect();

    let mut outcome = UnionOutcome {
        records: Vec::new(),
        remote_newer: Vec::new(),
        added: Vec::new(),
        kept_local_only: Vec::new(),
        dropped_local_only: Vec::new(),
    };
    let mut seen: HashSet<String> = HashSet::new();

    for record in local.iter().filter(|r| !tombstones.contains(r.id())) {
        let id = record.id();
        if !seen.insert(id.to_string()) {
            continue;
        }
        match remote_by_id.get(id) {
            Some(theirs) if theirs.updated_at() > record.updated_at() => {
                outcome.records.push((*theirs).clone());
                outcome.remote_newer.push(id.to_string());
            }
            Some(_) => outcome.records.push(record.clone()),
            None => {
                let young = now_ms.saturating_sub(record.created_at()) < policy.grace_window_ms;
                if young || pending.contains(id) {
                    outcome.records.push(record.clone());
                    outcome.kept_local_only.push(id.to_string());
                } else {
                    outcome.dropped_local_only.push(id.to_string());
                }
            }
        }
    }

    for record in remote.iter().filter(|r| !tombstones.contains(r.id())) {
        if seen.insert(record.id().to_string()) {
            outcome.records.push(record.clone());
            outcome.added.push(record.id().to_string());
        }
    }

    outcome
}

/// Keeps, for every key, only the record with the greatest `updated_at`.
///
/// Ties keep the record that appears first. The surviving records keep
/// their relative order.
pub fn retain_latest_by<R, K, F>(records: Vec<R>, key: F) -> Vec<R>
where
    R: Record,
    K: Eq + Hash,
    F: Fn(&R) -> K,
{
    let mut winners: HashMap<K, usize> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        winners
            .entry(key(record))
            .and_modify(|best| {
                if record.updated_at() > records[*best].updated_at() {
                    *best = i;
                }
            })
            .or_insert(i);
    }
    let keep: HashSet<usize> = winners.into_values().collect();
    records
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(i))
        .map(|(_, r)| r)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ids, RecordMeta};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        #[serde(flatten)]
        meta: RecordMeta,
        label: String,
    }

    impl Record for Item {
        const KIND: &'static str = "items";
        const ID_PREFIX: &'static str = "item";

        fn meta(&self) -> &RecordMeta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut RecordMeta {
            &mut self.meta
        }
    }

    fn item(id: &str, updated_at: i64, label: &str) -> Item {
        Item {
            meta: RecordMeta::with_id(id, 0, updated_at),
            label: label.into(),
        }
    }

    fn created(id: &str, created_at: i64) -> Item {
        Item {
            meta: RecordMeta::with_id(id, created_at, created_at),
            label: String::new(),
        }
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn newer_remote_replaces_and_new_remote_is_appended() {
        let local = vec![item("A", 100, "local")];
        let remote = vec![item("A", 6000, "remote"), item("B", 50, "b")];

        let outcome =
            merge_last_writer_wins(&local, &remote, &BTreeSet::new(), &MergePolicy::default());

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].label, "remote");
        assert_eq!(outcome.records[1].id(), "B");
        assert_eq!(outcome.replaced, vec!["A".to_string()]);
        assert_eq!(outcome.added, vec!["B".to_string()]);
        assert!(outcome.changed());
    }

    #[test]
    fn tombstoned_remote_is_not_resurrected() {
        let remote = vec![item("X", i64::MAX / 2, "zombie")];
        let outcome =
            merge_last_writer_wins(&[], &remote, &set(&["X"]), &MergePolicy::default());

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.suppressed, vec!["X".to_string()]);
        assert!(!outcome.changed());
    }

    #[test]
    fn skew_tolerance_boundary() {
        let policy = MergePolicy::default();
        let local = vec![item("A", 1_000, "local")];

        let exactly = vec![item("A", 2_000, "remote")];
        let outcome = merge_last_writer_wins(&local, &exactly, &BTreeSet::new(), &policy);
        assert_eq!(outcome.records[0].label, "local");

        let beyond = vec![item("A", 2_001, "remote")];
        let outcome = merge_last_writer_wins(&local, &beyond, &BTreeSet::new(), &policy);
        assert_eq!(outcome.records[0].label, "remote");
    }

    #[test]
    fn older_remote_never_wins() {
        let local = vec![item("A", 10_000, "local")];
        let remote = vec![item("A", 1, "remote")];
        let outcome =
            merge_last_writer_wins(&local, &remote, &BTreeSet::new(), &MergePolicy::default());
        assert_eq!(outcome.records[0].label, "local");
    }

    #[test]
    fn tombstoned_local_leftover_is_dropped() {
        let local = vec![item("A", 1, "a"), item("B", 1, "b")];
        let outcome = merge_last_writer_wins(&local, &[], &set(&["B"]), &MergePolicy::default());
        assert_eq!(ids(&outcome.records), set(&["A"]));
    }

    #[test]
    fn union_keeps_young_local_only_record() {
        let now = 10 * 60 * 1_000 + 1_000_000;
        let local = vec![created("P", now - 10 * 60 * 1_000)];
        let outcome = merge_union(
            &local,
            &[],
            &BTreeSet::new(),
            &BTreeSet::new(),
            now,
            &MergePolicy::default(),
        );
        assert_eq!(ids(&outcome.records), set(&["P"]));
        assert_eq!(outcome.kept_local_only, vec!["P".to_string()]);
    }

    #[test]
    fn union_drops_old_local_only_record_unless_pending() {
        let now = 10 * DEFAULT_GRACE_WINDOW_MS;
        let local = vec![created("old", 0), created("queued", 0)];
        let outcome = merge_union(
            &local,
            &[],
            &BTreeSet::new(),
            &set(&["queued"]),
            now,
            &MergePolicy::default(),
        );
        assert_eq!(ids(&outcome.records), set(&["queued"]));
        assert_eq!(outcome.dropped_local_only, vec!["old".to_string()]);
    }

    #[test]
    fn union_newer_side_wins_and_ties_keep_local() {
        let local = vec![item("A", 10, "local-a"), item("B", 50, "local-b")];
        let remote = vec![item("A", 11, "remote-a"), item("B", 50, "remote-b"), item("C", 1, "c")];
        let outcome = merge_union(
            &local,
            &remote,
            &BTreeSet::new(),
            &BTreeSet::new(),
            0,
            &MergePolicy::default(),
        );
        let labels: Vec<_> = outcome.records.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["remote-a", "local-b", "c"]);
        assert_eq!(outcome.remote_newer, vec!["A".to_string()]);
        assert_eq!(outcome.added, vec!["C".to_string()]);
    }

    #[test]
    fn union_respects_tombstones() {
        let remote = vec![item("gone", 99, "")];
        let outcome = merge_union(
            &[],
            &remote,
            &set(&["gone"]),
            &BTreeSet::new(),
            0,
            &MergePolicy::default(),
        );
        assert!(outcome.records.is_empty());
    }

    #[test]
    fn extreme_timestamps_do_not_overflow() {
        let local = vec![item("A", i64::MIN, "local"), created("B", i64::MIN)];
        let remote = vec![item("A", i64::MAX, "remote")];
        let outcome =
            merge_last_writer_wins(&local, &remote, &BTreeSet::new(), &MergePolicy::default());
        assert_eq!(outcome.records[0].label, "remote");

        let outcome = merge_union(
            &local,
            &[],
            &BTreeSet::new(),
            &BTreeSet::new(),
            i64::MAX,
            &MergePolicy::default(),
        );
        assert!(outcome.records.is_empty());

        let future = vec![created("C", i64::MAX)];
        let outcome = merge_union(
            &future,
            &[],
            &BTreeSet::new(),
            &BTreeSet::new(),
            i64::MIN,
            &MergePolicy::default(),
        );
        assert_eq!(outcome.kept_local_only, vec!["C".to_string()]);
    }

    #[test]
    fn retain_latest_keeps_newest_per_key() {
        let records = vec![
            item("1", 10, "k1"),
            item("2", 30, "k1"),
            item("3", 20, "k2"),
            item("4", 5, "k1"),
        ];
        let kept = retain_latest_by(records, |r| r.label.clone());
        let kept_ids: Vec<_> = kept.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(kept_ids, vec!["2".to_string(), "3".to_string()]);
    }
}
