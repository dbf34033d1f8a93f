//! Configuration for the sync engine.

use lifesync_protocol::MergePolicy;
use std::time::Duration;

/// Remote wins a last-writer-wins merge only when newer by more than this.
pub const DEFAULT_SKEW_TOLERANCE: Duration = Duration::from_millis(1_000);

/// Local-only records younger than this survive a union merge.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Upper bound for a single remote call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of the background job channel.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Prefix of every storage key.
pub const DEFAULT_KEY_NAMESPACE: &str = "lifesync";

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Clock-skew tolerance for last-writer-wins.
    pub skew_tolerance: Duration,
    /// Grace window for local-only records in a union merge.
    pub grace_window: Duration,
    /// Timeout applied to every remote call.
    pub remote_timeout: Duration,
    /// Capacity of the background job channel.
    pub queue_capacity: usize,
    /// Prefix of every storage key.
    pub key_namespace: String,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            skew_tolerance: DEFAULT_SKEW_TOLERANCE,
            grace_window: DEFAULT_GRACE_WINDOW,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            key_namespace: DEFAULT_KEY_NAMESPACE.to_string(),
        }
    }

    /// Sets the clock-skew tolerance.
    pub fn with_skew_tolerance(mut self, tolerance: Duration) -> Self {
        self.skew_tolerance = tolerance;
        self
    }

    /// Sets the grace window.
    pub fn with_grace_window(mut self, window: Duration) -> Self {
        self.grace_window = window;
        self
    }

    /// Sets the remote call timeout.
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    /// Sets the background queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Sets the storage key namespace.
    pub fn with_key_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.key_namespace = namespace.into();
        self
    }

    /// Returns the merge policy derived from this configuration.
    pub fn merge_policy(&self) -> MergePolicy {
        MergePolicy {
            skew_tolerance_ms: duration_ms(self.skew_tolerance),
            grace_window_ms: duration_ms(self.grace_window),
        }
    }

    /// Returns the storage keys used by one entity collection.
    pub fn keys_for(&self, kind: &str) -> StorageKeys {
        StorageKeys::new(&self.key_namespace, kind)
    }

    /// Returns the key of a sync cursor.
    pub fn cursor_key(&self, scope: &str) -> String {
        format!("{}:cursor:{scope}", self.key_namespace)
    }

    /// Returns the key of a named marker.
    pub fn marker_key(&self, name: &str) -> String {
        format!("{}:marker:{name}", self.key_namespace)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage keys owned by one entity collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Collection blob.
    pub records: String,
    /// Tombstone id set.
    pub tombstones: String,
    /// Pending-push id set.
    pub pending: String,
}

impl StorageKeys {
    /// Builds the keys for `kind` under `namespace`.
    pub fn new(namespace: &str, kind: &str) -> Self {
        Self {
            records: format!("{namespace}:{kind}:records"),
            tombstones: format!("{namespace}:{kind}:tombstones"),
            pending: format!("{namespace}:{kind}:pending"),
        }
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
