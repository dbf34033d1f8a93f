//! Sync cursors and date markers.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use chrono::NaiveDate;
use lifesync_storage::KvStore;
use std::sync::Arc;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Stores calendar dates under named keys.
///
/// Sync cursors (`last sync date` per scope) throttle periodic pulls to
/// once per day. Named markers record facts such as the last day the
/// daily task list was initialized.
#[derive(Clone)]
pub struct MarkerStore {
    store: Arc<dyn KvStore>,
    config: SyncConfig,
}

impl std::fmt::Debug for MarkerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerStore")
            .field("namespace", &self.config.key_namespace)
            .finish()
    }
}

impl MarkerStore {
    /// Creates a marker store.
    pub fn new(store: Arc<dyn KvStore>, config: SyncConfig) -> Self {
        Self { store, config }
    }

    /// Returns the date stored under the named marker.
    ///
    /// An unparseable value is treated as absent.
    pub async fn get_marker(&self, name: &str) -> SyncResult<Option<NaiveDate>> {
        self.get_date(&self.config.marker_key(name)).await
    }

    /// Stores a date under the named marker.
    pub async fn set_marker(&self, name: &str, date: NaiveDate) -> SyncResult<()> {
        self.set_date(&self.config.marker_key(name), date).await
    }

    /// Returns the last sync date of `scope`.
    pub async fn last_sync(&self, scope: &str) -> SyncResult<Option<NaiveDate>> {
        self.get_date(&self.config.cursor_key(scope)).await
    }

    /// Records that `scope` synced on `date`.
    pub async fn mark_synced(&self, scope: &str, date: NaiveDate) -> SyncResult<()> {
        self.set_date(&self.config.cursor_key(scope), date).await
    }

    /// Returns true if `scope` has not synced on `today`, or if `force`.
    pub async fn is_sync_due(&self, scope: &str, today: NaiveDate, force: bool) -> SyncResult<bool> {
        if force {
            return Ok(true);
        }
        Ok(self.last_sync(scope).await? != Some(today))
    }

    async fn get_date(&self, key: &str) -> SyncResult<Option<NaiveDate>> {
        let raw = self.store.get_item(key).await?;
        Ok(raw.and_then(|value| match NaiveDate::parse_from_str(&value, DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(e) => {
                tracing::warn!(key, value = %value, error = %e, "ignoring malformed date marker");
                None
            }
        }))
    }

    async fn set_date(&self, key: &str, date: NaiveDate) -> SyncResult<()> {
        self.store
            .set_item(key, &date.format(DATE_FORMAT).to_string())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifesync_storage::InMemoryKvStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn sync_due_once_per_day() {
        let markers = MarkerStore::new(Arc::new(InMemoryKvStore::new()), SyncConfig::default());
        assert!(markers.is_sync_due("presets", day(1), false).await.unwrap());

        markers.mark_synced("presets", day(1)).await.unwrap();
        assert!(!markers.is_sync_due("presets", day(1), false).await.unwrap());
        assert!(markers.is_sync_due("presets", day(1), true).await.unwrap());
        assert!(markers.is_sync_due("presets", day(2), false).await.unwrap());
        assert!(markers.is_sync_due("reviews:weekly", day(1), false).await.unwrap());
    }

    #[tokio::test]
    async fn markers_use_iso_dates() {
        let store = Arc::new(InMemoryKvStore::new());
        let markers = MarkerStore::new(store.clone(), SyncConfig::default());
        markers.set_marker("daily_init", day(9)).await.unwrap();
        assert_eq!(
            store.snapshot("lifesync:marker:daily_init").as_deref(),
            Some("2024-03-09")
        );
        assert_eq!(markers.get_marker("daily_init").await.unwrap(), Some(day(9)));
    }

    #[tokio::test]
    async fn malformed_marker_reads_as_absent() {
        let store = Arc::new(InMemoryKvStore::with_entries([(
            "lifesync:marker:daily_init",
            "yesterday",
        )]));
        let markers = MarkerStore::new(store, SyncConfig::default());
        assert_eq!(markers.get_marker("daily_init").await.unwrap(), None);
    }
}
