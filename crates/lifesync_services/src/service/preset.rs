use crate::error::{ServiceError, ServiceResult};
use crate::model::{required_text, Preset, PresetPatch};
use lifesync_engine::{SyncCoordinator, UnionReport, WriteOptions};
use lifesync_protocol::Record;

/// Daily-task templates with once-a-day bidirectional sync.
#[derive(Debug, Clone)]
pub struct PresetService {
    sync: SyncCoordinator<Preset>,
}

impl PresetService {
    /// Creates the service.
    pub fn new(sync: SyncCoordinator<Preset>) -> Self {
        Self { sync }
    }

    /// Returns the coordinator.
    pub fn coordinator(&self) -> &SyncCoordinator<Preset> {
        &self.sync
    }

    /// Returns every preset in display order.
    pub async fn list(&self) -> ServiceResult<Vec<Preset>> {
        let mut presets = self.sync.list().await?;
        presets.sort_by_key(|p| (p.order, p.created_at()));
        Ok(presets)
    }

    /// Returns the enabled presets in display order.
    pub async fn enabled(&self) -> ServiceResult<Vec<Preset>> {
        let mut presets = self.list().await?;
        presets.retain(|p| p.enabled);
        Ok(presets)
    }

    /// Returns the preset `id`.
    pub async fn get(&self, id: &str) -> ServiceResult<Preset> {
        self.sync
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Preset::KIND, id))
    }

    /// Appends an enabled preset at the end of the list.
    pub async fn create(&self, title: &str) -> ServiceResult<Preset> {
        let title = required_text("title", title)?;
        let now = self.sync.context().clock().now_ms();
        self.sync
            .write(move |presets| {
                let order = presets.iter().map(|p| p.order + 1).max().unwrap_or(0);
                let preset = Preset::new(title, order, now);
                presets.push(preset.clone());
                preset
            })
            .await
            .map_err(ServiceError::from)
    }

    /// Applies a partial update.
    pub async fn update(&self, id: &str, patch: PresetPatch) -> ServiceResult<Preset> {
        if let Some(title) = &patch.title {
            required_text("title", title)?;
        }
        let now = self.sync.context().clock().now_ms();
        self.sync
            .try_write(WriteOptions::local(), |presets| {
                let preset = presets
                    .iter_mut()
                    .find(|p| p.id() == id)
                    .ok_or_else(|| ServiceError::not_found(Preset::KIND, id))?;
                patch.apply(preset);
                preset.touch(now);
                Ok(preset.clone())
            })
            .await
    }

    /// Deletes the preset. Daily tasks already generated from it stay.
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        if !self.sync.delete(id).await? {
            return Err(ServiceError::not_found(Preset::KIND, id));
        }
        Ok(())
    }

    /// Merges local and remote presets by union.
    ///
    /// Runs at most once per local day unless `force` is set; returns `None`
    /// when skipped. Local-only presets younger than the grace window are
    /// kept and pushed.
    pub async fn sync_bidirectional(&self, force: bool) -> ServiceResult<Option<UnionReport>> {
        let today = self.sync.context().clock().today();
        if !self
            .sync
            .markers()
            .is_sync_due(Preset::KIND, today, force)
            .await?
        {
            tracing::debug!(entity = Preset::KIND, "presets already synced today");
            return Ok(None);
        }
        Ok(Some(self.sync.pull_union().await?))
    }
}
