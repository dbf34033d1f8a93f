//! Day-boundary initialisation of daily tasks.
//!
//! # Responsibility
//!
//! On the first activation of each local day, clear out any stray tasks
//! already dated today (locally and remotely) and generate one fresh daily
//! task per enabled preset.
//!
//! # Invariants
//!
//! - Runs are serialised; two concurrent calls never both generate.
//! - A second run on the same day with tasks present changes nothing.

use crate::error::ServiceResult;
use crate::model::DailyTask;
use crate::service::{DailyTaskService, PresetService};
use chrono::NaiveDate;
use lifesync_engine::{PushMode, WriteOptions};
use lifesync_protocol::Record;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Marker holding the last local date daily tasks were generated on.
pub const DAILY_INIT_MARKER: &str = "daily_init";

/// What an initialisation run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayInitAction {
    /// First run of the day: strays removed, tasks generated.
    Generated,
    /// Already initialised today but no task existed; tasks generated again.
    Regenerated,
    /// Today's tasks already exist.
    Unchanged,
}

/// Result of [`DayBoundaryInitializer::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayInitReport {
    /// Local date the run applied to.
    pub date: NaiveDate,
    /// What happened.
    pub action: DayInitAction,
    /// Today's tasks after the run.
    pub tasks: Vec<DailyTask>,
}

/// Generates the daily task list once per local day.
#[derive(Debug, Clone)]
pub struct DayBoundaryInitializer {
    daily: DailyTaskService,
    presets: PresetService,
    running: Arc<Mutex<()>>,
}

impl DayBoundaryInitializer {
    /// Creates an initializer.
    pub fn new(daily: DailyTaskService, presets: PresetService) -> Self {
        Self {
            daily,
            presets,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Brings today's daily task list into existence.
    pub async fn initialize(&self) -> ServiceResult<DayInitReport> {
        let _running = self.running.lock().await;
        let sync = self.daily.coordinator();
        let markers = sync.markers();
        let today = sync.context().clock().today();

        if markers.get_marker(DAILY_INIT_MARKER).await? == Some(today) {
            let existing = self.daily.list_for(today).await?;
            if !existing.is_empty() {
                tracing::debug!(%today, count = existing.len(), "daily tasks already initialised");
                return Ok(DayInitReport {
                    date: today,
                    action: DayInitAction::Unchanged,
                    tasks: existing,
                });
            }
            let tasks = self.generate(today).await?;
            tracing::info!(%today, count = tasks.len(), "daily tasks regenerated");
            return Ok(DayInitReport {
                date: today,
                action: DayInitAction::Regenerated,
                tasks,
            });
        }

        let removed = self.remove_strays(today).await?;
        let tasks = self.generate(today).await?;
        markers.set_marker(DAILY_INIT_MARKER, today).await?;
        tracing::info!(%today, removed, count = tasks.len(), "daily tasks generated");
        Ok(DayInitReport {
            date: today,
            action: DayInitAction::Generated,
            tasks,
        })
    }

    /// Deletes every task dated `today`, local or remote-only.
    async fn remove_strays(&self, today: NaiveDate) -> ServiceResult<usize> {
        let sync = self.daily.coordinator();
        let mut strays: BTreeSet<String> = self
            .daily
            .list_for(today)
            .await?
            .into_iter()
            .map(|t| t.meta.id)
            .collect();
        if let Some(remote) = sync.fetch_remote().await {
            strays.extend(
                remote
                    .into_iter()
                    .filter(|t| t.date == today)
                    .map(|t| t.meta.id),
            );
        }
        if strays.is_empty() {
            return Ok(0);
        }
        tracing::debug!(%today, count = strays.len(), "removing stray daily tasks");
        let count = strays.len();
        sync.delete_many(strays.into_iter().collect()).await?;
        Ok(count)
    }

    async fn generate(&self, today: NaiveDate) -> ServiceResult<Vec<DailyTask>> {
        let presets = self.presets.enabled().await?;
        let sync = self.daily.coordinator();
        let now = sync.context().clock().now_ms();
        let tasks: Vec<DailyTask> = presets
            .into_iter()
            .map(|p| DailyTask::new(p.id().to_string(), p.title, today, now))
            .collect();
        let created = tasks.clone();
        let options = WriteOptions::local().with_mode(PushMode::CreateOnly);
        sync.try_write(options, move |records| {
            records.extend(tasks);
            Ok::<_, lifesync_engine::SyncError>(())
        })
        .await?;
        Ok(created)
    }
}
