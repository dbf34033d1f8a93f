//! Wiring of every service onto one [`SyncContext`].

use crate::day_boundary::{DayBoundaryInitializer, DayInitReport};
use crate::error::ServiceResult;
use crate::model::{DailyTask, Idea, Preset, Review, Task};
use crate::service::{DailyTaskService, IdeaService, PresetService, ReviewService, TaskService};
use lifesync_engine::{DetachedRemote, RemoteClient, SyncContext, SyncReport, UnionReport};
use std::sync::Arc;

/// One remote client per entity type.
#[derive(Clone)]
pub struct RemoteClients {
    /// Task remote.
    pub tasks: Arc<dyn RemoteClient<Task>>,
    /// Idea remote.
    pub ideas: Arc<dyn RemoteClient<Idea>>,
    /// Review remote.
    pub reviews: Arc<dyn RemoteClient<Review>>,
    /// Preset remote.
    pub presets: Arc<dyn RemoteClient<Preset>>,
    /// Daily task remote.
    pub daily: Arc<dyn RemoteClient<DailyTask>>,
}

impl RemoteClients {
    /// Remotes for pure local mode.
    pub fn detached() -> Self {
        Self {
            tasks: Arc::new(DetachedRemote),
            ideas: Arc::new(DetachedRemote),
            reviews: Arc::new(DetachedRemote),
            presets: Arc::new(DetachedRemote),
            daily: Arc::new(DetachedRemote),
        }
    }
}

impl std::fmt::Debug for RemoteClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClients").finish_non_exhaustive()
    }
}

/// Result of [`AppServices::sync_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAllReport {
    /// Task cycle.
    pub tasks: SyncReport,
    /// Idea cycle.
    pub ideas: SyncReport,
    /// Review cycle; `None` if every granularity already synced today.
    pub reviews: Option<SyncReport>,
    /// Preset union; `None` if already synced today.
    pub presets: Option<UnionReport>,
    /// Daily task cycle.
    pub daily: SyncReport,
}

/// Every service of the application.
#[derive(Debug, Clone)]
pub struct AppServices {
    ctx: SyncContext,
    /// Tasks.
    pub tasks: TaskService,
    /// Ideas.
    pub ideas: IdeaService,
    /// Reviews.
    pub reviews: ReviewService,
    /// Presets.
    pub presets: PresetService,
    /// Daily tasks.
    pub daily: DailyTaskService,
    /// Day-boundary initializer.
    pub day_boundary: DayBoundaryInitializer,
}

impl AppServices {
    /// Builds every service over `ctx`.
    pub fn new(ctx: SyncContext, remotes: RemoteClients) -> Self {
        let tasks = TaskService::new(ctx.coordinator(remotes.tasks));
        let ideas = IdeaService::new(ctx.coordinator(remotes.ideas));
        let reviews = ReviewService::new(ctx.coordinator(remotes.reviews));
        let presets = PresetService::new(ctx.coordinator(remotes.presets));
        let daily = DailyTaskService::new(ctx.coordinator(remotes.daily), tasks.clone());
        let day_boundary = DayBoundaryInitializer::new(daily.clone(), presets.clone());
        Self {
            ctx,
            tasks,
            ideas,
            reviews,
            presets,
            daily,
            day_boundary,
        }
    }

    /// Returns the shared context.
    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// Runs the day-boundary initializer.
    pub async fn initialize_day(&self) -> ServiceResult<DayInitReport> {
        self.day_boundary.initialize().await
    }

    /// Syncs every entity type. Throttled types are skipped unless `force`.
    ///
    /// Presets sync first so that a day initialisation right after sees
    /// remote presets.
    pub async fn sync_all(&self, force: bool) -> ServiceResult<SyncAllReport> {
        let presets = self.presets.sync_bidirectional(force).await?;
        let tasks = self.tasks.sync().await?;
        let ideas = self.ideas.sync().await?;
        let reviews = self.reviews.sync_all_due(force).await?;
        let daily = self.daily.sync().await?;
        Ok(SyncAllReport {
            tasks,
            ideas,
            reviews,
            presets,
            daily,
        })
    }

    /// Waits for every queued background job.
    pub async fn flush(&self) {
        self.ctx.queue().flush().await;
    }
}
