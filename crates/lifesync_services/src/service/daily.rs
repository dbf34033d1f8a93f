//! Daily tasks and their export to the task collection.
//!
//! # State machine
//!
//! `Pending -> CompletedUnsynced -> CompletedSynced`. Completing a task
//! queues its export; once the exported task exists the daily task flips to
//! `CompletedSynced`, after which it can be neither uncompleted nor deleted.

use super::TaskService;
use crate::error::{PolicyViolation, ServiceError, ServiceResult};
use crate::model::{DailyTask, DailyTaskState};
use chrono::NaiveDate;
use lifesync_engine::{PullReport, SyncCoordinator, SyncReport, WriteOptions};
use lifesync_protocol::Record;

/// Daily tasks with a one-way export to [`TaskService`].
#[derive(Debug, Clone)]
pub struct DailyTaskService {
    sync: SyncCoordinator<DailyTask>,
    tasks: TaskService,
}

impl DailyTaskService {
    /// Creates the service. Exports go to `tasks`.
    pub fn new(sync: SyncCoordinator<DailyTask>, tasks: TaskService) -> Self {
        Self { sync, tasks }
    }

    /// Returns the coordinator.
    pub fn coordinator(&self) -> &SyncCoordinator<DailyTask> {
        &self.sync
    }

    /// Returns the tasks dated `date`.
    pub async fn list_for(&self, date: NaiveDate) -> ServiceResult<Vec<DailyTask>> {
        let mut tasks = self.sync.list().await?;
        tasks.retain(|t| t.date == date);
        Ok(tasks)
    }

    /// Returns today's tasks.
    pub async fn today(&self) -> ServiceResult<Vec<DailyTask>> {
        self.list_for(self.sync.context().clock().today()).await
    }

    /// Returns the daily task `id`.
    pub async fn get(&self, id: &str) -> ServiceResult<DailyTask> {
        self.sync
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(DailyTask::KIND, id))
    }

    /// Marks the task done and queues its export.
    ///
    /// Completing an already completed task changes nothing.
    pub async fn complete(&self, id: &str) -> ServiceResult<DailyTask> {
        let now = self.sync.context().clock().now_ms();
        let task = self
            .modify(id, |task| {
                if !task.completed {
                    task.completed = true;
                    task.completed_at = Some(now);
                    task.touch(now);
                }
                Ok(())
            })
            .await?;
        if task.state() == DailyTaskState::CompletedUnsynced {
            self.schedule_export(task.id().to_string());
        }
        Ok(task)
    }

    /// Marks the task not done.
    ///
    /// Fails with [`PolicyViolation::ExportedDailyTaskUncomplete`] once the
    /// task has been exported.
    pub async fn uncomplete(&self, id: &str) -> ServiceResult<DailyTask> {
        let now = self.sync.context().clock().now_ms();
        self.modify(id, |task| {
            if task.state() == DailyTaskState::CompletedSynced {
                return Err(PolicyViolation::ExportedDailyTaskUncomplete {
                    id: task.id().to_string(),
                }
                .into());
            }
            if task.completed {
                task.completed = false;
                task.completed_at = None;
                task.touch(now);
            }
            Ok(())
        })
        .await
    }

    /// Deletes the task.
    ///
    /// Fails with [`PolicyViolation::ExportedDailyTaskDelete`] once the task
    /// has been exported.
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        let task = self.get(id).await?;
        if task.state() == DailyTaskState::CompletedSynced {
            return Err(PolicyViolation::ExportedDailyTaskDelete { id: id.to_string() }.into());
        }
        self.sync.delete(id).await?;
        Ok(())
    }

    /// Pulls remote daily tasks, then queues the export of any completed
    /// task that has not been exported yet.
    pub async fn sync_from_cloud(&self) -> ServiceResult<PullReport> {
        let report = self.sync.pull_from_cloud().await?;
        self.export_pending().await?;
        Ok(report)
    }

    /// Runs a full sync cycle and retries outstanding exports.
    pub async fn sync(&self) -> ServiceResult<SyncReport> {
        let report = self.sync.sync().await?;
        self.export_pending().await?;
        Ok(report)
    }

    /// Queues the export of every completed, unexported task. Returns how
    /// many were queued.
    pub async fn export_pending(&self) -> ServiceResult<usize> {
        let unsynced: Vec<String> = self
            .sync
            .list()
            .await?
            .into_iter()
            .filter(|t| t.state() == DailyTaskState::CompletedUnsynced)
            .map(|t| t.meta.id)
            .collect();
        let count = unsynced.len();
        for id in unsynced {
            self.schedule_export(id);
        }
        Ok(count)
    }

    fn schedule_export(&self, id: String) {
        let this = self.clone();
        let label = format!("export {}:{id}", DailyTask::KIND);
        self.sync
            .context()
            .queue()
            .submit(label, async move { this.export(&id).await });
    }

    /// Creates the collection task for `id` and flips the daily task to
    /// `CompletedSynced`.
    async fn export(&self, id: &str) -> ServiceResult<()> {
        let Some(task) = self.sync.get(id).await? else {
            return Ok(());
        };
        if task.state() != DailyTaskState::CompletedUnsynced {
            return Ok(());
        }
        let exported = self.tasks.create_exported(&task).await?;

        let now = self.sync.context().clock().now_ms();
        self.sync
            .try_write(WriteOptions::local(), |tasks| {
                if let Some(task) = tasks.iter_mut().find(|t| t.id() == id) {
                    if task.state() == DailyTaskState::CompletedUnsynced {
                        task.synced_to_collection = true;
                        task.touch(now);
                    }
                }
                Ok::<_, ServiceError>(())
            })
            .await?;
        tracing::info!(
            entity = DailyTask::KIND,
            id,
            task = exported.id(),
            "daily task exported"
        );
        Ok(())
    }

    async fn modify<F>(&self, id: &str, f: F) -> ServiceResult<DailyTask>
    where
        F: FnOnce(&mut DailyTask) -> ServiceResult<()>,
    {
        self.sync
            .try_write(WriteOptions::local(), |tasks| {
                let task = tasks
                    .iter_mut()
                    .find(|t| t.id() == id)
                    .ok_or_else(|| ServiceError::not_found(DailyTask::KIND, id))?;
                f(task)?;
                Ok(task.clone())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use lifesync_engine::Clock;

    async fn seeded(fx: &Fixture) -> DailyTask {
        let task = DailyTask::new(
            "preset_1".into(),
            "Stretch".into(),
            fx.clock.today(),
            fx.clock.now_ms(),
        );
        let stored = task.clone();
        fx.services
            .daily
            .coordinator()
            .write(move |tasks| tasks.push(stored))
            .await
            .unwrap();
        task
    }

    #[tokio::test]
    async fn completion_exports_once() {
        let fx = Fixture::offline();
        let daily = &fx.services.daily;
        let task = seeded(&fx).await;

        let completed = daily.complete(task.id()).await.unwrap();
        assert_eq!(completed.state(), DailyTaskState::CompletedUnsynced);
        assert_eq!(completed.completed_at, Some(fx.clock.now_ms()));
        fx.flush().await;

        let synced = daily.get(task.id()).await.unwrap();
        assert_eq!(synced.state(), DailyTaskState::CompletedSynced);

        let again = daily.complete(task.id()).await.unwrap();
        assert_eq!(again, synced);
        fx.flush().await;

        let exported = fx.services.tasks.list().await.unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].source_daily_task_id.as_deref(), Some(task.id()));
        assert!(exported[0].completed);
    }

    #[tokio::test]
    async fn exported_task_is_terminal() {
        let fx = Fixture::offline();
        let daily = &fx.services.daily;
        let task = seeded(&fx).await;
        daily.complete(task.id()).await.unwrap();
        fx.flush().await;

        let err = daily.uncomplete(task.id()).await.unwrap_err();
        assert!(matches!(
            err.policy(),
            Some(PolicyViolation::ExportedDailyTaskUncomplete { .. })
        ));
        let err = daily.delete(task.id()).await.unwrap_err();
        assert!(matches!(
            err.policy(),
            Some(PolicyViolation::ExportedDailyTaskDelete { .. })
        ));
        assert_eq!(daily.today().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unexported_task_can_be_uncompleted_and_deleted() {
        let fx = Fixture::offline();
        let daily = &fx.services.daily;
        let task = seeded(&fx).await;

        let undone = daily.uncomplete(task.id()).await.unwrap();
        assert_eq!(undone, task);

        daily.delete(task.id()).await.unwrap();
        assert!(daily.today().await.unwrap().is_empty());
        assert!(matches!(
            daily.delete(task.id()).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn export_pending_retries_interrupted_exports() {
        let fx = Fixture::offline();
        let daily = &fx.services.daily;
        let mut task = seeded(&fx).await;
        task.completed = true;
        task.completed_at = Some(1);
        let stored = task.clone();
        daily
            .coordinator()
            .write(move |tasks| tasks[0] = stored)
            .await
            .unwrap();

        assert_eq!(daily.export_pending().await.unwrap(), 1);
        fx.flush().await;
        assert_eq!(daily.export_pending().await.unwrap(), 0);
        assert_eq!(
            daily.get(task.id()).await.unwrap().state(),
            DailyTaskState::CompletedSynced
        );
    }
}
