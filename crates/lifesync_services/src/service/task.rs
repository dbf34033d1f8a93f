use crate::error::{ServiceError, ServiceResult};
use crate::model::{required_text, DailyTask, NewTask, Task, TaskPatch};
use lifesync_engine::{PullReport, SyncCoordinator, SyncReport, WriteOptions};
use lifesync_protocol::Record;

/// CRUD over the general task collection.
#[derive(Debug, Clone)]
pub struct TaskService {
    sync: SyncCoordinator<Task>,
}

impl TaskService {
    /// Creates the service.
    pub fn new(sync: SyncCoordinator<Task>) -> Self {
        Self { sync }
    }

    /// Returns the coordinator.
    pub fn coordinator(&self) -> &SyncCoordinator<Task> {
        &self.sync
    }

    /// Returns every task.
    pub async fn list(&self) -> ServiceResult<Vec<Task>> {
        Ok(self.sync.list().await?)
    }

    /// Returns the task `id`.
    pub async fn get(&self, id: &str) -> ServiceResult<Task> {
        self.sync
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Task::KIND, id))
    }

    /// Creates a task.
    pub async fn create(&self, input: NewTask) -> ServiceResult<Task> {
        let input = NewTask {
            title: required_text("title", &input.title)?,
            ..input
        };
        let task = Task::new(input, self.now_ms());
        let created = task.clone();
        self.sync.write(move |tasks| tasks.push(task)).await?;
        tracing::debug!(id = created.id(), "task created");
        Ok(created)
    }

    /// Applies a partial update.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> ServiceResult<Task> {
        if let Some(title) = &patch.title {
            required_text("title", title)?;
        }
        let now = self.now_ms();
        self.modify(id, move |task| {
            patch.apply(task);
            task.touch(now);
        })
        .await
    }

    /// Marks the task done or not done.
    pub async fn set_completed(&self, id: &str, completed: bool) -> ServiceResult<Task> {
        let now = self.now_ms();
        self.modify(id, move |task| {
            if task.completed == completed {
                return;
            }
            task.completed = completed;
            task.completed_at = completed.then_some(now);
            task.touch(now);
        })
        .await
    }

    /// Deletes the task.
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        if !self.sync.delete(id).await? {
            return Err(ServiceError::not_found(Task::KIND, id));
        }
        Ok(())
    }

    /// Creates the collection entry for a completed daily task.
    ///
    /// Idempotent: if an entry exported from `daily` already exists it is
    /// returned unchanged.
    pub async fn create_exported(&self, daily: &DailyTask) -> ServiceResult<Task> {
        let now = self.now_ms();
        self.sync
            .try_write(WriteOptions::local(), |tasks| {
                if let Some(existing) = tasks
                    .iter()
                    .find(|t| t.source_daily_task_id.as_deref() == Some(daily.id()))
                {
                    return Ok(existing.clone());
                }
                let mut task = Task::new(NewTask::titled(daily.title.clone()), now);
                task.completed = true;
                task.completed_at = daily.completed_at.or(Some(now));
                task.source_daily_task_id = Some(daily.id().to_string());
                tasks.push(task.clone());
                Ok::<_, ServiceError>(task)
            })
            .await
    }

    /// Pulls remote tasks.
    pub async fn sync_from_cloud(&self) -> ServiceResult<PullReport> {
        Ok(self.sync.pull_from_cloud().await?)
    }

    /// Pulls, then pushes pending edits and deletes.
    pub async fn sync(&self) -> ServiceResult<SyncReport> {
        Ok(self.sync.sync().await?)
    }

    async fn modify<F>(&self, id: &str, f: F) -> ServiceResult<Task>
    where
        F: FnOnce(&mut Task),
    {
        self.sync
            .try_write(WriteOptions::local(), |tasks| {
                let task = tasks
                    .iter_mut()
                    .find(|t| t.id() == id)
                    .ok_or_else(|| ServiceError::not_found(Task::KIND, id))?;
                f(task);
                Ok(task.clone())
            })
            .await
    }

    fn now_ms(&self) -> i64 {
        self.sync.context().clock().now_ms()
    }
}
