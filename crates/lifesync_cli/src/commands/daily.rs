//! Daily task commands.

use super::{close, open, CommandResult};
use chrono::NaiveDate;
use lifesync_protocol::Record;
use lifesync_services::{DailyTaskState, DayInitAction};
use std::path::Path;

/// Runs the day-boundary initializer.
pub async fn day_init(path: &Path) -> CommandResult {
    let services = open(path).await?;
    let report = services.initialize_day().await?;
    let action = match report.action {
        DayInitAction::Generated => "generated",
        DayInitAction::Regenerated => "regenerated",
        DayInitAction::Unchanged => "unchanged",
    };
    println!("{}: {action}, {} task(s)", report.date, report.tasks.len());
    close(services).await;
    Ok(())
}

/// Lists the daily tasks of `date`, today by default.
pub async fn list(path: &Path, date: Option<NaiveDate>) -> CommandResult {
    let services = open(path).await?;
    let tasks = match date {
        Some(date) => services.daily.list_for(date).await?,
        None => services.daily.today().await?,
    };
    for task in &tasks {
        let mark = match task.state() {
            DailyTaskState::Pending => " ",
            DailyTaskState::CompletedUnsynced => "~",
            DailyTaskState::CompletedSynced => "x",
        };
        println!("[{mark}] {}  {}", task.id(), task.title);
    }
    close(services).await;
    Ok(())
}

/// Completes a daily task; the export runs before the command exits.
pub async fn complete(path: &Path, id: &str) -> CommandResult {
    let services = open(path).await?;
    let task = services.daily.complete(id).await?;
    close(services.clone()).await;
    let exported = services.daily.get(task.id()).await?;
    println!(
        "completed {}{}",
        exported.title,
        if exported.synced_to_collection {
            " (exported)"
        } else {
            ""
        }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::preset;

    #[tokio::test]
    async fn day_init_then_complete_exports() {
        let dir = tempfile::TempDir::new().unwrap();
        preset::add(dir.path(), "Stretch").await.unwrap();
        day_init(dir.path()).await.unwrap();
        day_init(dir.path()).await.unwrap();

        let services = open(dir.path()).await.unwrap();
        let today = services.daily.today().await.unwrap();
        assert_eq!(today.len(), 1);
        let id = today[0].id().to_string();
        close(services).await;

        complete(dir.path(), &id).await.unwrap();

        let services = open(dir.path()).await.unwrap();
        assert!(services.daily.get(&id).await.unwrap().synced_to_collection);
        let tasks = services.tasks.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].source_daily_task_id.as_deref(), Some(id.as_str()));
    }
}
