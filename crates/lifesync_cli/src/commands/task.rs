//! Task commands.

use super::{close, open, CommandResult};
use chrono::NaiveDate;
use lifesync_protocol::Record;
use lifesync_services::NewTask;
use std::path::Path;

/// Adds a task.
pub async fn add(path: &Path, title: &str, due: Option<NaiveDate>) -> CommandResult {
    let services = open(path).await?;
    let task = services
        .tasks
        .create(NewTask {
            due_date: due,
            ..NewTask::titled(title)
        })
        .await?;
    println!("{}", task.id());
    close(services).await;
    Ok(())
}

/// Lists open tasks, or every task with `all`.
pub async fn list(path: &Path, all: bool) -> CommandResult {
    let services = open(path).await?;
    let mut tasks = services.tasks.list().await?;
    tasks.retain(|t| all || !t.completed);
    tasks.sort_by_key(|t| (t.completed, t.due_date.is_none(), t.due_date, t.created_at()));
    for task in &tasks {
        let mark = if task.completed { "x" } else { " " };
        let due = task
            .due_date
            .map(|d| format!(" (due {d})"))
            .unwrap_or_default();
        println!("[{mark}] {}  {}{due}", task.id(), task.title);
    }
    close(services).await;
    Ok(())
}

/// Marks a task done.
pub async fn done(path: &Path, id: &str) -> CommandResult {
    let services = open(path).await?;
    let task = services.tasks.set_completed(id, true).await?;
    println!("completed {}", task.title);
    close(services).await;
    Ok(())
}
