//! CLI command implementations.

pub mod daily;
pub mod inspect;
pub mod preset;
pub mod task;

use lifesync_engine::{CloudFlag, SyncConfig, SyncContext, SystemClock};
use lifesync_services::{AppServices, RemoteClients};
use lifesync_storage::FileKvStore;
use std::path::Path;
use std::sync::Arc;

/// Result type of every command.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Opens the store at `path` in pure local mode.
pub async fn open(path: &Path) -> Result<AppServices, Box<dyn std::error::Error>> {
    let store = FileKvStore::open(path).await?;
    let ctx = SyncContext::new(
        Arc::new(store),
        Arc::new(SystemClock),
        CloudFlag::disabled(),
        SyncConfig::default(),
    );
    Ok(AppServices::new(ctx, RemoteClients::detached()))
}

/// Waits for background work such as daily-task exports.
pub async fn close(services: AppServices) {
    services.flush().await;
}
