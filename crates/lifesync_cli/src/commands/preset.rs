//! Preset commands.

use super::{close, open, CommandResult};
use lifesync_protocol::Record;
use std::path::Path;

/// Adds a preset.
pub async fn add(path: &Path, title: &str) -> CommandResult {
    let services = open(path).await?;
    let preset = services.presets.create(title).await?;
    println!("{}", preset.id());
    close(services).await;
    Ok(())
}

/// Lists presets in order.
pub async fn list(path: &Path) -> CommandResult {
    let services = open(path).await?;
    for preset in services.presets.list().await? {
        let state = if preset.enabled { "on " } else { "off" };
        println!("{:>3}. [{state}] {}  {}", preset.order, preset.id(), preset.title);
    }
    close(services).await;
    Ok(())
}
