//! Inspect command implementation.

use lifesync_engine::{Clock, SyncConfig, SystemClock};
use lifesync_protocol::Record;
use lifesync_services::{DailyTask, Idea, Preset, Review, ReviewType, Task, DAILY_INIT_MARKER};
use lifesync_storage::{FileKvStore, KvStore};
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Total size of every value in bytes.
    pub total_size: u64,
    /// Per-entity statistics.
    pub entities: Vec<EntityStats>,
    /// Sync cursors and markers, `(name, date)`.
    pub markers: Vec<(String, Option<String>)>,
}

/// Statistics for one entity type.
#[derive(Debug, Serialize)]
pub struct EntityStats {
    /// Entity collection name.
    pub kind: String,
    /// Number of local records.
    pub records: usize,
    /// Ids deleted locally and not yet confirmed remotely.
    pub tombstones: usize,
    /// Ids awaiting a push.
    pub pending: usize,
}

/// Runs the inspect command.
pub async fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {:?}", path).into());
    }
    let store = FileKvStore::open(path).await?;
    let config = SyncConfig::default();

    let mut total_size = 0u64;
    for key in store.keys().await? {
        if let Some(value) = store.get_item(&key).await? {
            total_size += value.len() as u64;
        }
    }

    let mut entities = Vec::new();
    for kind in [Task::KIND, Idea::KIND, Review::KIND, Preset::KIND, DailyTask::KIND] {
        let keys = config.keys_for(kind);
        entities.push(EntityStats {
            kind: kind.to_string(),
            records: array_len(&store, &keys.records).await?,
            tombstones: array_len(&store, &keys.tombstones).await?,
            pending: array_len(&store, &keys.pending).await?,
        });
    }

    let mut markers = Vec::new();
    let scopes = [Task::KIND, Idea::KIND, Review::KIND, Preset::KIND, DailyTask::KIND]
        .into_iter()
        .map(str::to_string)
        .chain(ReviewType::ALL.iter().map(|t| t.cursor_scope()));
    for scope in scopes {
        let value = store.get_item(&config.cursor_key(&scope)).await?;
        markers.push((format!("cursor:{scope}"), value));
    }
    let init = store.get_item(&config.marker_key(DAILY_INIT_MARKER)).await?;
    markers.push((format!("marker:{DAILY_INIT_MARKER}"), init));

    let result = InspectResult {
        path: path.display().to_string(),
        total_size,
        entities,
        markers,
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result, SystemClock.today().to_string());
        }
    }

    Ok(())
}

async fn array_len(store: &FileKvStore, key: &str) -> Result<usize, Box<dyn std::error::Error>> {
    match store.get_item(key).await? {
        Some(raw) => match serde_json::from_str::<serde_json::Value>(&raw)? {
            serde_json::Value::Array(items) => Ok(items.len()),
            _ => Err(format!("{key} does not hold a JSON array").into()),
        },
        None => Ok(0),
    }
}

fn print_text_output(result: &InspectResult, today: String) {
    println!("LifeSync Store Inspection");
    println!("=========================");
    println!();
    println!("Path:  {}", result.path);
    println!("Size:  {}", format_size(result.total_size));
    println!("Today: {today}");
    println!();
    println!("Entities:");
    println!("  {:<12} {:>8} {:>11} {:>8}", "kind", "records", "tombstones", "pending");
    for entity in &result.entities {
        println!(
            "  {:<12} {:>8} {:>11} {:>8}",
            entity.kind, entity.records, entity.tombstones, entity.pending
        );
    }
    println!();
    println!("Markers:");
    for (name, value) in &result.markers {
        println!("  {:<24} {}", name, value.as_deref().unwrap_or("-"));
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(format_size(12), "12 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[tokio::test]
    async fn counts_arrays_and_missing_keys() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileKvStore::open(dir.path()).await.unwrap();
        store.set_item("a", r#"["x","y"]"#).await.unwrap();
        store.set_item("b", r#"{"x":1}"#).await.unwrap();
        assert_eq!(array_len(&store, "a").await.unwrap(), 2);
        assert_eq!(array_len(&store, "missing").await.unwrap(), 0);
        assert!(array_len(&store, "b").await.is_err());
    }
}
