//! Concurrency stress helpers.
//!
//! These drive many concurrent service calls against one [`TestWorld`] to
//! check that read-modify-write cycles never lose updates.

use crate::fixtures::TestWorld;
use lifesync_services::NewTask;
use std::time::{Duration, Instant};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        Self {
            total_ops: successful + failed,
            successful_ops: successful,
            failed_ops: failed,
            duration,
        }
    }

    /// Operations per second.
    pub fn ops_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.total_ops as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Concurrent writers.
    pub writers: usize,
    /// Operations per writer.
    pub operations_per_writer: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            writers: 8,
            operations_per_writer: 25,
        }
    }
}

/// Creates tasks from `config.writers` concurrent tokio tasks.
pub async fn stress_concurrent_creates(world: &TestWorld, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut handles = Vec::with_capacity(config.writers);
    for writer in 0..config.writers {
        let tasks = world.services.tasks.clone();
        let operations = config.operations_per_writer;
        handles.push(tokio::spawn(async move {
            let mut ok = 0usize;
            for op in 0..operations {
                if tasks
                    .create(NewTask::titled(format!("w{writer}-{op}")))
                    .await
                    .is_ok()
                {
                    ok += 1;
                }
            }
            (ok, operations - ok)
        }));
    }

    let mut successful = 0;
    let mut failed = 0;
    for handle in handles {
        match handle.await {
            Ok((ok, err)) => {
                successful += ok;
                failed += err;
            }
            Err(_) => failed += config.operations_per_writer,
        }
    }
    StressTestResult::new(successful, failed, start.elapsed())
}

/// Completes every listed task from `writers` concurrent tokio tasks, each
/// taking a disjoint slice.
pub async fn stress_concurrent_completes(world: &TestWorld, writers: usize) -> StressTestResult {
    let start = Instant::now();
    let ids: Vec<String> = world
        .services
        .tasks
        .list()
        .await
        .map(|tasks| tasks.into_iter().map(|t| t.meta.id).collect())
        .unwrap_or_default();
    let writers = writers.max(1);
    let chunk = ids.len().div_ceil(writers).max(1);

    let mut handles = Vec::new();
    for slice in ids.chunks(chunk) {
        let tasks = world.services.tasks.clone();
        let slice = slice.to_vec();
        handles.push(tokio::spawn(async move {
            let mut ok = 0usize;
            for id in &slice {
                if tasks.set_completed(id, true).await.is_ok() {
                    ok += 1;
                }
            }
            (ok, slice.len() - ok)
        }));
    }

    let mut successful = 0;
    let mut failed = 0;
    for handle in handles {
        if let Ok((ok, err)) = handle.await {
            successful += ok;
            failed += err;
        }
    }
    StressTestResult::new(successful, failed, start.elapsed())
}
