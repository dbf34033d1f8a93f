//! Test fixtures.
//!
//! [`TestWorld`] wires [`AppServices`] to a store, a [`ManualClock`] and one
//! [`MockRemoteClient`] per entity type.

use chrono::{NaiveDate, NaiveDateTime};
use lifesync_engine::{CloudFlag, ManualClock, MockRemoteClient, SyncConfig, SyncContext};
use lifesync_services::{AppServices, DailyTask, Idea, Preset, RemoteClients, Review, Task};
use lifesync_storage::{FileKvStore, InMemoryKvStore, KvStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// 2024-06-01 09:00, the default start time of a [`TestWorld`].
pub fn start_of_test() -> NaiveDateTime {
    at(2024, 6, 1, 9)
}

/// Builds a local date-time on the hour.
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid test date")
}

/// One mock remote per entity type.
#[derive(Debug, Clone)]
pub struct MockRemotes {
    /// Task remote.
    pub tasks: Arc<MockRemoteClient<Task>>,
    /// Idea remote.
    pub ideas: Arc<MockRemoteClient<Idea>>,
    /// Review remote.
    pub reviews: Arc<MockRemoteClient<Review>>,
    /// Preset remote.
    pub presets: Arc<MockRemoteClient<Preset>>,
    /// Daily task remote.
    pub daily: Arc<MockRemoteClient<DailyTask>>,
}

impl Default for MockRemotes {
    fn default() -> Self {
        Self {
            tasks: Arc::new(MockRemoteClient::new()),
            ideas: Arc::new(MockRemoteClient::new()),
            reviews: Arc::new(MockRemoteClient::new()),
            presets: Arc::new(MockRemoteClient::new()),
            daily: Arc::new(MockRemoteClient::new()),
        }
    }
}

impl MockRemotes {
    /// Returns the remotes as trait objects.
    pub fn clients(&self) -> RemoteClients {
        RemoteClients {
            tasks: self.tasks.clone(),
            ideas: self.ideas.clone(),
            reviews: self.reviews.clone(),
            presets: self.presets.clone(),
            daily: self.daily.clone(),
        }
    }

    /// Switches every remote online or offline.
    pub fn set_online(&self, online: bool) {
        self.tasks.set_online(online);
        self.ideas.set_online(online);
        self.reviews.set_online(online);
        self.presets.set_online(online);
        self.daily.set_online(online);
    }

    /// Total calls across every remote.
    pub fn total_calls(&self) -> u64 {
        self.tasks.calls().total()
            + self.ideas.calls().total()
            + self.reviews.calls().total()
            + self.presets.calls().total()
            + self.daily.calls().total()
    }
}

/// Every service over a test store, a manual clock and mock remotes.
pub struct TestWorld {
    /// The store behind every service.
    pub store: Arc<dyn KvStore>,
    /// The in-memory store, for failure injection. `None` when file-backed.
    pub memory: Option<Arc<InMemoryKvStore>>,
    /// The clock.
    pub clock: Arc<ManualClock>,
    /// The cloud-enabled flag.
    pub cloud: CloudFlag,
    /// The remotes.
    pub remotes: MockRemotes,
    /// The services.
    pub services: AppServices,
    config: SyncConfig,
    _temp_dir: Option<Arc<TempDir>>,
}

impl TestWorld {
    /// An in-memory world with the cloud enabled.
    pub fn online() -> Self {
        Self::memory(true)
    }

    /// An in-memory world with the cloud disabled.
    pub fn offline() -> Self {
        Self::memory(false)
    }

    /// An in-memory world. Must be called within a tokio runtime.
    pub fn memory(online: bool) -> Self {
        let memory = Arc::new(InMemoryKvStore::new());
        let store: Arc<dyn KvStore> = memory.clone();
        Self::assemble(
            store,
            Some(memory),
            Arc::new(ManualClock::new(start_of_test())),
            CloudFlag::new(online),
            MockRemotes::default(),
            None,
        )
    }

    /// A world whose store lives in a temporary directory.
    pub async fn file(online: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileKvStore::open(temp_dir.path())
            .await
            .expect("Failed to open file store");
        Self::assemble(
            Arc::new(store),
            None,
            Arc::new(ManualClock::new(start_of_test())),
            CloudFlag::new(online),
            MockRemotes::default(),
            Some(Arc::new(temp_dir)),
        )
    }

    /// Simulates an app restart: fresh services and a fresh queue over the
    /// same store, clock, cloud flag and remotes.
    ///
    /// File-backed worlds reopen the directory from disk.
    pub async fn restart(&self) -> Self {
        let store: Arc<dyn KvStore> = match &self._temp_dir {
            Some(dir) => Arc::new(
                FileKvStore::open(dir.path())
                    .await
                    .expect("Failed to reopen file store"),
            ),
            None => Arc::clone(&self.store),
        };
        Self::assemble(
            store,
            self.memory.clone(),
            Arc::clone(&self.clock),
            self.cloud.clone(),
            self.remotes.clone(),
            self._temp_dir.clone(),
        )
    }

    /// Waits for every queued background job.
    pub async fn flush(&self) {
        self.services.flush().await;
    }

    /// Moves the clock to `now`.
    pub fn set_time(&self, now: NaiveDateTime) {
        self.clock.set(now);
    }

    /// Makes every write to the in-memory store fail.
    ///
    /// # Panics
    ///
    /// Panics on a file-backed world.
    pub fn fail_writes(&self, fail: bool) {
        self.memory
            .as_ref()
            .expect("failure injection needs an in-memory world")
            .set_fail_writes(fail);
    }

    /// Returns the configuration the world was built with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn assemble(
        store: Arc<dyn KvStore>,
        memory: Option<Arc<InMemoryKvStore>>,
        clock: Arc<ManualClock>,
        cloud: CloudFlag,
        remotes: MockRemotes,
        temp_dir: Option<Arc<TempDir>>,
    ) -> Self {
        let config = SyncConfig::default().with_remote_timeout(Duration::from_secs(1));
        let ctx = SyncContext::new(
            Arc::clone(&store),
            clock.clone(),
            cloud.clone(),
            config.clone(),
        );
        let services = AppServices::new(ctx, remotes.clients());
        Self {
            store,
            memory,
            clock,
            cloud,
            remotes,
            services,
            config,
            _temp_dir: temp_dir,
        }
    }
}
