//! Shared fixture for unit tests.

use crate::app::{AppServices, RemoteClients};
use crate::model::{DailyTask, Idea, Preset, Review, Task};
use chrono::NaiveDate;
use lifesync_engine::{CloudFlag, ManualClock, MockRemoteClient, SyncConfig, SyncContext};
use lifesync_storage::InMemoryKvStore;
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct MockRemotes {
    pub tasks: Arc<MockRemoteClient<Task>>,
    pub ideas: Arc<MockRemoteClient<Idea>>,
    pub reviews: Arc<MockRemoteClient<Review>>,
    pub presets: Arc<MockRemoteClient<Preset>>,
    pub daily: Arc<MockRemoteClient<DailyTask>>,
}

impl MockRemotes {
    fn new() -> Self {
        Self {
            tasks: Arc::new(MockRemoteClient::new()),
            ideas: Arc::new(MockRemoteClient::new()),
            reviews: Arc::new(MockRemoteClient::new()),
            presets: Arc::new(MockRemoteClient::new()),
            daily: Arc::new(MockRemoteClient::new()),
        }
    }

    fn clients(&self) -> RemoteClients {
        RemoteClients {
            tasks: self.tasks.clone(),
            ideas: self.ideas.clone(),
            reviews: self.reviews.clone(),
            presets: self.presets.clone(),
            daily: self.daily.clone(),
        }
    }

    pub fn total_calls(&self) -> u64 {
        self.tasks.calls().total()
            + self.ideas.calls().total()
            + self.reviews.calls().total()
            + self.presets.calls().total()
            + self.daily.calls().total()
    }
}

/// Services over an in-memory store, a manual clock frozen at
/// 2024-06-01 09:00 and mock remotes.
pub(crate) struct Fixture {
    pub store: Arc<InMemoryKvStore>,
    pub clock: Arc<ManualClock>,
    pub cloud: CloudFlag,
    pub remotes: MockRemotes,
    pub services: AppServices,
}

impl Fixture {
    pub fn online() -> Self {
        Self::build(true)
    }

    pub fn offline() -> Self {
        Self::build(false)
    }

    fn build(online: bool) -> Self {
        let store = Arc::new(InMemoryKvStore::new());
        let clock = Arc::new(ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        ));
        let cloud = CloudFlag::new(online);
        let config = SyncConfig::default().with_remote_timeout(Duration::from_secs(1));
        let ctx = SyncContext::new(store.clone(), clock.clone(), cloud.clone(), config);
        let remotes = MockRemotes::new();
        let services = AppServices::new(ctx, remotes.clients());
        Self {
            store,
            clock,
            cloud,
            remotes,
            services,
        }
    }

    pub async fn flush(&self) {
        self.services.flush().await;
    }
}
