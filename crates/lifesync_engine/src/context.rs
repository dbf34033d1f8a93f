//! Shared collaborators for every coordinator and service.

use crate::clock::Clock;
use crate::cloud::CloudFlag;
use crate::config::SyncConfig;
use crate::coordinator::SyncCoordinator;
use crate::markers::MarkerStore;
use crate::queue::BackgroundQueue;
use crate::remote::RemoteClient;
use lifesync_protocol::Record;
use lifesync_storage::KvStore;
use std::sync::Arc;

/// The local store, clock, cloud flag, background queue and configuration
/// shared by all entity types. Cloning is cheap and shares everything.
#[derive(Clone)]
pub struct SyncContext {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    cloud: CloudFlag,
    queue: BackgroundQueue,
    config: SyncConfig,
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("cloud", &self.cloud.is_enabled())
            .field("queue", &self.queue)
            .field("config", &self.config)
            .finish()
    }
}

impl SyncContext {
    /// Creates a context and starts its background queue.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        cloud: CloudFlag,
        config: SyncConfig,
    ) -> Self {
        let queue = BackgroundQueue::start(config.queue_capacity);
        Self {
            store,
            clock,
            cloud,
            queue,
            config,
        }
    }

    /// Creates a coordinator for entity type `R`.
    pub fn coordinator<R: Record>(&self, remote: Arc<dyn RemoteClient<R>>) -> SyncCoordinator<R> {
        SyncCoordinator::new(self.clone(), remote)
    }

    /// Returns the local store.
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Returns the clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns the cloud-enabled flag.
    pub fn cloud(&self) -> &CloudFlag {
        &self.cloud
    }

    /// Returns the background queue.
    pub fn queue(&self) -> &BackgroundQueue {
        &self.queue
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns a marker store over the shared local store.
    pub fn markers(&self) -> MarkerStore {
        MarkerStore::new(Arc::clone(&self.store), self.config.clone())
    }
}
