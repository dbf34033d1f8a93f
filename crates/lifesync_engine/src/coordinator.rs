//! Sync coordinator: pull, merge, push and delete for one entity type.

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::idset::{PendingPushes, TombstoneTracker};
use crate::markers::MarkerStore;
use crate::remote::{patch_of, RemoteClient};
use crate::repository::Repository;
use lifesync_protocol::{ids, merge_last_writer_wins, merge_union, Record};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

/// The current activity of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing is running.
    Idle,
    /// A pull is in progress. Pushes are suppressed.
    Pulling,
    /// One or more pushes or remote deletes are in flight.
    Pushing,
}

impl SyncState {
    /// Returns true if any remote work is in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self, SyncState::Idle)
    }
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Pulls that merged a remote snapshot.
    pub pulls_completed: u64,
    /// Pulls whose remote listing failed.
    pub pulls_failed: u64,
    /// Records replaced or added by pulls.
    pub records_pulled: u64,
    /// Pushes confirmed by the remote.
    pub pushes_succeeded: u64,
    /// Pushes that failed and stay pending.
    pub pushes_failed: u64,
    /// Pushes skipped because a pull was in progress.
    pub pushes_suppressed: u64,
    /// Remote deletes confirmed; their tombstones were cleared.
    pub deletes_confirmed: u64,
    /// Remote deletes that failed or found nothing; tombstones kept.
    pub deletes_retained: u64,
    /// Time of the last completed pull, Unix milliseconds.
    pub last_pull_at: Option<i64>,
    /// Last remote error message.
    pub last_error: Option<String>,
}

/// How a record is pushed to the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushMode {
    /// Create; on "already exists" fall back to update.
    Upsert,
    /// Update; on "not found" fall back to create.
    Update,
    /// Create only. Used for freshly generated records.
    CreateOnly,
}

/// Who performed a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// A local edit: changed ids become pending pushes.
    Local,
    /// A merge applied by a pull: nothing becomes pending.
    Pull,
}

/// Options for [`SyncCoordinator::try_write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Who performed the write.
    pub origin: WriteOrigin,
    /// Push mode for every changed record. `None` picks `Upsert` for new ids
    /// and `Update` for modified ones.
    pub mode: Option<PushMode>,
}

impl WriteOptions {
    /// Options for a local edit.
    pub fn local() -> Self {
        Self {
            origin: WriteOrigin::Local,
            mode: None,
        }
    }

    /// Options for a write performed by a pull.
    pub fn pull() -> Self {
        Self {
            origin: WriteOrigin::Pull,
            mode: None,
        }
    }

    /// Forces the push mode.
    pub fn with_mode(mut self, mode: PushMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::local()
    }
}

/// Outcome of a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullStatus {
    /// The remote snapshot was merged.
    Completed,
    /// The cloud flag is off; nothing was attempted.
    Offline,
    /// Another pull on this coordinator was already running.
    AlreadyPulling,
    /// The remote listing failed; local state is untouched.
    Failed(String),
}

/// Result of [`SyncCoordinator::pull_from_cloud`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReport {
    /// What happened.
    pub status: PullStatus,
    /// Local records replaced by newer remote versions.
    pub replaced: usize,
    /// Remote-only records added.
    pub added: usize,
    /// Remote records skipped because they are tombstoned.
    pub suppressed: usize,
}

impl PullReport {
    fn with_status(status: PullStatus) -> Self {
        Self {
            status,
            replaced: 0,
            added: 0,
            suppressed: 0,
        }
    }

    /// Returns true if the remote snapshot was merged.
    pub fn is_completed(&self) -> bool {
        self.status == PullStatus::Completed
    }
}

/// Result of [`SyncCoordinator::pull_union`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionReport {
    /// What happened.
    pub status: PullStatus,
    /// Ids on both sides where the remote version won.
    pub remote_newer: usize,
    /// Remote-only records added.
    pub added: usize,
    /// Local-only records kept and scheduled for push.
    pub kept_local_only: usize,
    /// Local-only records dropped as deleted elsewhere.
    pub dropped_local_only: usize,
}

impl UnionReport {
    fn with_status(status: PullStatus) -> Self {
        Self {
            status,
            remote_newer: 0,
            added: 0,
            kept_local_only: 0,
            dropped_local_only: 0,
        }
    }

    /// Returns true if the remote snapshot was merged.
    pub fn is_completed(&self) -> bool {
        self.status == PullStatus::Completed
    }
}

/// Result of [`SyncCoordinator::sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// The pull that started the cycle.
    pub pull: PullReport,
    /// Pending records queued for push.
    pub pushes_scheduled: usize,
    /// Tombstoned ids queued for remote delete.
    pub deletes_scheduled: usize,
}

/// Transforms the merged snapshot before it is saved (e.g. compaction).
pub type PostMergeHook<R> = Arc<dyn Fn(Vec<R>) -> Vec<R> + Send + Sync>;

#[derive(Debug, Default)]
struct Activity {
    pulling: bool,
    pushes: usize,
}

struct PullGuard<'a>(&'a Mutex<Activity>);

impl Drop for PullGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().pulling = false;
    }
}

struct PushGuard<'a>(&'a Mutex<Activity>);

impl<'a> PushGuard<'a> {
    fn enter(activity: &'a Mutex<Activity>) -> Self {
        activity.lock().pushes += 1;
        Self(activity)
    }
}

impl Drop for PushGuard<'_> {
    fn drop(&mut self) {
        let mut activity = self.0.lock();
        activity.pushes = activity.pushes.saturating_sub(1);
    }
}

struct Inner<R: Record> {
    ctx: SyncContext,
    remote: Arc<dyn RemoteClient<R>>,
    repo: Repository<R>,
    tombstones: TombstoneTracker,
    pending: PendingPushes,
    activity: Mutex<Activity>,
    stats: RwLock<SyncStats>,
    post_merge: RwLock<Option<PostMergeHook<R>>>,
}

/// Local-first sync for one entity type.
///
/// Public writes complete locally and return; pushes and remote deletes
/// run later on the context's [`BackgroundQueue`](crate::BackgroundQueue).
/// Remote failures are logged and counted in [`SyncStats`]; only local
/// storage failures are returned.
///
/// While a pull runs, [`SyncCoordinator::is_syncing_from_cloud`] is true and
/// no push is scheduled, whoever triggered it. Local edits made during that
/// window stay pending and go out with the next [`SyncCoordinator::sync`].
pub struct SyncCoordinator<R: Record> {
    inner: Arc<Inner<R>>,
}

impl<R: Record> Clone for SyncCoordinator<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Record> std::fmt::Debug for SyncCoordinator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("kind", &R::KIND)
            .field("state", &self.state())
            .finish()
    }
}

impl<R: Record> SyncCoordinator<R> {
    /// Creates a coordinator over the context's store for `R::KIND`.
    pub fn new(ctx: SyncContext, remote: Arc<dyn RemoteClient<R>>) -> Self {
        let keys = ctx.config().keys_for(R::KIND);
        let store = Arc::clone(ctx.store());
        Self {
            inner: Arc::new(Inner {
                repo: Repository::new(Arc::clone(&store), keys.records),
                tombstones: TombstoneTracker::new(Arc::clone(&store), keys.tombstones),
                pending: PendingPushes::new(store, keys.pending),
                ctx,
                remote,
                activity: Mutex::new(Activity::default()),
                stats: RwLock::new(SyncStats::default()),
                post_merge: RwLock::new(None),
            }),
        }
    }

    /// Installs a hook applied to every merged snapshot before it is saved.
    pub fn with_post_merge(self, hook: PostMergeHook<R>) -> Self {
        *self.inner.post_merge.write() = Some(hook);
        self
    }

    /// Returns the shared context.
    pub fn context(&self) -> &SyncContext {
        &self.inner.ctx
    }

    /// Returns the repository.
    pub fn repository(&self) -> &Repository<R> {
        &self.inner.repo
    }

    /// Returns the tombstone tracker.
    pub fn tombstones(&self) -> &TombstoneTracker {
        &self.inner.tombstones
    }

    /// Returns the pending-push set.
    pub fn pending(&self) -> &PendingPushes {
        &self.inner.pending
    }

    /// Returns the marker store.
    pub fn markers(&self) -> MarkerStore {
        self.inner.ctx.markers()
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        let activity = self.inner.activity.lock();
        if activity.pulling {
            SyncState::Pulling
        } else if activity.pushes > 0 {
            SyncState::Pushing
        } else {
            SyncState::Idle
        }
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.inner.stats.read().clone()
    }

    /// Returns true while a pull is in progress.
    pub fn is_syncing_from_cloud(&self) -> bool {
        self.inner.activity.lock().pulling
    }

    /// Returns the local collection.
    pub async fn list(&self) -> SyncResult<Vec<R>> {
        self.inner.repo.load().await
    }

    /// Returns the local record `id`.
    pub async fn get(&self, id: &str) -> SyncResult<Option<R>> {
        self.inner.repo.find(id).await
    }

    /// Applies an infallible local edit and schedules pushes for what changed.
    pub async fn write<T, F>(&self, f: F) -> SyncResult<T>
    where
        F: FnOnce(&mut Vec<R>) -> T,
    {
        self.try_write(WriteOptions::local(), |records| {
            Ok::<T, SyncError>(f(records))
        })
        .await
    }

    /// Applies an edit under the collection lock.
    ///
    /// If `f` fails, nothing is saved and nothing is pushed. Otherwise the
    /// collection is saved, changed ids are marked pending (for local
    /// writes) and pushes are scheduled unless the cloud is off or a pull
    /// is in progress.
    pub async fn try_write<T, E, F>(&self, options: WriteOptions, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Vec<R>) -> Result<T, E>,
        E: From<SyncError>,
    {
        let (value, changes) = self
            .inner
            .repo
            .try_mutate(|records| {
                let before = fingerprints(records)?;
                let value = f(records)?;
                let changes = diff(&before, records, options.mode)?;
                Ok::<_, E>((value, changes))
            })
            .await?;

        if !changes.is_empty() {
            if options.origin == WriteOrigin::Local {
                self.inner
                    .pending
                    .mark(changes.iter().map(|(id, _)| id.clone()))
                    .await?;
            }
            self.schedule_pushes(changes);
        }
        Ok(value)
    }

    /// Deletes a record locally and schedules the remote delete.
    ///
    /// The tombstone is written before the record is removed, so a crash in
    /// between leaves a tombstoned record that the next pull filters out.
    /// Returns true if the record existed locally.
    pub async fn delete(&self, id: &str) -> SyncResult<bool> {
        Ok(self.delete_many(vec![id.to_string()]).await? > 0)
    }

    /// Deletes several records; returns how many existed locally.
    ///
    /// Ids that exist only remotely are tombstoned and deleted remotely too.
    pub async fn delete_many(&self, ids: Vec<String>) -> SyncResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.inner.tombstones.add_many(ids.iter().cloned()).await?;
        let doomed: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
        let removed = self
            .inner
            .repo
            .mutate(|records| {
                let before = records.len();
                records.retain(|r| !doomed.contains(r.id()));
                before - records.len()
            })
            .await?;
        self.inner.pending.clear_many(ids.iter().cloned()).await?;
        tracing::debug!(entity = R::KIND, count = ids.len(), removed, "deleted locally");

        for id in ids {
            self.schedule_remote_delete(id);
        }
        Ok(removed)
    }

    /// Lists the remote collection without merging.
    ///
    /// Returns `None` when the cloud is off or the call failed.
    pub async fn fetch_remote(&self) -> Option<Vec<R>> {
        if !self.inner.ctx.cloud().is_enabled() {
            return None;
        }
        match self.remote_call(self.inner.remote.list()).await {
            Ok(records) => Some(records),
            Err(e) => {
                self.record_error(&e);
                tracing::warn!(entity = R::KIND, error = %e, "remote listing failed");
                None
            }
        }
    }

    /// Pulls the remote collection and merges it with last-writer-wins.
    ///
    /// Remote failures are reported in the [`PullReport`]; only local
    /// storage failures are returned as errors.
    pub async fn pull_from_cloud(&self) -> SyncResult<PullReport> {
        if !self.inner.ctx.cloud().is_enabled() {
            return Ok(PullReport::with_status(PullStatus::Offline));
        }
        let Some(_guard) = self.begin_pull() else {
            tracing::debug!(entity = R::KIND, "pull already running; skipped");
            return Ok(PullReport::with_status(PullStatus::AlreadyPulling));
        };

        let remote = match self.remote_call(self.inner.remote.list()).await {
            Ok(remote) => remote,
            Err(e) => return Ok(PullReport::with_status(self.pull_failed(e))),
        };

        let tombstones = self.inner.tombstones.all().await?;
        let policy = self.inner.ctx.config().merge_policy();
        let hook = self.inner.post_merge.read().clone();
        let report = self
            .try_write(WriteOptions::pull(), |records| {
                let outcome = merge_last_writer_wins(records, &remote, &tombstones, &policy);
                let report = PullReport {
                    status: PullStatus::Completed,
                    replaced: outcome.replaced.len(),
                    added: outcome.added.len(),
                    suppressed: outcome.suppressed.len(),
                };
                *records = apply_hook(hook.as_ref(), outcome.records);
                Ok::<_, SyncError>(report)
            })
            .await?;
        self.purge_late_tombstones(&tombstones).await?;
        self.finish_pull((report.replaced + report.added) as u64)
            .await?;

        tracing::info!(
            entity = R::KIND,
            replaced = report.replaced,
            added = report.added,
            suppressed = report.suppressed,
            "pull merged"
        );
        Ok(report)
    }

    /// Pulls and merges with set-union semantics.
    ///
    /// Local-only records that are younger than the grace window or still
    /// pending are kept and marked pending. Once the pull has finished every
    /// outstanding push and remote delete is scheduled, as in
    /// [`SyncCoordinator::push_outstanding`].
    pub async fn pull_union(&self) -> SyncResult<UnionReport> {
        if !self.inner.ctx.cloud().is_enabled() {
            return Ok(UnionReport::with_status(PullStatus::Offline));
        }
        let (report, kept) = {
            let Some(_guard) = self.begin_pull() else {
                return Ok(UnionReport::with_status(PullStatus::AlreadyPulling));
            };
            let remote = match self.remote_call(self.inner.remote.list()).await {
                Ok(remote) => remote,
                Err(e) => return Ok(UnionReport::with_status(self.pull_failed(e))),
            };

            let tombstones = self.inner.tombstones.all().await?;
            let pending = self.inner.pending.all().await?;
            let now_ms = self.inner.ctx.clock().now_ms();
            let policy = self.inner.ctx.config().merge_policy();
            let hook = self.inner.post_merge.read().clone();
            let (report, kept) = self
                .try_write(WriteOptions::pull(), |records| {
                    let outcome =
                        merge_union(records, &remote, &tombstones, &pending, now_ms, &policy);
                    let report = UnionReport {
                        status: PullStatus::Completed,
                        remote_newer: outcome.remote_newer.len(),
                        added: outcome.added.len(),
                        kept_local_only: outcome.kept_local_only.len(),
                        dropped_local_only: outcome.dropped_local_only.len(),
                    };
                    *records = apply_hook(hook.as_ref(), outcome.records);
                    Ok::<_, SyncError>((report, outcome.kept_local_only))
                })
                .await?;
            self.purge_late_tombstones(&tombstones).await?;
            self.finish_pull((report.remote_newer + report.added) as u64)
                .await?;
            tracing::info!(
                entity = R::KIND,
                remote_newer = report.remote_newer,
                added = report.added,
                kept_local_only = report.kept_local_only,
                dropped_local_only = report.dropped_local_only,
                "union merge applied"
            );
            (report, kept)
        };

        if !kept.is_empty() {
            self.inner.pending.mark(kept).await?;
        }
        self.push_outstanding().await?;
        Ok(report)
    }

    /// Runs a full cycle: pull, push every pending record, then re-issue
    /// the remote delete of every tombstone.
    pub async fn sync(&self) -> SyncResult<SyncReport> {
        let pull = self.pull_from_cloud().await?;
        let (pushes_scheduled, deletes_scheduled) = self.push_outstanding().await?;
        Ok(SyncReport {
            pull,
            pushes_scheduled,
            deletes_scheduled,
        })
    }

    /// Pushes every pending record inline, then runs [`SyncCoordinator::sync`].
    ///
    /// For collections whose post-merge hook may drop local versions that
    /// the remote has not confirmed yet. If any push fails the pull is
    /// skipped and the report carries the push error as a failed pull, so a
    /// pending version is never merged away.
    pub async fn push_then_sync(&self) -> SyncResult<SyncReport> {
        if self.inner.ctx.cloud().is_enabled() {
            let present = ids(&self.inner.repo.load().await?);
            for id in self.inner.pending.all().await? {
                if !present.contains(&id) {
                    continue;
                }
                match self.push_record(&id, PushMode::Upsert).await {
                    Ok(()) => {}
                    Err(e) if e.is_local() => return Err(e),
                    Err(e) => {
                        tracing::warn!(
                            entity = R::KIND,
                            id = %id,
                            error = %e,
                            "pending push failed; pull deferred"
                        );
                        return Ok(SyncReport {
                            pull: PullReport::with_status(PullStatus::Failed(e.to_string())),
                            pushes_scheduled: 0,
                            deletes_scheduled: 0,
                        });
                    }
                }
            }
        }
        self.sync().await
    }

    /// Schedules a push for every pending record still present locally and
    /// a remote delete for every tombstone. Pending ids whose record is gone
    /// are dropped.
    ///
    /// Returns the number of pushes and deletes scheduled; both are zero
    /// when the cloud is off.
    pub async fn push_outstanding(&self) -> SyncResult<(usize, usize)> {
        if !self.inner.ctx.cloud().is_enabled() {
            return Ok((0, 0));
        }
        let present = ids(&self.inner.repo.load().await?);
        let pending = self.inner.pending.all().await?;
        let (live, stale): (Vec<String>, Vec<String>) =
            pending.into_iter().partition(|id| present.contains(id));
        if !stale.is_empty() {
            tracing::debug!(entity = R::KIND, count = stale.len(), "dropping stale pending ids");
            self.inner.pending.clear_many(stale).await?;
        }
        let pushes = live.len();
        self.schedule_pushes(live.into_iter().map(|id| (id, PushMode::Upsert)).collect());

        let tombstones = self.inner.tombstones.all().await?;
        let deletes = tombstones.len();
        for id in tombstones {
            self.schedule_remote_delete(id);
        }
        Ok((pushes, deletes))
    }

    /// Queues a pull on the background queue.
    pub fn schedule_pull(&self) -> bool {
        if !self.inner.ctx.cloud().is_enabled() {
            return false;
        }
        let this = self.clone();
        self.inner
            .ctx
            .queue()
            .submit(format!("pull {}", R::KIND), async move {
                this.pull_from_cloud().await.map(|_| ())
            })
    }

    fn schedule_pushes(&self, changes: Vec<(String, PushMode)>) {
        if changes.is_empty() || !self.inner.ctx.cloud().is_enabled() {
            return;
        }
        if self.is_syncing_from_cloud() {
            self.inner.stats.write().pushes_suppressed += changes.len() as u64;
            tracing::debug!(
                entity = R::KIND,
                count = changes.len(),
                "pull in progress; pushes suppressed"
            );
            return;
        }
        for (id, mode) in changes {
            let this = self.clone();
            let label = format!("push {}:{id}", R::KIND);
            self.inner
                .ctx
                .queue()
                .submit(label, async move { this.push_record(&id, mode).await });
        }
    }

    fn schedule_remote_delete(&self, id: String) {
        if !self.inner.ctx.cloud().is_enabled() {
            return;
        }
        let this = self.clone();
        let label = format!("delete {}:{id}", R::KIND);
        self.inner
            .ctx
            .queue()
            .submit(label, async move { this.delete_remote(&id).await });
    }

    async fn push_record(&self, id: &str, mode: PushMode) -> SyncResult<()> {
        if !self.inner.ctx.cloud().is_enabled() {
            return Ok(());
        }
        let Some(record) = self.inner.repo.find(id).await? else {
            self.inner.pending.clear(id).await?;
            return Ok(());
        };

        let _guard = PushGuard::enter(&self.inner.activity);
        let remote = &self.inner.remote;
        let result = match mode {
            PushMode::Upsert => match self.remote_call(remote.create(&record)).await {
                Err(e) if e.is_already_exists() => {
                    let patch = patch_of(&record)?;
                    self.remote_call(remote.update(id, &patch)).await
                }
                other => other,
            },
            PushMode::Update => {
                let patch = patch_of(&record)?;
                match self.remote_call(remote.update(id, &patch)).await {
                    Err(e) if e.is_not_found() => self.remote_call(remote.create(&record)).await,
                    other => other,
                }
            }
            PushMode::CreateOnly => self.remote_call(remote.create(&record)).await,
        };

        match result {
            Ok(_) => {
                // An edit made while the push was in flight stays pending.
                let pushed = fingerprint(&record)?;
                let current = match self.inner.repo.find(id).await? {
                    Some(current) => Some(fingerprint(&current)?),
                    None => None,
                };
                if current.map_or(true, |current| current == pushed) {
                    self.inner.pending.clear(id).await?;
                }
                self.inner.stats.write().pushes_succeeded += 1;
                tracing::debug!(entity = R::KIND, id, ?mode, "pushed");
                Ok(())
            }
            Err(e) => {
                self.inner.stats.write().pushes_failed += 1;
                self.record_error(&e);
                Err(e)
            }
        }
    }

    async fn delete_remote(&self, id: &str) -> SyncResult<()> {
        let _guard = PushGuard::enter(&self.inner.activity);
        match self.remote_call(self.inner.remote.delete(id)).await {
            Ok(()) => {
                self.inner.tombstones.remove(id).await?;
                self.inner.stats.write().deletes_confirmed += 1;
                tracing::debug!(entity = R::KIND, id, "remote delete confirmed");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                self.inner.stats.write().deletes_retained += 1;
                tracing::debug!(entity = R::KIND, id, "already absent remotely; tombstone kept");
                Ok(())
            }
            Err(e) => {
                self.inner.stats.write().deletes_retained += 1;
                self.record_error(&e);
                Err(e)
            }
        }
    }

    async fn remote_call<T, Fut>(&self, call: Fut) -> SyncResult<T>
    where
        Fut: Future<Output = SyncResult<T>>,
    {
        tokio::time::timeout(self.inner.ctx.config().remote_timeout, call)
            .await
            .map_err(|_| SyncError::Timeout)?
    }

    fn begin_pull(&self) -> Option<PullGuard<'_>> {
        let mut activity = self.inner.activity.lock();
        if activity.pulling {
            return None;
        }
        activity.pulling = true;
        Some(PullGuard(&self.inner.activity))
    }

    fn pull_failed(&self, error: SyncError) -> PullStatus {
        self.inner.stats.write().pulls_failed += 1;
        self.record_error(&error);
        tracing::warn!(entity = R::KIND, %error, "pull failed; keeping local snapshot");
        PullStatus::Failed(error.to_string())
    }

    async fn finish_pull(&self, pulled: u64) -> SyncResult<()> {
        let ctx = &self.inner.ctx;
        ctx.markers()
            .mark_synced(R::KIND, ctx.clock().today())
            .await?;
        let mut stats = self.inner.stats.write();
        stats.pulls_completed += 1;
        stats.records_pulled += pulled;
        stats.last_pull_at = Some(ctx.clock().now_ms());
        Ok(())
    }

    /// Removes records tombstoned while the pull was merging.
    async fn purge_late_tombstones(&self, seen: &BTreeSet<String>) -> SyncResult<()> {
        let late: BTreeSet<String> = self
            .inner
            .tombstones
            .all()
            .await?
            .difference(seen)
            .cloned()
            .collect();
        if late.is_empty() {
            return Ok(());
        }
        self.inner
            .repo
            .mutate(|records| records.retain(|r| !late.contains(r.id())))
            .await
    }

    fn record_error(&self, error: &SyncError) {
        self.inner.stats.write().last_error = Some(error.to_string());
    }
}

fn apply_hook<R>(hook: Option<&PostMergeHook<R>>, records: Vec<R>) -> Vec<R> {
    match hook {
        Some(hook) => hook(records),
        None => records,
    }
}

fn fingerprint<R: Record>(record: &R) -> SyncResult<String> {
    serde_json::to_string(record).map_err(|e| SyncError::codec(record.id(), e))
}

fn fingerprints<R: Record>(records: &[R]) -> SyncResult<HashMap<String, String>> {
    records
        .iter()
        .map(|r| fingerprint(r).map(|f| (r.id().to_string(), f)))
        .collect()
}

fn diff<R: Record>(
    before: &HashMap<String, String>,
    after: &[R],
    mode: Option<PushMode>,
) -> SyncResult<Vec<(String, PushMode)>> {
    let mut changes = Vec::new();
    for record in after {
        let current = fingerprint(record)?;
        let detected = match before.get(record.id()) {
            None => PushMode::Upsert,
            Some(old) if *old != current => PushMode::Update,
            Some(_) => continue,
        };
        changes.push((record.id().to_string(), mode.unwrap_or(detected)));
    }
    Ok(changes)
}
