//! Sync orchestrator.
//!
//! [`SyncService`] owns reconciliation passes. A pass is single-flight:
//! the `syncing` flag is taken at entry and released by a guard on every
//! exit path, panics included. Within a pass items are pushed one at a
//! time in FIFO order, then one pull closes the pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::item::{ItemFilter, NewItem, QueueItem};
use super::queue::SyncQueue;
use super::result::{SyncResult, SyncStats, OFFLINE, SYNC_IN_PROGRESS};
use super::scheduler::{self, ScheduledTask};
use super::stats::compute_stats;
use crate::config::{Config, SyncSettings};
use crate::error::SyncError;
use crate::remote::{
    ChangeSink, ConnectivityProbe, HttpProbe, HttpRemote, LogSink, PullAdapter, PullOutcome,
    PushAdapter, PushOutcome,
};

/// Holds the single-flight flag for the lifetime of a pass.
struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// The offline-first sync engine.
///
/// Construct one per application at the composition root and share it as
/// `Arc<SyncService>` with producers.
pub struct SyncService {
    queue: SyncQueue,
    push: Arc<dyn PushAdapter>,
    pull: Arc<dyn PullAdapter>,
    sink: Arc<dyn ChangeSink>,
    connectivity: Arc<dyn ConnectivityProbe>,
    settings: SyncSettings,
    syncing: AtomicBool,
    auto_sync: Mutex<Option<ScheduledTask>>,
    connectivity_watch: Mutex<Option<ScheduledTask>>,
}

impl SyncService {
    /// Assemble a service from its collaborators.
    ///
    /// Pulled changes go to a [`LogSink`] until [`Self::with_sink`] is used.
    #[must_use]
    pub fn new(
        queue: SyncQueue,
        push: Arc<dyn PushAdapter>,
        pull: Arc<dyn PullAdapter>,
        connectivity: Arc<dyn ConnectivityProbe>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            queue,
            push,
            pull,
            sink: Arc::new(LogSink),
            connectivity,
            settings,
            syncing: AtomicBool::new(false),
            auto_sync: Mutex::new(None),
            connectivity_watch: Mutex::new(None),
        }
    }

    /// Hand pulled changes to the data layer's sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ChangeSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Wire the HTTP adapters and the queue at the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or an HTTP client
    /// cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        let remote = Arc::new(HttpRemote::new(&config.remote, &config.sync)?);
        let probe = Arc::new(HttpProbe::new(&config.connectivity)?);

        Ok(Self::new(
            SyncQueue::new()?,
            remote.clone(),
            remote,
            probe,
            config.sync.clone(),
        ))
    }

    #[must_use]
    pub const fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    #[must_use]
    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub(crate) fn connectivity(&self) -> &dyn ConnectivityProbe {
        self.connectivity.as_ref()
    }

    /// Whether a pass is in flight right now.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Queue a mutation for the remote authority.
    ///
    /// When enabled in settings and no pass is running, a pass is started in
    /// the background; its outcome is not reported to the caller. Never
    /// waits on a pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be persisted.
    pub fn enqueue(self: &Arc<Self>, item: NewItem) -> Result<QueueItem, SyncError> {
        let queued = self.queue.enqueue(&item)?;
        debug!(
            item_id = queued.id,
            operation = %queued.operation,
            entity_type = %queued.entity_type,
            record_id = %queued.record_id,
            "Queued mutation"
        );

        if self.settings.trigger_on_enqueue && !self.is_syncing() {
            self.spawn_pass("enqueue");
        }

        Ok(queued)
    }

    /// Run one reconciliation pass.
    ///
    /// Always returns a result. `success` is `false` only when the pass did
    /// not run: another pass holds the flag, the probe says offline, or the
    /// batch could not be read.
    pub async fn sync(&self) -> SyncResult {
        let Some(_guard) = PassGuard::acquire(&self.syncing) else {
            debug!("Sync pass requested while another is running");
            return SyncResult::aborted(SYNC_IN_PROGRESS);
        };

        if !self.connectivity.probe().await {
            info!("Skipping sync pass: offline");
            return SyncResult::aborted(OFFLINE);
        }

        let batch = match self
            .queue
            .select_batch(self.settings.batch_size, self.settings.max_retries)
        {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, "Failed to select sync batch");
                return SyncResult::aborted(&e.to_string());
            }
        };

        let mut result = SyncResult::started();
        let delay = self.settings.item_delay();

        for (index, item) in batch.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.push_item(item, &mut result).await;
        }

        self.pull_remote(&mut result).await;

        info!(
            batch = batch.len(),
            synced = result.synced,
            failed = result.failed,
            conflicts = result.conflicts,
            pulled = result.pulled,
            "Sync pass finished"
        );
        result
    }

    async fn push_item(&self, item: &QueueItem, result: &mut SyncResult) {
        let timeout = self.settings.push_timeout();
        let outcome = match tokio::time::timeout(timeout, self.push.push_one(item)).await {
            Ok(outcome) => outcome,
            Err(_) => PushOutcome::Failed(format!("Push timed out after {}s", timeout.as_secs())),
        };

        let target = item.target();
        let recorded = match &outcome {
            PushOutcome::Success => self.queue.mark_synced(item.id),
            PushOutcome::Conflict(reason) => self
                .queue
                .mark_conflict(item.id, &format!("Conflict: {reason}")),
            PushOutcome::Failed(reason) => self.queue.mark_failed(item.id, reason),
        };

        match recorded {
            Ok(true) => {}
            Ok(false) => {
                // Discarded (or otherwise settled) while the push was in flight
                warn!(item_id = item.id, target = %target, "Queue item changed during the pass; outcome not counted");
                return;
            }
            Err(e) => {
                error!(item_id = item.id, error = %e, "Failed to record push outcome");
                result.errors.push(format!("{target}: {e}"));
                return;
            }
        }

        match outcome {
            PushOutcome::Success => {
                debug!(item_id = item.id, target = %target, "Pushed");
                result.synced += 1;
            }
            PushOutcome::Conflict(reason) => {
                warn!(item_id = item.id, target = %target, reason = %reason, "Remote rejected mutation with a conflict");
                result.conflicts += 1;
                result.errors.push(format!("Conflict on {target}: {reason}"));
            }
            PushOutcome::Failed(reason) => {
                let attempts = item.retry_count + 1;
                if attempts >= self.settings.max_retries {
                    warn!(item_id = item.id, target = %target, attempts, reason = %reason, "Push failed; item is now dormant");
                } else {
                    warn!(item_id = item.id, target = %target, attempts, reason = %reason, "Push failed");
                }
                result.failed += 1;
                result.errors.push(format!("{target}: {reason}"));
            }
        }
    }

    async fn pull_remote(&self, result: &mut SyncResult) {
        let cursor = match self.queue.pull_cursor() {
            Ok(cursor) => cursor,
            Err(e) => {
                error!(error = %e, "Failed to read pull cursor");
                result.errors.push(format!("Pull skipped: {e}"));
                return;
            }
        };

        let timeout = self.settings.pull_timeout();
        let batch = match tokio::time::timeout(timeout, self.pull.pull_changes(cursor.as_deref())).await {
            Err(_) => {
                warn!("Pull timed out");
                result
                    .errors
                    .push(format!("Pull timed out after {}s", timeout.as_secs()));
                return;
            }
            Ok(Ok(PullOutcome::Unauthenticated) | Err(SyncError::Unauthenticated)) => {
                debug!("Not authenticated; skipping pull");
                return;
            }
            Ok(Err(e)) => {
                if e.is_transient() {
                    warn!(error = %e, "Pull failed");
                } else {
                    error!(error = %e, "Pull failed");
                }
                result.errors.push(format!("Pull failed: {e}"));
                return;
            }
            Ok(Ok(PullOutcome::Changes(batch))) => batch,
        };

        if !batch.changes.is_empty() {
            if let Err(e) = self.sink.apply(&batch.changes).await {
                error!(error = %e, count = batch.changes.len(), "Failed to apply pulled changes");
                result.errors.push(format!("Applying pulled changes failed: {e}"));
                return;
            }
        }
        result.pulled = batch.changes.len();

        if let Some(cursor) = batch.cursor {
            if let Err(e) = self.queue.set_pull_cursor(&cursor) {
                error!(error = %e, "Failed to store pull cursor");
                result.errors.push(format!("Pull cursor not saved: {e}"));
            }
        }
    }

    /// Start a pass in the background if a Tokio runtime is available.
    fn spawn_pass(self: &Arc<Self>, reason: &'static str) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(reason, "No async runtime; not starting a sync pass");
            return false;
        };

        let service = Arc::clone(self);
        runtime.spawn(async move {
            let result = service.sync().await;
            debug!(
                reason,
                success = result.success,
                synced = result.synced,
                "Triggered sync pass returned"
            );
        });
        true
    }

    /// Host hook for "the network came back"; starts a pass immediately.
    ///
    /// Still subject to the single-flight guard.
    pub fn notify_connectivity_restored(self: &Arc<Self>) {
        info!("Connectivity restored");
        self.spawn_pass("connectivity");
    }

    /// Snapshot for dashboards.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    pub async fn stats(&self) -> Result<SyncStats, SyncError> {
        let items = self.queue.list(&ItemFilter::all(), self.settings.max_retries)?;
        let is_online = self.connectivity.probe().await;

        Ok(compute_stats(
            items,
            self.settings.max_retries,
            is_online,
            self.is_syncing(),
            Utc::now(),
        ))
    }

    /// Give every dormant item a fresh retry budget and run a pass.
    pub async fn retry_failed(&self) -> SyncResult {
        match self.queue.reset_dormant(self.settings.max_retries) {
            Ok(count) => info!(count, "Reset dormant items"),
            Err(e) => {
                error!(error = %e, "Failed to reset dormant items");
                return SyncResult::aborted(&e.to_string());
            }
        }

        self.sync().await
    }

    /// Reset one unsynced item's retry metadata.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::NotFound` if no unsynced item has this ID.
    pub fn reset_item(&self, id: i64) -> Result<(), SyncError> {
        if self.queue.reset_item(id)? {
            info!(item_id = id, "Reset queue item");
            Ok(())
        } else {
            Err(SyncError::NotFound(format!("Unsynced queue item {id}")))
        }
    }

    /// Drop one unsynced item whose mutation should no longer be applied.
    ///
    /// This is the manual way out for items stuck in conflict.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::NotFound` if no unsynced item has this ID.
    pub fn discard_item(&self, id: i64) -> Result<(), SyncError> {
        if self.queue.discard(id)? {
            warn!(item_id = id, "Discarded queue item");
            Ok(())
        } else {
            Err(SyncError::NotFound(format!("Unsynced queue item {id}")))
        }
    }

    /// Delete synced items older than `retention_days`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear_synced_items(&self, retention_days: u32) -> Result<usize, SyncError> {
        // A window reaching past the earliest representable time keeps everything
        let cutoff = chrono::Duration::try_days(i64::from(retention_days))
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let removed = self.queue.clear_synced_before(cutoff)?;
        info!(removed, retention_days, "Cleared synced items");
        Ok(removed)
    }

    /// Run a pass every `interval` while online and idle.
    ///
    /// Replaces any previous timer.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` for a zero interval or when called
    /// outside a Tokio runtime.
    pub fn start_auto_sync(self: &Arc<Self>, interval: Duration) -> Result<(), SyncError> {
        let task = scheduler::spawn_auto_sync(Arc::downgrade(self), interval)?;
        info!(interval_secs = interval.as_secs(), "Auto-sync started");

        if let Some(previous) = self.auto_sync.lock().replace(task) {
            previous.stop();
        }
        Ok(())
    }

    /// Cancel the auto-sync timer. A pass already running is not interrupted.
    pub fn stop_auto_sync(&self) {
        if let Some(task) = self.auto_sync.lock().take() {
            task.stop();
            info!("Auto-sync stopped");
        }
    }

    #[must_use]
    pub fn is_auto_syncing(&self) -> bool {
        self.auto_sync.lock().is_some()
    }

    /// Re-probe every `poll` and start a pass on each offline → online edge.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` for a zero period or when called outside
    /// a Tokio runtime.
    pub fn start_connectivity_watch(self: &Arc<Self>, poll: Duration) -> Result<(), SyncError> {
        let task = scheduler::spawn_connectivity_watch(Arc::downgrade(self), poll)?;

        if let Some(previous) = self.connectivity_watch.lock().replace(task) {
            previous.stop();
        }
        Ok(())
    }

    pub fn stop_connectivity_watch(&self) {
        if let Some(task) = self.connectivity_watch.lock().take() {
            task.stop();
        }
    }

    /// Stop both background loops and wait for them to exit.
    ///
    /// A pass started by either loop runs to completion first.
    pub async fn shutdown(&self) {
        let tasks: Vec<ScheduledTask> = [
            self.auto_sync.lock().take(),
            self.connectivity_watch.lock().take(),
        ]
        .into_iter()
        .flatten()
        .collect();

        for task in tasks {
            task.stop_and_wait().await;
        }
        info!("Sync service stopped");
    }
}
