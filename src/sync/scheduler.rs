//! Background loops: the periodic auto-sync timer and the connectivity watcher.
//!
//! Both loops hold only a `Weak` reference to the service so that dropping
//! the last strong handle ends them.

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::service::SyncService;
use crate::error::SyncError;

/// A running background loop and the means to stop it.
pub struct ScheduledTask {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ScheduledTask {
    /// Signal the loop to exit after its current iteration.
    pub fn stop(mut self) {
        self.signal();
    }

    /// Signal the loop and wait until it has exited.
    pub async fn stop_and_wait(mut self) {
        self.signal();
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Background sync task ended abnormally");
        }
    }

    fn signal(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn runtime_for(period: Duration, what: &str) -> Result<Handle, SyncError> {
    if period.is_zero() {
        return Err(SyncError::Config(format!("{what} interval must be positive")));
    }
    Handle::try_current().map_err(|_| SyncError::Config(format!("{what} requires an async runtime")))
}

/// Interval whose first tick is one full period away.
async fn ticker(period: Duration) -> Interval {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;
    interval
}

/// Run a pass every `period` while the service is online and idle.
pub(crate) fn spawn_auto_sync(
    service: Weak<SyncService>,
    period: Duration,
) -> Result<ScheduledTask, SyncError> {
    let runtime = runtime_for(period, "Auto-sync")?;
    let (tx, mut rx) = oneshot::channel::<()>();

    let task = runtime.spawn(async move {
        let mut interval = ticker(period).await;
        loop {
            tokio::select! {
                _ = &mut rx => break,
                _ = interval.tick() => {
                    let Some(service) = service.upgrade() else { break };
                    if service.is_syncing() {
                        debug!("Auto-sync tick skipped: pass already running");
                        continue;
                    }

                    let result = service.sync().await;
                    if result.success {
                        debug!(synced = result.synced, failed = result.failed, "Auto-sync pass finished");
                    } else {
                        debug!(reason = ?result.errors.first(), "Auto-sync pass did not run");
                    }
                }
            }
        }
    });

    Ok(ScheduledTask {
        shutdown: Some(tx),
        task,
    })
}

/// Probe every `period` and start a pass when offline turns to online.
pub(crate) fn spawn_connectivity_watch(
    service: Weak<SyncService>,
    period: Duration,
) -> Result<ScheduledTask, SyncError> {
    let runtime = runtime_for(period, "Connectivity watch")?;
    let (tx, mut rx) = oneshot::channel::<()>();

    let task = runtime.spawn(async move {
        let mut interval = ticker(period).await;
        let mut last_online: Option<bool> = None;
        loop {
            tokio::select! {
                _ = &mut rx => break,
                _ = interval.tick() => {
                    let Some(service) = service.upgrade() else { break };
                    let online = service.connectivity().probe().await;
                    if last_online == Some(false) && online {
                        info!("Network reachable again");
                        service.notify_connectivity_restored();
                    }
                    last_online = Some(online);
                }
            }
        }
    });

    Ok(ScheduledTask {
        shutdown: Some(tx),
        task,
    })
}
