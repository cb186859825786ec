//! Scripted adapters for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::config::SyncSettings;
use crate::error::SyncError;
use crate::remote::{
    ChangeSink, ConnectivityProbe, ManualConnectivity, PullAdapter, PullBatch, PullOutcome,
    PushAdapter, PushOutcome,
};
use crate::storage::Database;
use crate::sync::{QueueItem, SyncQueue, SyncService};

/// Replays queued outcomes in order, then succeeds.
#[derive(Default)]
pub struct ScriptedPush {
    outcomes: Mutex<VecDeque<PushOutcome>>,
    pushed: Mutex<Vec<i64>>,
    delay: Duration,
}

impl ScriptedPush {
    pub fn new(outcomes: Vec<PushOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn pushed(&self) -> Vec<i64> {
        self.pushed.lock().clone()
    }
}

#[async_trait]
impl PushAdapter for ScriptedPush {
    async fn push_one(&self, item: &QueueItem) -> PushOutcome {
        self.pushed.lock().push(item.id);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcomes.lock().pop_front().unwrap_or(PushOutcome::Success)
    }
}

/// Returns queued pull outcomes, then empty batches.
#[derive(Default)]
pub struct ScriptedPull {
    outcomes: Mutex<VecDeque<Result<PullOutcome, SyncError>>>,
    cursors_seen: Mutex<Vec<Option<String>>>,
}

impl ScriptedPull {
    pub fn new(outcomes: Vec<Result<PullOutcome, SyncError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    pub fn cursors_seen(&self) -> Vec<Option<String>> {
        self.cursors_seen.lock().clone()
    }
}

#[async_trait]
impl PullAdapter for ScriptedPull {
    async fn pull_changes(&self, cursor: Option<&str>) -> Result<PullOutcome, SyncError> {
        self.cursors_seen.lock().push(cursor.map(String::from));
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(PullOutcome::Changes(PullBatch::default())))
    }
}

/// Collects applied changes; optionally fails.
#[derive(Default)]
pub struct RecordingSink {
    pub applied: Mutex<Vec<Value>>,
    pub fail: bool,
}

#[async_trait]
impl ChangeSink for RecordingSink {
    async fn apply(&self, changes: &[Value]) -> Result<(), SyncError> {
        if self.fail {
            return Err(SyncError::Database("local store is read-only".to_string()));
        }
        self.applied.lock().extend_from_slice(changes);
        Ok(())
    }
}

/// Settings with no inter-item delay and no enqueue trigger.
pub fn quiet_settings() -> SyncSettings {
    SyncSettings {
        item_delay_ms: 0,
        trigger_on_enqueue: false,
        ..SyncSettings::default()
    }
}

pub fn memory_queue() -> SyncQueue {
    SyncQueue::with_database(Arc::new(Database::open_in_memory().unwrap()))
}

pub struct Harness {
    pub service: Arc<SyncService>,
    pub push: Arc<ScriptedPush>,
    pub pull: Arc<ScriptedPull>,
    pub connectivity: Arc<ManualConnectivity>,
}

pub fn harness(push: ScriptedPush, settings: SyncSettings) -> Harness {
    let push = Arc::new(push);
    let pull = Arc::new(ScriptedPull::default());
    let connectivity = Arc::new(ManualConnectivity::new(true));
    let service = Arc::new(SyncService::new(
        memory_queue(),
        push.clone(),
        pull.clone(),
        connectivity.clone() as Arc<dyn ConnectivityProbe>,
        settings,
    ));

    Harness {
        service,
        push,
        pull,
        connectivity,
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
