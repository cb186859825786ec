//! End-to-end reconciliation scenarios through the public API.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use leadsync::config::SyncSettings;
use leadsync::remote::{
    ManualConnectivity, PullAdapter, PullBatch, PullOutcome, PushAdapter, PushOutcome,
};
use leadsync::storage::Database;
use leadsync::sync::{ItemFilter, NewItem, Operation, QueueItem, SyncQueue, SyncService};
use leadsync::SyncError;

#[derive(Default)]
struct FakeRemote {
    outcomes: Mutex<VecDeque<PushOutcome>>,
    pushed: Mutex<Vec<String>>,
    latency: Duration,
}

impl FakeRemote {
    fn scripted(outcomes: Vec<PushOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    fn pushed(&self) -> Vec<String> {
        self.pushed.lock().clone()
    }
}

#[async_trait]
impl PushAdapter for FakeRemote {
    async fn push_one(&self, item: &QueueItem) -> PushOutcome {
        self.pushed.lock().push(item.record_id.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.outcomes.lock().pop_front().unwrap_or(PushOutcome::Success)
    }
}

#[async_trait]
impl PullAdapter for FakeRemote {
    async fn pull_changes(&self, _cursor: Option<&str>) -> Result<PullOutcome, SyncError> {
        Ok(PullOutcome::Changes(PullBatch::default()))
    }
}

struct Fixture {
    service: Arc<SyncService>,
    remote: Arc<FakeRemote>,
    network: Arc<ManualConnectivity>,
}

impl Fixture {
    fn new(remote: FakeRemote) -> Self {
        let settings = SyncSettings {
            item_delay_ms: 0,
            trigger_on_enqueue: false,
            ..SyncSettings::default()
        };
        let remote = Arc::new(remote);
        let network = Arc::new(ManualConnectivity::new(true));
        let queue = SyncQueue::with_database(Arc::new(Database::open_in_memory().unwrap()));
        let service = Arc::new(SyncService::new(
            queue,
            remote.clone(),
            remote.clone(),
            network.clone(),
            settings,
        ));

        Self {
            service,
            remote,
            network,
        }
    }

    fn queue(&self) -> &SyncQueue {
        self.service.queue()
    }

    fn enqueue(&self, record_id: &str) -> QueueItem {
        self.queue()
            .enqueue(&NewItem::new(
                Operation::Update,
                "lead",
                record_id,
                r#"{"stage":"contacted"}"#,
                "u-1",
            ))
            .unwrap()
    }

    fn reload(&self, item: &QueueItem) -> QueueItem {
        self.queue().get(item.id).unwrap().unwrap()
    }
}

#[tokio::test]
async fn offline_pass_touches_nothing() {
    let fx = Fixture::new(FakeRemote::default());
    fx.network.set_online(false);
    let items: Vec<_> = ["L-1", "L-2", "L-3"].iter().map(|r| fx.enqueue(r)).collect();

    let result = fx.service.sync().await;
    assert!(!result.success);
    assert_eq!((result.synced, result.failed, result.conflicts), (0, 0, 0));
    assert_eq!(result.errors, vec!["Offline".to_string()]);
    for item in &items {
        assert_eq!(&fx.reload(item), item);
    }
    assert!(fx.remote.pushed().is_empty());
}

#[tokio::test]
async fn reconnect_pushes_and_flags_conflict() {
    let fx = Fixture::new(FakeRemote::scripted(vec![
        PushOutcome::Success,
        PushOutcome::Success,
        PushOutcome::Conflict("record changed remotely".to_string()),
    ]));
    fx.network.set_online(false);
    let items: Vec<_> = ["L-1", "L-2", "L-3"].iter().map(|r| fx.enqueue(r)).collect();
    assert!(!fx.service.sync().await.success);

    fx.network.set_online(true);
    let result = fx.service.sync().await;
    assert!(result.success);
    assert_eq!(result.synced, 2);
    assert_eq!(result.conflicts, 1);
    assert!(fx.reload(&items[0]).synced_at.is_some());
    assert!(fx.reload(&items[1]).synced_at.is_some());

    let conflicted = fx.reload(&items[2]);
    assert!(conflicted.synced_at.is_none());
    assert_eq!(conflicted.retry_count, 0);
}

#[tokio::test]
async fn conflicts_persist_across_passes() {
    let fx = Fixture::new(FakeRemote::scripted(vec![
        PushOutcome::Conflict("stale".to_string()),
        PushOutcome::Conflict("stale".to_string()),
        PushOutcome::Conflict("stale".to_string()),
        PushOutcome::Conflict("stale".to_string()),
    ]));
    let item = fx.enqueue("L-1");

    for _ in 0..4 {
        assert_eq!(fx.service.sync().await.conflicts, 1);
    }
    let item = fx.reload(&item);
    assert_eq!(item.retry_count, 0);
    assert_eq!(item.conflict_count, 4);
    assert!(item.synced_at.is_none());
}

#[tokio::test]
async fn last_retry_makes_item_dormant() {
    let fx = Fixture::new(FakeRemote::scripted(vec![PushOutcome::Failed(
        "HTTP 502".to_string(),
    )]));
    let item = fx.enqueue("L-1");
    fx.queue().mark_failed(item.id, "HTTP 500").unwrap();
    fx.queue().mark_failed(item.id, "HTTP 500").unwrap();

    let result = fx.service.sync().await;
    assert_eq!(result.failed, 1);
    let item = fx.reload(&item);
    assert_eq!(item.retry_count, 3);
    assert_eq!(item.last_error.as_deref(), Some("HTTP 502"));

    assert!(fx.queue().select_batch(50, 3).unwrap().is_empty());
    assert_eq!(fx.service.sync().await.attempted(), 0);

    let revived = fx.service.retry_failed().await;
    assert_eq!(revived.synced, 1);
    assert!(fx.reload(&item).synced_at.is_some());
}

#[tokio::test]
async fn overlapping_passes_are_single_flight() {
    let fx = Fixture::new(FakeRemote {
        latency: Duration::from_millis(50),
        ..FakeRemote::default()
    });
    fx.enqueue("L-1");
    fx.enqueue("L-2");

    let (first, second) = tokio::join!(fx.service.sync(), fx.service.sync());
    assert!(first.success);
    assert_eq!(first.synced, 2);
    assert!(!second.success);
    assert_eq!(second.errors, vec!["Sync in progress".to_string()]);
    assert_eq!(fx.remote.pushed(), vec!["L-1".to_string(), "L-2".to_string()]);
    assert!(!fx.service.is_syncing());
}

#[tokio::test]
async fn retention_keeps_recent_and_pending_items() {
    let fx = Fixture::new(FakeRemote::default());
    let old = fx.enqueue("L-1");
    let recent = fx.enqueue("L-2");
    let pending = fx.enqueue("L-3");
    fx.queue()
        .mark_synced_at(old.id, Utc::now() - chrono::Duration::days(10))
        .unwrap();
    fx.queue()
        .mark_synced_at(recent.id, Utc::now() - chrono::Duration::days(3))
        .unwrap();

    assert_eq!(fx.service.clear_synced_items(7).unwrap(), 1);
    assert!(fx.queue().get(old.id).unwrap().is_none());
    assert!(fx.queue().get(recent.id).unwrap().is_some());
    assert!(fx.queue().get(pending.id).unwrap().is_some());
}

#[tokio::test]
async fn second_pass_after_success_is_idle() {
    let fx = Fixture::new(FakeRemote::default());
    fx.enqueue("L-1");
    fx.enqueue("L-2");

    assert_eq!(fx.service.sync().await.synced, 2);
    let again = fx.service.sync().await;
    assert!(again.success);
    assert_eq!(again.attempted(), 0);
    assert_eq!(fx.remote.pushed().len(), 2);
}

#[tokio::test]
async fn failure_mid_batch_keeps_earlier_items_synced() {
    let fx = Fixture::new(FakeRemote::scripted(vec![
        PushOutcome::Success,
        PushOutcome::Success,
        PushOutcome::Failed("HTTP 503".to_string()),
        PushOutcome::Success,
    ]));
    let items: Vec<_> = ["L-1", "L-2", "L-3", "L-4"].iter().map(|r| fx.enqueue(r)).collect();

    let result = fx.service.sync().await;
    assert_eq!((result.synced, result.failed), (3, 1));
    assert_eq!(fx.remote.pushed(), vec!["L-1", "L-2", "L-3", "L-4"]);
    assert!(fx.reload(&items[0]).synced_at.is_some());
    assert!(fx.reload(&items[1]).synced_at.is_some());
    assert_eq!(fx.reload(&items[2]).retry_count, 1);
    assert!(fx.reload(&items[3]).synced_at.is_some());
}

#[tokio::test]
async fn pending_count_ignores_retry_count() {
    let fx = Fixture::new(FakeRemote::scripted(vec![PushOutcome::Failed(
        "down".to_string(),
    )]));
    let failing = fx.enqueue("L-1");
    fx.enqueue("L-2");
    for _ in 0..2 {
        fx.queue().mark_failed(failing.id, "down").unwrap();
    }
    fx.service.sync().await;

    let stats = fx.service.stats().await.unwrap();
    let unsynced = fx
        .queue()
        .list(&ItemFilter::all(), 3)
        .unwrap()
        .iter()
        .filter(|i| i.synced_at.is_none())
        .count();
    assert_eq!(stats.pending_count, unsynced);
    assert_eq!(stats.pending_count, 1);
    assert_eq!(stats.failed_today, 1);
    assert_eq!(stats.synced_today, 1);
}
