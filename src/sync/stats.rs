//! Stats reporter.
//!
//! Pure projection over the current queue contents; it never writes.

use chrono::{DateTime, Local, NaiveDate, Utc};

use super::item::QueueItem;
use super::result::SyncStats;

/// Derive [`SyncStats`] from a snapshot of every queue item.
///
/// "Today" is the local calendar day of `now`.
#[must_use]
pub fn compute_stats(
    items: Vec<QueueItem>,
    max_retries: u32,
    is_online: bool,
    is_syncing: bool,
    now: DateTime<Utc>,
) -> SyncStats {
    let today = local_day(now);
    let on_today = |t: DateTime<Utc>| local_day(t) == today;

    let last_sync = items.iter().filter_map(|i| i.synced_at).max();
    let pending_count = items.iter().filter(|i| !i.is_synced()).count();
    let synced_today = items
        .iter()
        .filter_map(|i| i.synced_at)
        .filter(|t| on_today(*t))
        .count();
    let failed_today = items
        .iter()
        .filter(|i| i.is_dormant(max_retries) && on_today(i.created_at))
        .count();
    let conflicted_count = items
        .iter()
        .filter(|i| !i.is_synced() && i.conflict_count > 0)
        .count();

    SyncStats {
        is_online,
        is_syncing,
        last_sync,
        pending_count,
        synced_today,
        failed_today,
        conflicted_count,
        items,
    }
}

fn local_day(t: DateTime<Utc>) -> NaiveDate {
    t.with_timezone(&Local).date_naive()
}
