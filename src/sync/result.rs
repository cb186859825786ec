//! Outcomes of reconciliation passes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::item::QueueItem;

/// Returned when a pass starts while another is running.
pub const SYNC_IN_PROGRESS: &str = "Sync in progress";
/// Returned when the connectivity probe reports offline.
pub const OFFLINE: &str = "Offline";

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// `false` only when the pass could not run at all.
    pub success: bool,
    pub synced: usize,
    pub failed: usize,
    pub conflicts: usize,
    /// Remote changes retrieved by the closing pull.
    pub pulled: usize,
    pub errors: Vec<String>,
}

impl SyncResult {
    /// A pass that is allowed to run; counts start at zero.
    #[must_use]
    pub const fn started() -> Self {
        Self {
            success: true,
            synced: 0,
            failed: 0,
            conflicts: 0,
            pulled: 0,
            errors: Vec::new(),
        }
    }

    /// A pass that could not run; no item was touched.
    #[must_use]
    pub fn aborted(reason: &str) -> Self {
        Self {
            success: false,
            errors: vec![reason.to_string()],
            ..Self::default()
        }
    }

    /// Items attempted during the pass.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.synced + self.failed + self.conflicts
    }
}

/// Read-side projection of the queue for dashboards and diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub is_online: bool,
    pub is_syncing: bool,
    /// Latest `synced_at` across all items.
    pub last_sync: Option<DateTime<Utc>>,
    /// Items with no `synced_at`, dormant ones included.
    pub pending_count: usize,
    pub synced_today: usize,
    /// Dormant items created today.
    pub failed_today: usize,
    /// Unsynced items that hit at least one conflict.
    pub conflicted_count: usize,
    pub items: Vec<QueueItem>,
}
