//! JSON output formatting.

use serde::Serialize;
use serde_json::json;

use crate::error::SyncError;
use crate::sync::{QueueCounts, QueueItem, SyncStats};

/// Format queue items as JSON
///
/// # Errors
///
/// Returns `SyncError::Parse` if JSON serialization fails.
pub fn format_items_json(items: &[QueueItem]) -> Result<String, SyncError> {
    let output = json!({
        "count": items.len(),
        "items": items
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format the status report as JSON
///
/// The full item list is left out; `list` serves that.
///
/// # Errors
///
/// Returns `SyncError::Parse` if JSON serialization fails.
pub fn format_status_json(counts: &QueueCounts, stats: &SyncStats) -> Result<String, SyncError> {
    let output = json!({
        "isOnline": stats.is_online,
        "isSyncing": stats.is_syncing,
        "lastSync": stats.last_sync,
        "pendingCount": stats.pending_count,
        "syncedToday": stats.synced_today,
        "failedToday": stats.failed_today,
        "conflictedCount": stats.conflicted_count,
        "queue": counts,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Generic JSON formatter for any serializable type
///
/// # Errors
///
/// Returns `SyncError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, SyncError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::Value;

    use super::*;
    use crate::sync::{compute_stats, Operation};

    fn make_item(id: i64) -> QueueItem {
        QueueItem {
            id,
            operation: Operation::Create,
            entity_type: "campaign".to_string(),
            record_id: format!("C-{id}"),
            payload: "{}".to_string(),
            owner_id: "u-1".to_string(),
            retry_count: 0,
            conflict_count: 0,
            last_error: None,
            created_at: Utc::now(),
            synced_at: None,
        }
    }

    #[test]
    fn test_format_items_json_counts() {
        let output = format_items_json(&[make_item(1), make_item(2)]).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["count"], 2);
        assert_eq!(parsed["items"][1]["recordId"], "C-2");
    }

    #[test]
    fn test_format_items_json_empty() {
        let parsed: Value = serde_json::from_str(&format_items_json(&[]).unwrap()).unwrap();
        assert_eq!(parsed["count"], 0);
        assert!(parsed["items"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_format_status_json_fields() {
        let counts = QueueCounts {
            pending: 1,
            dormant: 0,
            synced: 0,
        };
        let stats = compute_stats(vec![make_item(1)], 3, false, false, Utc::now());

        let parsed: Value =
            serde_json::from_str(&format_status_json(&counts, &stats).unwrap()).unwrap();
        assert_eq!(parsed["isOnline"], false);
        assert_eq!(parsed["pendingCount"], 1);
        assert_eq!(parsed["lastSync"], Value::Null);
        assert_eq!(parsed["queue"]["pending"], 1);
        assert!(parsed.get("items").is_none());
    }
}
