//! Durable mutation queue.
//!
//! Persistence and querying of queued mutations. Every state transition is a
//! single SQL statement, so an increment or a `synced_at` stamp is atomic at
//! the storage layer.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row, ToSql};
use serde::Serialize;

use super::item::{ItemFilter, ItemState, NewItem, Operation, QueueItem};
use crate::error::SyncError;
use crate::storage::Database;

const PULL_CURSOR_KEY: &str = "pull_cursor";

const ITEM_COLUMNS: &str = "id, operation, entity_type, record_id, payload, owner_id, \
     retry_count, conflict_count, last_error, created_at, synced_at";

/// Queue of mutations awaiting the remote authority.
#[derive(Clone)]
pub struct SyncQueue {
    db: Arc<Database>,
}

impl SyncQueue {
    /// Open the queue stored at the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn new() -> Result<Self, SyncError> {
        Ok(Self::with_database(Arc::new(Database::open()?)))
    }

    /// Create a sync queue with an existing database connection.
    #[must_use]
    pub const fn with_database(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Persist a new pending mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be saved.
    pub fn enqueue(&self, item: &NewItem) -> Result<QueueItem, SyncError> {
        let created_at = Utc::now();
        let conn = self.db.connection();

        conn.execute(
            r"INSERT INTO sync_queue
              (operation, entity_type, record_id, payload, owner_id, created_at)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.operation.as_str(),
                item.entity_type,
                item.record_id,
                item.payload,
                item.owner_id,
                timestamp(created_at),
            ],
        )
        .map_err(|e| SyncError::Database(format!("Failed to enqueue item: {e}")))?;

        Ok(QueueItem {
            id: conn.last_insert_rowid(),
            operation: item.operation,
            entity_type: item.entity_type.clone(),
            record_id: item.record_id.clone(),
            payload: item.payload.clone(),
            owner_id: item.owner_id.clone(),
            retry_count: 0,
            conflict_count: 0,
            last_error: None,
            created_at,
            synced_at: None,
        })
    }

    /// Eligible items in FIFO order, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn select_batch(&self, limit: usize, max_retries: u32) -> Result<Vec<QueueItem>, SyncError> {
        let conn = self.db.connection();

        let mut stmt = conn
            .prepare(&format!(
                r"SELECT {ITEM_COLUMNS}
                  FROM sync_queue
                  WHERE synced_at IS NULL AND retry_count < ?1
                  ORDER BY created_at ASC, id ASC
                  LIMIT ?2"
            ))
            .map_err(|e| SyncError::Database(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![max_retries, to_sql_limit(limit)], row_to_item)
            .map_err(|e| SyncError::Database(format!("Failed to select batch: {e}")))?;

        collect_items(rows)
    }

    /// Get a specific item by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get(&self, id: i64) -> Result<Option<QueueItem>, SyncError> {
        self.db
            .connection()
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM sync_queue WHERE id = ?1"),
                [id],
                row_to_item,
            )
            .optional()
            .map_err(|e| SyncError::Database(format!("Failed to query item: {e}")))
    }

    /// Items matching `filter`, oldest first.
    ///
    /// `max_retries` is needed to tell eligible items from dormant ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list(&self, filter: &ItemFilter, max_retries: u32) -> Result<Vec<QueueItem>, SyncError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        match filter.state {
            Some(ItemState::Eligible) => {
                clauses.push("synced_at IS NULL AND retry_count < ?");
                values.push(Box::new(max_retries));
            }
            Some(ItemState::Dormant) => {
                clauses.push("synced_at IS NULL AND retry_count >= ?");
                values.push(Box::new(max_retries));
            }
            Some(ItemState::Synced) => clauses.push("synced_at IS NOT NULL"),
            None => {}
        }
        if let Some(entity_type) = &filter.entity_type {
            clauses.push("entity_type = ?");
            values.push(Box::new(entity_type.clone()));
        }
        if let Some(owner_id) = &filter.owner_id {
            clauses.push("owner_id = ?");
            values.push(Box::new(owner_id.clone()));
        }

        let mut sql = format!("SELECT {ITEM_COLUMNS} FROM sync_queue");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC LIMIT ?");
        values.push(Box::new(filter.limit.map_or(-1, to_sql_limit)));

        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| SyncError::Database(format!("Failed to prepare query: {e}")))?;

        let refs: Vec<&dyn ToSql> = values.iter().map(|v| &**v as &dyn ToSql).collect();
        let rows = stmt
            .query_map(refs.as_slice(), row_to_item)
            .map_err(|e| SyncError::Database(format!("Failed to list items: {e}")))?;

        collect_items(rows)
    }

    /// Stamp an item as applied remotely.
    ///
    /// Returns `false` if the item does not exist or was already synced;
    /// `synced_at` is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn mark_synced(&self, id: i64) -> Result<bool, SyncError> {
        self.mark_synced_at(id, Utc::now())
    }

    /// [`Self::mark_synced`] with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn mark_synced_at(&self, id: i64, synced_at: DateTime<Utc>) -> Result<bool, SyncError> {
        let rows = self
            .db
            .connection()
            .execute(
                r"UPDATE sync_queue SET synced_at = ?1, last_error = NULL
                  WHERE id = ?2 AND synced_at IS NULL",
                params![timestamp(synced_at), id],
            )
            .map_err(|e| SyncError::Database(format!("Failed to mark item synced: {e}")))?;

        Ok(rows > 0)
    }

    /// Record a transient failure: bump `retry_count` and keep the message.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn mark_failed(&self, id: i64, error: &str) -> Result<bool, SyncError> {
        let rows = self
            .db
            .connection()
            .execute(
                r"UPDATE sync_queue SET
                  retry_count = retry_count + 1,
                  last_error = ?1
                  WHERE id = ?2 AND synced_at IS NULL",
                params![error, id],
            )
            .map_err(|e| SyncError::Database(format!("Failed to mark item failed: {e}")))?;

        Ok(rows > 0)
    }

    /// Record a conflict. `retry_count` is left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn mark_conflict(&self, id: i64, message: &str) -> Result<bool, SyncError> {
        let rows = self
            .db
            .connection()
            .execute(
                r"UPDATE sync_queue SET
                  conflict_count = conflict_count + 1,
                  last_error = ?1
                  WHERE id = ?2 AND synced_at IS NULL",
                params![message, id],
            )
            .map_err(|e| SyncError::Database(format!("Failed to mark item conflicted: {e}")))?;

        Ok(rows > 0)
    }

    /// Reset retry metadata on every dormant item.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn reset_dormant(&self, max_retries: u32) -> Result<usize, SyncError> {
        self.db
            .connection()
            .execute(
                r"UPDATE sync_queue SET retry_count = 0, last_error = NULL
                  WHERE synced_at IS NULL AND retry_count >= ?1",
                [max_retries],
            )
            .map_err(|e| SyncError::Database(format!("Failed to reset dormant items: {e}")))
    }

    /// Reset retry metadata on one unsynced item.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn reset_item(&self, id: i64) -> Result<bool, SyncError> {
        let rows = self
            .db
            .connection()
            .execute(
                r"UPDATE sync_queue SET retry_count = 0, last_error = NULL
                  WHERE id = ?1 AND synced_at IS NULL",
                [id],
            )
            .map_err(|e| SyncError::Database(format!("Failed to reset item: {e}")))?;

        Ok(rows > 0)
    }

    /// Delete one unsynced item, abandoning its mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn discard(&self, id: i64) -> Result<bool, SyncError> {
        let rows = self
            .db
            .connection()
            .execute(
                "DELETE FROM sync_queue WHERE id = ?1 AND synced_at IS NULL",
                [id],
            )
            .map_err(|e| SyncError::Database(format!("Failed to discard item: {e}")))?;

        Ok(rows > 0)
    }

    /// Delete synced items whose `synced_at` is older than `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear_synced_before(&self, cutoff: DateTime<Utc>) -> Result<usize, SyncError> {
        self.db
            .connection()
            .execute(
                "DELETE FROM sync_queue WHERE synced_at IS NOT NULL AND synced_at < ?1",
                [timestamp(cutoff)],
            )
            .map_err(|e| SyncError::Database(format!("Failed to clear synced items: {e}")))
    }

    /// Totals per lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn counts(&self, max_retries: u32) -> Result<QueueCounts, SyncError> {
        self.db
            .connection()
            .query_row(
                r"SELECT
                    COALESCE(SUM(synced_at IS NULL), 0),
                    COALESCE(SUM(synced_at IS NULL AND retry_count >= ?1), 0),
                    COALESCE(SUM(synced_at IS NOT NULL), 0)
                  FROM sync_queue",
                [max_retries],
                |row| {
                    Ok(QueueCounts {
                        pending: row.get(0)?,
                        dormant: row.get(1)?,
                        synced: row.get(2)?,
                    })
                },
            )
            .map_err(|e| SyncError::Database(format!("Failed to count items: {e}")))
    }

    /// Cursor returned by the last successful pull.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn pull_cursor(&self) -> Result<Option<String>, SyncError> {
        self.db.get_state(PULL_CURSOR_KEY)
    }

    /// Remember the cursor of a successful pull.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn set_pull_cursor(&self, cursor: &str) -> Result<(), SyncError> {
        self.db.set_state(PULL_CURSOR_KEY, cursor)
    }
}

/// Queue totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    /// Unsynced items, dormant ones included.
    pub pending: i64,
    /// Unsynced items that exhausted their retries.
    pub dormant: i64,
    pub synced: i64,
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn parse_timestamp(idx: usize, s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_item(row: &Row<'_>) -> Result<QueueItem, rusqlite::Error> {
    let operation: String = row.get(1)?;
    let created_at: String = row.get(9)?;
    let synced_at: Option<String> = row.get(10)?;

    Ok(QueueItem {
        id: row.get(0)?,
        operation: Operation::parse(&operation).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Text,
                format!("unknown operation {operation:?}").into(),
            )
        })?,
        entity_type: row.get(2)?,
        record_id: row.get(3)?,
        payload: row.get(4)?,
        owner_id: row.get(5)?,
        retry_count: row.get(6)?,
        conflict_count: row.get(7)?,
        last_error: row.get(8)?,
        created_at: parse_timestamp(9, &created_at)?,
        synced_at: synced_at
            .as_deref()
            .map(|s| parse_timestamp(10, s))
            .transpose()?,
    })
}

fn collect_items<F>(rows: rusqlite::MappedRows<'_, F>) -> Result<Vec<QueueItem>, SyncError>
where
    F: FnMut(&Row<'_>) -> Result<QueueItem, rusqlite::Error>,
{
    rows.map(|row| row.map_err(|e| SyncError::Database(e.to_string())))
        .collect()
}
