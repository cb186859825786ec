//! Database migrations for leadsync.
//!
//! Each migration is a function that upgrades the schema by one version.
//! Migrations are run automatically when the database is opened.

use rusqlite::Connection;

use crate::error::SyncError;

/// Current schema version.
const CURRENT_VERSION: i32 = 1;

/// Get the current schema version from the database.
///
/// Returns 0 if no version has been set (new database).
pub fn get_version(conn: &Connection) -> Result<i32, SyncError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| SyncError::Database(format!("Failed to get schema version: {e}")))
}

fn set_version(conn: &Connection, version: i32) -> Result<(), SyncError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| SyncError::Database(format!("Failed to set schema version: {e}")))
}

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<(), SyncError> {
    let current = get_version(conn)?;

    if current >= CURRENT_VERSION {
        return Ok(());
    }

    for version in (current + 1)..=CURRENT_VERSION {
        run_migration(conn, version)?;
        set_version(conn, version)?;
    }

    Ok(())
}

fn run_migration(conn: &Connection, version: i32) -> Result<(), SyncError> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(SyncError::Database(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: Initial schema.
///
/// Creates tables for:
/// - `sync_queue`: Pending and resolved mutations
/// - `sync_state`: Key/value bookkeeping (pull cursor)
fn migrate_v1(conn: &Connection) -> Result<(), SyncError> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS sync_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            operation TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            record_id TEXT NOT NULL,
            payload TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            retry_count INTEGER NOT NULL DEFAULT 0,
            conflict_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            created_at TEXT NOT NULL,
            synced_at TEXT
        );

        -- Batch selection: unsynced items in FIFO order
        CREATE INDEX IF NOT EXISTS idx_sync_queue_pending
        ON sync_queue(synced_at, retry_count, created_at);

        CREATE INDEX IF NOT EXISTS idx_sync_queue_record
        ON sync_queue(entity_type, record_id);

        CREATE TABLE IF NOT EXISTS sync_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| SyncError::Database(format!("Migration v1 failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_v1() {
        let conn = Connection::open_in_memory().unwrap();

        run(&conn).unwrap();
        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);

        conn.execute(
            "INSERT INTO sync_queue (operation, entity_type, record_id, payload, owner_id, created_at)
             VALUES ('create', 'lead', 'L-1', '{}', 'u-1', '2024-01-01T10:00:00.000000Z')",
            [],
        )
        .unwrap();

        let retry_count: i64 = conn
            .query_row("SELECT retry_count FROM sync_queue", [], |row| row.get(0))
            .unwrap();
        assert_eq!(retry_count, 0);
    }

    #[test]
    fn test_migration_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run(&conn).unwrap();
        run(&conn).unwrap();

        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_get_version_new_database() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_version(&conn).unwrap(), 0);
    }
}
