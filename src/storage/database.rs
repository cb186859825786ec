//! `SQLite` database connection and operations.
//!
//! The database is stored at `~/.leadsync/leadsync.db` and contains tables for:
//! - The mutation queue (`sync_queue`)
//! - Engine bookkeeping such as the pull cursor (`sync_state`)

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OptionalExtension};

use crate::config::Paths;
use crate::error::SyncError;

use super::migrations;

/// Database connection wrapper.
///
/// The connection sits behind a mutex so producers and the orchestrator can
/// share one handle across tasks; every statement holds the lock only for
/// its own duration.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at the default location.
    ///
    /// Creates the database file and runs migrations if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open() -> Result<Self, SyncError> {
        let paths = Paths::new()?;
        paths.ensure_dirs()?;
        Self::open_at(&paths.database)
    }

    /// Open the database at a specific path.
    ///
    /// Creates the database file and runs migrations if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_at(path: &std::path::Path) -> Result<Self, SyncError> {
        let conn = Connection::open(path).map_err(|e| {
            SyncError::Database(format!("Failed to open database {}: {e}", path.display()))
        })?;

        // WAL keeps readers (stats) from blocking the orchestrator's writes
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
            .map_err(|e| SyncError::Database(format!("Failed to configure journal: {e}")))?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_in_memory() -> Result<Self, SyncError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            SyncError::Database(format!("Failed to open in-memory database: {e}"))
        })?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, SyncError> {
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get the current schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, SyncError> {
        migrations::get_version(&self.connection())
    }

    /// Lock and return the underlying connection.
    ///
    /// Keep the guard short-lived; never hold it across an `.await`.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Read a value from the `sync_state` table.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_state(&self, key: &str) -> Result<Option<String>, SyncError> {
        self.connection()
            .query_row(
                "SELECT value FROM sync_state WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| SyncError::Database(format!("Failed to read state {key}: {e}")))
    }

    /// Write a value to the `sync_state` table, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn set_state(&self, key: &str, value: &str) -> Result<(), SyncError> {
        self.connection()
            .execute(
                r"INSERT INTO sync_state (key, value) VALUES (?1, ?2)
                  ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                [key, value],
            )
            .map_err(|e| SyncError::Database(format!("Failed to write state {key}: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.schema_version().unwrap() > 0);
    }

    #[test]
    fn test_open_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Database::open_at(&db_path).unwrap();
        assert!(db.schema_version().unwrap() > 0);
        assert!(db_path.exists());
    }

    #[test]
    fn test_state_survives_reopen() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        {
            let db = Database::open_at(&db_path).unwrap();
            assert_eq!(db.get_state("pull_cursor").unwrap(), None);
            db.set_state("pull_cursor", "c-1").unwrap();
            db.set_state("pull_cursor", "c-2").unwrap();
        }

        let db = Database::open_at(&db_path).unwrap();
        assert_eq!(db.get_state("pull_cursor").unwrap().as_deref(), Some("c-2"));
    }
}
