//! Path resolution for leadsync configuration and data files.
//!
//! All leadsync data is stored in `~/.leadsync/`:
//! - `config.yaml` - Main configuration file
//! - `leadsync.db` - SQLite database holding the mutation queue and pull cursor

use std::path::PathBuf;

use crate::error::SyncError;

/// Paths to leadsync configuration and data files.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.leadsync/`
    pub root: PathBuf,
    /// Config file: `~/.leadsync/config.yaml`
    pub config_file: PathBuf,
    /// Database file: `~/.leadsync/leadsync.db`
    pub database: PathBuf,
}

impl Paths {
    /// Create paths based on the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, SyncError> {
        let home = std::env::var("HOME")
            .map_err(|_| SyncError::Config("Could not determine home directory".to_string()))?;

        Ok(Self::with_root(PathBuf::from(home).join(".leadsync")))
    }

    /// Create paths with a custom root directory (useful for testing).
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("leadsync.db"),
            root,
        }
    }

    /// Ensure the data directory exists, creating it if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<(), SyncError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| {
                SyncError::Config(format!(
                    "Failed to create directory {}: {e}",
                    self.root.display()
                ))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_with_root() {
        let root = PathBuf::from("/tmp/test-leadsync");
        let paths = Paths::with_root(root.clone());

        assert_eq!(paths.root, root);
        assert_eq!(paths.config_file, root.join("config.yaml"));
        assert_eq!(paths.database, root.join("leadsync.db"));
    }

    #[test]
    fn test_ensure_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let paths = Paths::with_root(temp_dir.path().join("nested").join(".leadsync"));

        paths.ensure_dirs().unwrap();
        assert!(paths.root.exists());

        // Second call is a no-op
        paths.ensure_dirs().unwrap();
    }
}
