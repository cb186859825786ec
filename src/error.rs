//! Error types for leadsync.

use thiserror::Error;

/// Errors raised by the queue, the remote adapters and the CLI.
///
/// Per-item push failures never surface as `SyncError` from a pass; the
/// orchestrator folds them into queue state and [`crate::sync::SyncResult`].
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Remote authority rejected the session as unauthenticated")]
    Unauthenticated,

    #[error("Timed out: {0}")]
    Timeout(String),
}

impl SyncError {
    /// Whether retrying the same call later could plausibly succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::Timeout(_) | Self::Io(_))
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else {
            Self::Remote(e.to_string())
        }
    }
}
