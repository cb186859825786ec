//! Pull adapter and change sink.
//!
//! The engine fetches remote-authoritative changes but does not merge them;
//! merging belongs to the data layer behind [`ChangeSink`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::SyncError;

/// Changes returned by one pull.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PullBatch {
    /// Opaque change records; only the data layer interprets them.
    pub changes: Vec<Value>,
    /// Position to resume from next time, if the authority issues one.
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    Changes(PullBatch),
    /// The session is not authenticated; nothing was fetched.
    Unauthenticated,
}

#[async_trait]
pub trait PullAdapter: Send + Sync {
    /// Fetch changes since `cursor` (everything when `None`).
    async fn pull_changes(&self, cursor: Option<&str>) -> Result<PullOutcome, SyncError>;
}

/// Receiver for pulled changes, owned by the external data layer.
#[async_trait]
pub trait ChangeSink: Send + Sync {
    async fn apply(&self, changes: &[Value]) -> Result<(), SyncError>;
}

/// Sink that only records how many changes arrived.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl ChangeSink for LogSink {
    async fn apply(&self, changes: &[Value]) -> Result<(), SyncError> {
        info!(count = changes.len(), "Pulled remote changes");
        Ok(())
    }
}

/// Interpret a pull response.
///
/// # Errors
///
/// Returns `SyncError::Remote` for non-success statuses and `SyncError::Parse`
/// for malformed bodies.
pub fn parse_pull_response(status: u16, body: &str) -> Result<PullOutcome, SyncError> {
    if status == 401 {
        return Ok(PullOutcome::Unauthenticated);
    }
    if !(200..300).contains(&status) {
        return Err(SyncError::Remote(format!("Pull failed with HTTP {status}")));
    }
    if body.trim().is_empty() {
        return Ok(PullOutcome::Changes(PullBatch::default()));
    }

    Ok(PullOutcome::Changes(serde_json::from_str(body)?))
}
