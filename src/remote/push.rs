//! Push adapter.
//!
//! Submits one queued mutation and classifies the answer. No retry logic
//! lives here; the orchestrator owns retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::sync::{Operation, QueueItem};

/// Classified answer of the remote authority to one push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The mutation was applied.
    Success,
    /// The mutation was rejected against incompatible remote state.
    Conflict(String),
    /// Anything else; worth retrying on a later pass.
    Failed(String),
}

#[async_trait]
pub trait PushAdapter: Send + Sync {
    async fn push_one(&self, item: &QueueItem) -> PushOutcome;
}

/// Body of an "apply mutation" request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest<'a> {
    pub operation: Operation,
    pub entity_type: &'a str,
    pub record_id: &'a str,
    pub payload: &'a str,
    pub owner_id: &'a str,
}

impl<'a> From<&'a QueueItem> for PushRequest<'a> {
    fn from(item: &'a QueueItem) -> Self {
        Self {
            operation: item.operation,
            entity_type: &item.entity_type,
            record_id: &item.record_id,
            payload: &item.payload,
            owner_id: &item.owner_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PushResponseBody {
    success: Option<bool>,
    conflict: Option<bool>,
    error: Option<String>,
    message: Option<String>,
}

impl PushResponseBody {
    fn reason(self) -> Option<String> {
        self.error.or(self.message)
    }
}

/// Map an HTTP status and body onto exactly one [`PushOutcome`].
///
/// An explicit `"conflict": true` marker (or 409) is a conflict; a 2xx that
/// does not say `"success": false` is a success; everything else failed.
#[must_use]
pub fn classify_push_response(status: u16, body: &str) -> PushOutcome {
    let parsed: PushResponseBody = serde_json::from_str(body).unwrap_or_default();

    if parsed.conflict == Some(true) || status == 409 {
        let reason = parsed.reason().unwrap_or_else(|| "Conflict".to_string());
        return PushOutcome::Conflict(reason);
    }

    if (200..300).contains(&status) && parsed.success != Some(false) {
        return PushOutcome::Success;
    }

    let reason = parsed.reason().unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {}", truncate(trimmed, 200))
        }
    });
    PushOutcome::Failed(reason)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
