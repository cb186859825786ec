//! Queue item types.
//!
//! A [`QueueItem`] is one durable mutation awaiting (or done with) remote
//! application. The payload is opaque: the engine stores and forwards it but
//! never looks inside.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of mutation a queue item replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Stable storage and wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Parse a stored or user-supplied name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an item, derived from `synced_at` and `retry_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Unsynced and under the retry ceiling; selectable for a batch.
    Eligible,
    /// Unsynced with the retry budget exhausted; needs an explicit reset.
    Dormant,
    /// Applied by the remote authority.
    Synced,
}

impl ItemState {
    /// Parse a user-supplied filter name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "eligible" | "pending" => Some(Self::Eligible),
            "dormant" | "failed" => Some(Self::Dormant),
            "synced" => Some(Self::Synced),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Eligible => "eligible",
            Self::Dormant => "dormant",
            Self::Synced => "synced",
        };
        f.write_str(s)
    }
}

/// A mutation to be queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub operation: Operation,
    pub entity_type: String,
    pub record_id: String,
    pub payload: String,
    pub owner_id: String,
}

impl NewItem {
    #[must_use]
    pub fn new(
        operation: Operation,
        entity_type: impl Into<String>,
        record_id: impl Into<String>,
        payload: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            entity_type: entity_type.into(),
            record_id: record_id.into(),
            payload: payload.into(),
            owner_id: owner_id.into(),
        }
    }
}

/// A queued mutation with its retry metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: i64,
    pub operation: Operation,
    /// Domain entity tag (lead, payment, campaign, ...); opaque to the engine.
    pub entity_type: String,
    pub record_id: String,
    /// Serialized mutation data; never inspected by the engine.
    pub payload: String,
    pub owner_id: String,
    /// Transient failures so far. Conflicts do not count.
    pub retry_count: u32,
    /// Conflicts reported by the remote authority so far.
    pub conflict_count: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// `None` while pending.
    pub synced_at: Option<DateTime<Utc>>,
}

impl QueueItem {
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.synced_at.is_some()
    }

    /// Whether the next batch may pick this item up.
    #[must_use]
    pub const fn is_eligible(&self, max_retries: u32) -> bool {
        self.synced_at.is_none() && self.retry_count < max_retries
    }

    /// Whether the retry budget is exhausted.
    #[must_use]
    pub const fn is_dormant(&self, max_retries: u32) -> bool {
        self.synced_at.is_none() && self.retry_count >= max_retries
    }

    #[must_use]
    pub const fn state(&self, max_retries: u32) -> ItemState {
        if self.synced_at.is_some() {
            ItemState::Synced
        } else if self.retry_count >= max_retries {
            ItemState::Dormant
        } else {
            ItemState::Eligible
        }
    }

    /// `entity_type/record_id`, used in logs and error strings.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{}/{}", self.entity_type, self.record_id)
    }
}

/// Read filter for [`crate::sync::SyncQueue::list`].
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub state: Option<ItemState>,
    pub entity_type: Option<String>,
    pub owner_id: Option<String>,
    pub limit: Option<usize>,
}

impl ItemFilter {
    /// Match every item.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_state(state: ItemState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }
}
