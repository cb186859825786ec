//! Offline-first sync engine.
//!
//! Mutations are persisted to a durable [`SyncQueue`] before anything touches
//! the network. [`SyncService`] drains the queue toward the remote authority
//! in FIFO order, classifies each outcome, and pulls remote changes back.
//!
//! ## Item lifecycle
//!
//! - **eligible**: unsynced, `retry_count < max_retries`
//! - **dormant**: unsynced, retry budget exhausted; only a reset revives it
//! - **synced**: `synced_at` is set; terminal until retention cleanup
//!
//! Conflicts leave an item eligible and bump `conflict_count` instead of
//! `retry_count`.

mod item;
mod queue;
mod result;
mod scheduler;
mod service;
mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use item::{ItemFilter, ItemState, NewItem, Operation, QueueItem};
pub use queue::{QueueCounts, SyncQueue};
pub use result::{SyncResult, SyncStats, OFFLINE, SYNC_IN_PROGRESS};
pub use scheduler::ScheduledTask;
pub use service::SyncService;
pub use stats::compute_stats;
