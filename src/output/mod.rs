//! Output formatting for leadsync.
//!
//! Every command renders either a colored, human-readable report or pretty
//! printed JSON, chosen by `--output`.

mod json;
mod pretty;

use crate::cli::args::OutputFormat;
use crate::error::SyncError;
use crate::sync::{QueueCounts, QueueItem, SyncResult, SyncStats};

pub use json::*;
pub use pretty::*;

/// Format the outcome of a sync pass.
///
/// # Errors
///
/// Returns `SyncError::Parse` if JSON serialization fails.
pub fn format_result(result: &SyncResult, format: OutputFormat) -> Result<String, SyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_result_pretty(result)),
        OutputFormat::Json => to_json(result),
    }
}

/// Format queue totals and the stats snapshot.
///
/// # Errors
///
/// Returns `SyncError::Parse` if JSON serialization fails.
pub fn format_status(
    counts: &QueueCounts,
    stats: &SyncStats,
    format: OutputFormat,
) -> Result<String, SyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_status_pretty(counts, stats)),
        OutputFormat::Json => format_status_json(counts, stats),
    }
}

/// Format a list of queue items.
///
/// # Errors
///
/// Returns `SyncError::Parse` if JSON serialization fails.
pub fn format_items(
    items: &[QueueItem],
    max_retries: u32,
    format: OutputFormat,
) -> Result<String, SyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_items_pretty(items, max_retries)),
        OutputFormat::Json => format_items_json(items),
    }
}

/// Format a single queue item.
///
/// # Errors
///
/// Returns `SyncError::Parse` if JSON serialization fails.
pub fn format_item(item: &QueueItem, format: OutputFormat) -> Result<String, SyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_item_pretty(item)),
        OutputFormat::Json => to_json(item),
    }
}
