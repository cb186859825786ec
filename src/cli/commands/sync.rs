//! Sync queue command implementation.
//!
//! Handles operator commands against the queue and the orchestrator.

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use serde_json::json;
use tracing::info;

use crate::cli::args::OutputFormat;
use crate::error::SyncError;
use crate::output::{format_item, format_items, format_result, format_status, to_json};
use crate::sync::{ItemFilter, ItemState, NewItem, Operation, SyncService};

/// Show queue totals and today's activity.
///
/// # Errors
///
/// Returns an error if the queue cannot be read.
pub async fn status(service: &SyncService, format: OutputFormat) -> Result<String, SyncError> {
    let counts = service.queue().counts(service.settings().max_retries)?;
    let stats = service.stats().await?;
    format_status(&counts, &stats, format)
}

/// Run one sync pass.
///
/// # Errors
///
/// Returns an error only if output formatting fails.
pub async fn run(service: &SyncService, format: OutputFormat) -> Result<String, SyncError> {
    let result = service.sync().await;
    format_result(&result, format)
}

/// List queued items.
///
/// # Errors
///
/// Returns an error for an unknown state name or if the queue cannot be read.
pub fn list(
    service: &SyncService,
    state: Option<&str>,
    entity_type: Option<String>,
    owner_id: Option<String>,
    limit: usize,
    format: OutputFormat,
) -> Result<String, SyncError> {
    let state = state
        .map(|s| {
            ItemState::parse(s).ok_or_else(|| {
                SyncError::Config(format!(
                    "Unknown state '{s}' (expected eligible, dormant or synced)"
                ))
            })
        })
        .transpose()?;

    let filter = ItemFilter {
        state,
        entity_type,
        owner_id,
        limit: Some(limit),
    };
    let max_retries = service.settings().max_retries;
    let items = service.queue().list(&filter, max_retries)?;
    format_items(&items, max_retries, format)
}

/// Queue a mutation.
///
/// The item is written straight to the queue: this process exits right
/// away, so a background pass would not get to finish.
///
/// # Errors
///
/// Returns an error for an unknown operation or if the item cannot be stored.
pub fn add(
    service: &SyncService,
    operation: &str,
    entity_type: String,
    record_id: String,
    payload: String,
    owner_id: String,
    format: OutputFormat,
) -> Result<String, SyncError> {
    let operation = Operation::parse(operation).ok_or_else(|| {
        SyncError::Config(format!(
            "Unknown operation '{operation}' (expected create, update or delete)"
        ))
    })?;
    if entity_type.is_empty() || record_id.is_empty() {
        return Err(SyncError::Config(
            "Entity type and record ID must not be empty".to_string(),
        ));
    }

    let item = service.queue().enqueue(&NewItem::new(
        operation,
        entity_type,
        record_id,
        payload,
        owner_id,
    ))?;

    match format {
        OutputFormat::Json => to_json(&item),
        OutputFormat::Pretty => Ok(format!("Queued item {}\n{}", item.id, format_item(&item, format)?)),
    }
}

/// Reset dormant items and run a pass.
///
/// # Errors
///
/// Returns an error only if output formatting fails.
pub async fn retry(service: &SyncService, format: OutputFormat) -> Result<String, SyncError> {
    let result = service.retry_failed().await;
    format_result(&result, format)
}

/// Reset one item's retry metadata.
///
/// # Errors
///
/// Returns `SyncError::NotFound` if no unsynced item has this ID.
pub fn reset(service: &SyncService, id: i64, format: OutputFormat) -> Result<String, SyncError> {
    service.reset_item(id)?;

    match format {
        OutputFormat::Json => to_json(&json!({"reset": id})),
        OutputFormat::Pretty => Ok(format!("Reset item {id} for retry")),
    }
}

/// Drop one unsynced item.
///
/// # Errors
///
/// Returns `SyncError::NotFound` if no unsynced item has this ID.
pub fn discard(service: &SyncService, id: i64, format: OutputFormat) -> Result<String, SyncError> {
    service.discard_item(id)?;

    match format {
        OutputFormat::Json => to_json(&json!({"discarded": id})),
        OutputFormat::Pretty => Ok(format!("{} item {id}", "Discarded".yellow())),
    }
}

/// Delete old synced items.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn clear(
    service: &SyncService,
    older_than: Option<u32>,
    format: OutputFormat,
) -> Result<String, SyncError> {
    let days = older_than.unwrap_or(service.settings().retention_days);
    let count = service.clear_synced_items(days)?;

    match format {
        OutputFormat::Json => to_json(&json!({"cleared": count, "olderThanDays": days})),
        OutputFormat::Pretty => Ok(format!(
            "Cleared {count} synced items older than {days} days"
        )),
    }
}

/// Sync periodically and on reconnect until Ctrl-C.
///
/// # Errors
///
/// Returns an error for a zero interval or if the signal handler fails.
pub async fn daemon(
    service: &Arc<SyncService>,
    interval_minutes: u64,
    watch_interval: Duration,
    format: OutputFormat,
) -> Result<String, SyncError> {
    let interval = Duration::from_secs(interval_minutes.saturating_mul(60));
    service.start_auto_sync(interval)?;
    service.start_connectivity_watch(watch_interval)?;

    // Drain whatever is already queued
    let first = service.sync().await;
    if format == OutputFormat::Pretty {
        eprintln!("{}", format_result(&first, format)?);
        eprintln!(
            "{}",
            format!("Syncing every {interval_minutes} minutes; press Ctrl-C to stop").dimmed()
        );
    }

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received");
    service.shutdown().await;

    let counts = service.queue().counts(service.settings().max_retries)?;
    match format {
        OutputFormat::Json => to_json(&json!({"stopped": true, "queue": counts})),
        OutputFormat::Pretty => Ok(format!(
            "Stopped. {} items still pending.",
            counts.pending
        )),
    }
}
