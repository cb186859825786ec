use chrono::{DateTime, Local, Utc};
use colored::Colorize;

use crate::sync::{ItemState, QueueCounts, QueueItem, SyncResult, SyncStats};

const MAX_ERRORS_SHOWN: usize = 5;

fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

/// Format the outcome of a sync pass
pub fn format_result_pretty(result: &SyncResult) -> String {
    if !result.success {
        let reason = result.errors.first().map_or("unknown reason", String::as_str);
        return format!("{} {}", "Sync skipped:".yellow().bold(), reason);
    }

    let mut lines = Vec::new();
    lines.push(format!("Sync completed: {} items", result.attempted()));
    lines.push("─".repeat(40));

    if result.synced > 0 {
        lines.push(format!(
            "  {} {}",
            "✓".green(),
            format!("{} synced", result.synced).green()
        ));
    }
    if result.failed > 0 {
        lines.push(format!(
            "  {} {}",
            "✗".red(),
            format!("{} failed", result.failed).red()
        ));
    }
    if result.conflicts > 0 {
        lines.push(format!(
            "  {} {}",
            "!".yellow(),
            format!("{} conflicts", result.conflicts).yellow()
        ));
    }
    lines.push(format!("  {} {} pulled", "↓".cyan(), result.pulled));

    if !result.errors.is_empty() {
        lines.push(String::new());
        lines.push("Errors:".to_string());
        for error in result.errors.iter().take(MAX_ERRORS_SHOWN) {
            lines.push(format!("  {}", truncate(error, 70).red()));
        }
        if result.errors.len() > MAX_ERRORS_SHOWN {
            lines.push(format!(
                "  {}",
                format!("... and {} more", result.errors.len() - MAX_ERRORS_SHOWN).dimmed()
            ));
        }
    }

    lines.join("\n")
}

/// Format queue totals and today's activity
pub fn format_status_pretty(counts: &QueueCounts, stats: &SyncStats) -> String {
    let mut lines = Vec::new();

    lines.push("Sync Queue Status".bold().to_string());
    lines.push("─".repeat(40));

    let network = if stats.is_online {
        "online".green()
    } else {
        "offline".red()
    };
    lines.push(format!("  Network:    {network}"));
    if stats.is_syncing {
        lines.push(format!("  {}", "A sync pass is running".cyan()));
    }

    lines.push(format!(
        "  Pending:    {} {}",
        counts.pending,
        if counts.pending > 0 {
            "items waiting".dimmed()
        } else {
            "".dimmed()
        }
    ));
    lines.push(format!(
        "  Dormant:    {} {}",
        counts.dormant,
        if counts.dormant > 0 {
            "items out of retries".red()
        } else {
            "".normal()
        }
    ));
    if stats.conflicted_count > 0 {
        lines.push(format!(
            "  Conflicts:  {} {}",
            stats.conflicted_count,
            "items rejected by the server".yellow()
        ));
    }
    lines.push(format!("  Synced:     {} {}", counts.synced, "items kept".dimmed()));
    lines.push(format!(
        "  Today:      {} synced, {} failed",
        stats.synced_today, stats.failed_today
    ));

    let last = stats
        .last_sync
        .map_or_else(|| "never".to_string(), local_time);
    lines.push(format!("  Last sync:  {}", last.dimmed()));

    if counts.dormant > 0 {
        lines.push(String::new());
        lines.push(
            "Run 'leadsync retry' to give dormant items another chance"
                .dimmed()
                .to_string(),
        );
    } else if counts.pending > 0 {
        lines.push(String::new());
        lines.push("Run 'leadsync run' to sync now".dimmed().to_string());
    }

    lines.join("\n")
}

/// Format queue items as a table
pub fn format_items_pretty(items: &[QueueItem], max_retries: u32) -> String {
    if items.is_empty() {
        return "No items in queue.".to_string();
    }

    let mut lines = Vec::new();
    lines.push(format!("Queue Items ({})", items.len()));
    lines.push("─".repeat(72));
    lines.push(format!(
        "{:<6} {:<8} {:<28} {:<18} {}",
        "ID", "Op", "Target", "Created", "State"
    ));
    lines.push("─".repeat(72));

    for item in items {
        let state = match item.state(max_retries) {
            ItemState::Eligible if item.conflict_count > 0 => "conflict".yellow(),
            ItemState::Eligible if item.retry_count > 0 => {
                format!("retry {}/{max_retries}", item.retry_count).normal()
            }
            ItemState::Eligible => "pending".normal(),
            ItemState::Dormant => "dormant".red(),
            ItemState::Synced => "synced".green(),
        };

        lines.push(format!(
            "{:<6} {:<8} {:<28} {:<18} {}",
            item.id,
            item.operation,
            truncate(&item.target(), 28),
            local_time(item.created_at),
            state
        ));

        if let (Some(error), false) = (&item.last_error, item.is_synced()) {
            lines.push(format!("       {}", truncate(error, 60).red()));
        }
    }

    lines.join("\n")
}

/// Format one queue item with all of its metadata
pub fn format_item_pretty(item: &QueueItem) -> String {
    let mut output = format!("{} {}\n", item.operation.to_string().bold(), item.target());
    output.push_str(&format!("  {}: {}\n", "ID".dimmed(), item.id));
    output.push_str(&format!("  {}: {}\n", "Owner".dimmed(), item.owner_id));
    output.push_str(&format!(
        "  {}: {}\n",
        "Created".dimmed(),
        local_time(item.created_at)
    ));
    output.push_str(&format!("  {}: {}\n", "Payload".dimmed(), truncate(&item.payload, 60)));
    output
}
