use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "leadsync")]
#[command(about = "Offline-first sync queue for the sales-lead CRM")]
#[command(long_about = "leadsync - Offline-first sync queue for the sales-lead CRM

Mutations made while offline are queued in a local SQLite database and
pushed to the remote authority in the order they were made. Remote changes
are pulled back at the end of every pass.

QUICK START:
  leadsync status                          Show queue totals and connectivity
  leadsync add update lead L-42 '{...}'    Queue a mutation
  leadsync run                             Run one sync pass now
  leadsync daemon                          Sync periodically until Ctrl-C

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

Configuration lives in ~/.leadsync/config.yaml.")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Defaults to `general.default_output` from the config file.
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    ///
    /// Logs go to stderr. RUST_LOG overrides this flag.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show queue totals, connectivity and today's activity
    ///
    /// # Examples
    ///
    ///   leadsync status
    ///   leadsync status -o json
    #[command(alias = "st")]
    Status,

    /// Run one sync pass now
    ///
    /// Pushes eligible items oldest first, then pulls remote changes.
    /// Does nothing while offline.
    Run,

    /// List queued mutations
    ///
    /// # Examples
    ///
    ///   leadsync list
    ///   leadsync list --state dormant
    ///   leadsync list --entity lead --owner u-7 -n 5
    #[command(alias = "ls")]
    List {
        /// Filter by state (eligible, dormant, synced; pending and failed are aliases)
        #[arg(long, short = 's')]
        state: Option<String>,

        /// Filter by entity type
        #[arg(long, short = 'e')]
        entity: Option<String>,

        /// Filter by owner
        #[arg(long)]
        owner: Option<String>,

        /// Maximum items to show
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },

    /// Queue a mutation for the remote authority
    ///
    /// # Examples
    ///
    ///   leadsync add create lead L-42 '{"name":"Acme"}' --owner u-7
    ///   leadsync add delete payment P-9 --owner u-7
    Add {
        /// Operation (create, update, delete)
        operation: String,

        /// Entity type (lead, payment, campaign, ...)
        entity_type: String,

        /// Record identifier
        record_id: String,

        /// Serialized mutation payload
        #[arg(default_value = "{}")]
        payload: String,

        /// Owning user
        #[arg(long)]
        owner: String,
    },

    /// Reset dormant items and run a pass
    ///
    /// Gives every item that ran out of retries a fresh budget.
    Retry,

    /// Reset one unsynced item's retry metadata
    Reset {
        /// Queue item ID
        id: i64,
    },

    /// Drop one unsynced item for good
    ///
    /// Use this for mutations the remote authority keeps rejecting with a
    /// conflict.
    Discard {
        /// Queue item ID
        id: i64,
    },

    /// Delete synced items older than the retention window
    Clear {
        /// Retention window in days (defaults to `sync.retention_days`)
        #[arg(long)]
        older_than: Option<u32>,
    },

    /// Sync periodically until interrupted
    ///
    /// Also watches connectivity and syncs as soon as the network returns.
    Daemon {
        /// Minutes between passes (defaults to `sync.interval_minutes`)
        #[arg(long)]
        interval: Option<u64>,
    },
}
