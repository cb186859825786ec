use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use leadsync::cli::args::{Cli, Commands};
use leadsync::cli::commands;
use leadsync::config::Config;
use leadsync::logging::setup_logging;
use leadsync::sync::SyncService;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = Config::load().context("Failed to load configuration")?;
    let format = cli.output.unwrap_or(config.general.default_output);
    let service =
        Arc::new(SyncService::from_config(&config).context("Failed to open the sync queue")?);

    let output = match cli.command {
        Commands::Status => commands::status(&service, format).await?,
        Commands::Run => commands::run(&service, format).await?,
        Commands::List {
            state,
            entity,
            owner,
            limit,
        } => commands::list(&service, state.as_deref(), entity, owner, limit, format)?,
        Commands::Add {
            operation,
            entity_type,
            record_id,
            payload,
            owner,
        } => commands::add(&service, &operation, entity_type, record_id, payload, owner, format)?,
        Commands::Retry => commands::retry(&service, format).await?,
        Commands::Reset { id } => commands::reset(&service, id, format)?,
        Commands::Discard { id } => commands::discard(&service, id, format)?,
        Commands::Clear { older_than } => commands::clear(&service, older_than, format)?,
        Commands::Daemon { interval } => {
            let minutes = interval.unwrap_or(config.sync.interval_minutes);
            commands::daemon(&service, minutes, config.connectivity.watch_interval(), format).await?
        }
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
