//! leadsync - Offline-first sync engine for a sales-lead CRM
//!
//! Mutations are written to a durable local queue first and reconciled with
//! the remote authority whenever the network allows. See [`sync`] for the
//! engine and [`remote`] for the adapters it drives.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod remote;
pub mod storage;
pub mod sync;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use error::SyncError;
pub use sync::{NewItem, Operation, QueueItem, SyncQueue, SyncResult, SyncService, SyncStats};
