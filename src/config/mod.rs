//! Configuration management for leadsync.
//!
//! This module handles loading and saving configuration from `~/.leadsync/`.

mod paths;
mod settings;

pub use paths::Paths;
pub use settings::{Config, ConnectivityConfig, GeneralConfig, RemoteConfig, SyncSettings};
