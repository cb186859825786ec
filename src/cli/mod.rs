//! Command-line interface for leadsync.

pub mod args;
pub mod commands;
