//! Storage layer for leadsync.
//!
//! SQLite-based persistence for the durable mutation queue and the
//! pull cursor.

mod database;
mod migrations;

pub use database::Database;
