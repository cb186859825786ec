//! Command implementations for leadsync.
//!
//! Every command returns the text to print; `main` prints it.

mod sync;

pub use sync::{add, clear, daemon, discard, list, reset, retry, run, status};
