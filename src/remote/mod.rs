//! Remote authority boundary.
//!
//! Traits the orchestrator drives (reachability probe, push, pull, change
//! sink) and their HTTP implementations.

pub mod client;
pub mod connectivity;
pub mod pull;
pub mod push;

pub use client::HttpRemote;
pub use connectivity::{ConnectivityProbe, HttpProbe, ManualConnectivity};
pub use pull::{ChangeSink, LogSink, PullAdapter, PullBatch, PullOutcome};
pub use push::{PushAdapter, PushOutcome, PushRequest};
