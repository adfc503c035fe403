//! Spice Tracker Service
//!
//! Ties the economics, ledger, treasury, and storage crates together behind
//! the operation surface a command layer calls: deposits, expedition splits,
//! pending queries, payments, treasury administration, configuration, and
//! snapshots.

pub mod config;
pub mod service;

pub use config::TrackerConfig;
pub use service::{SpiceTracker, SplitOutcome};

// Re-exported so the command layer needs only this crate.
pub use economics::{ConversionRate, ParticipantSpec};
pub use spice_core::{Result, TrackerError};
