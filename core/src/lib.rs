//! Spice Tracker Core Library
//!
//! Shared record types and the error taxonomy used by every crate in the
//! workspace.

pub mod error;
pub mod types;

pub use error::{Result, TrackerError};
pub use types::{Deposit, DepositOrigin, UserAccount};
