//! Workspace-wide error taxonomy
//!
//! Every store and the service facade report failures through this one enum
//! so the command layer can present them without inspecting stack traces.

use thiserror::Error;

/// Ledger core errors
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Insufficient {entity} balance: requested {requested}, available {available}")]
    InsufficientBalance {
        entity: &'static str,
        requested: u64,
        available: u64,
    },

    #[error("Concurrent modification detected on {entity} {id}; retry the operation")]
    ConflictOrRace { entity: &'static str, id: String },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A multi-record operation where some sub-writes committed before one
    /// failed. `committed` names the sub-operations that are already durable
    /// so an administrator can reconcile.
    #[error("Partial failure in {operation}: {committed:?} committed, then {cause}")]
    PartialFailure {
        operation: &'static str,
        committed: Vec<String>,
        cause: String,
    },

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Unknown expedition: {0}")]
    UnknownExpedition(u64),
}

impl TrackerError {
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        TrackerError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
