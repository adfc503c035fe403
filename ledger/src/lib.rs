//! Spice Tracker Ledger Module
//!
//! The append-only deposit record plus per-user earned/paid melange
//! counters, the expedition log, and payroll processing. Per-user counter
//! updates are atomic with respect to concurrent deposits and payments for
//! the same user; operations on different users never contend.

pub mod expeditions;
pub mod payment;
pub mod store;

pub use expeditions::{Expedition, ExpeditionLog, ExpeditionParticipant};
pub use payment::{PaymentProcessor, PayoutLedger, PayrollFailure, PayrollReport};
pub use store::{DepositLedger, DepositReceipt, LedgerSnapshot, LedgerStore};
