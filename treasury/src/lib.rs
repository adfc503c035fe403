//! Spice Tracker Treasury Module
//!
//! Manages the shared pool that receives the withheld cut from every
//! expedition split. Funds leave only through audited administrative
//! withdrawals.

pub mod pool;

pub use pool::{
    TreasuryBalance, TreasuryPool, TreasuryReport, TreasuryStore, TreasuryTransaction,
    TransactionKind,
};
