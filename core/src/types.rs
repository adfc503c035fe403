//! Shared ledger record types
//!
//! These mirror the persisted rows: one `UserAccount` per member, one
//! immutable `Deposit` per reported collection or expedition share.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user aggregate counters. Created on first deposit, never deleted;
/// `reset` zeroes the counters in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: String,
    pub display_name: String,
    /// Total melange earned. Monotonically non-decreasing except on reset.
    pub earned_melange: u64,
    /// Total melange paid out. Invariant: `paid_melange <= earned_melange`.
    pub paid_melange: u64,
    pub last_updated: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            earned_melange: 0,
            paid_melange: 0,
            last_updated: Utc::now(),
        }
    }

    /// Earned-but-unpaid melange. Never negative by invariant.
    pub fn pending_melange(&self) -> u64 {
        self.earned_melange.saturating_sub(self.paid_melange)
    }
}

/// How a deposit entered the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositOrigin {
    /// Reported directly by the user.
    Solo,
    /// A participant share from an expedition split.
    Expedition,
}

/// Immutable record of one sand deposit. Never mutated after creation; may
/// be pruned after a retention window once fully reflected in the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub id: u64,
    pub user_id: String,
    /// Raw sand reported. Always positive.
    pub sand_amount: u64,
    pub origin: DepositOrigin,
    /// Set when `origin` is `Expedition`.
    pub expedition_id: Option<u64>,
    pub created_at: DateTime<Utc>,
}
