//! Treasury pool management
//!
//! The pool is a singleton per deployment: accumulated sand and melange
//! totals plus an append-only audit trail. A balance mutation and its audit
//! record are written in one critical section so the totals always equal the
//! sum of the recorded transaction deltas.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use spice_core::{Result, TrackerError};

/// Audit record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

/// Immutable audit record for one treasury movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasuryTransaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub sand_amount: u64,
    pub melange_amount: u64,
    pub expedition_id: Option<u64>,
    /// Administrator who moved the funds, for withdrawals.
    pub actor_id: Option<String>,
    /// User the funds went to, for withdrawals.
    pub target_id: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Current balances, as reported to callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TreasuryBalance {
    pub sand: u64,
    pub melange: u64,
}

/// Balance plus lifetime aggregates, for the admin report surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasuryReport {
    pub balance: TreasuryBalance,
    pub lifetime_sand_deposited: u64,
    pub lifetime_sand_withdrawn: u64,
    pub transaction_count: usize,
    pub last_updated: DateTime<Utc>,
}

/// Pool state. Kept behind `TreasuryStore`'s lock; the struct itself is the
/// serializable snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasuryPool {
    sand_total: u64,
    melange_total: u64,
    lifetime_sand_deposited: u64,
    lifetime_sand_withdrawn: u64,
    transactions: Vec<TreasuryTransaction>,
    last_updated: DateTime<Utc>,
}

impl TreasuryPool {
    pub fn new() -> Self {
        Self {
            sand_total: 0,
            melange_total: 0,
            lifetime_sand_deposited: 0,
            lifetime_sand_withdrawn: 0,
            transactions: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    fn deposit(
        &mut self,
        sand_amount: u64,
        melange_amount: u64,
        expedition_id: Option<u64>,
        description: String,
    ) -> TreasuryTransaction {
        self.sand_total += sand_amount;
        self.melange_total += melange_amount;
        self.lifetime_sand_deposited += sand_amount;
        self.last_updated = Utc::now();

        let tx = TreasuryTransaction {
            id: Uuid::new_v4(),
            kind: TransactionKind::Deposit,
            sand_amount,
            melange_amount,
            expedition_id,
            actor_id: None,
            target_id: None,
            description,
            created_at: self.last_updated,
        };
        self.transactions.push(tx.clone());
        tx
    }

    fn withdraw(
        &mut self,
        sand_amount: u64,
        actor_id: &str,
        target_id: &str,
        description: String,
    ) -> Result<TreasuryTransaction> {
        if sand_amount == 0 {
            return Err(TrackerError::invalid_input(
                "sand_amount",
                "withdrawal must be at least 1 sand",
            ));
        }
        if sand_amount > self.sand_total {
            return Err(TrackerError::InsufficientBalance {
                entity: "treasury sand",
                requested: sand_amount,
                available: self.sand_total,
            });
        }

        self.sand_total -= sand_amount;
        self.lifetime_sand_withdrawn += sand_amount;
        self.last_updated = Utc::now();

        let tx = TreasuryTransaction {
            id: Uuid::new_v4(),
            kind: TransactionKind::Withdrawal,
            sand_amount,
            melange_amount: 0,
            expedition_id: None,
            actor_id: Some(actor_id.to_string()),
            target_id: Some(target_id.to_string()),
            description,
            created_at: self.last_updated,
        };
        self.transactions.push(tx.clone());
        Ok(tx)
    }

    pub fn balance(&self) -> TreasuryBalance {
        TreasuryBalance {
            sand: self.sand_total,
            melange: self.melange_total,
        }
    }

    pub fn transactions(&self) -> &[TreasuryTransaction] {
        &self.transactions
    }
}

impl Default for TreasuryPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper around the singleton pool. Every mutation appends its
/// audit record under the same lock acquisition as the balance update.
pub struct TreasuryStore {
    pool: Mutex<TreasuryPool>,
}

impl TreasuryStore {
    pub fn new() -> Self {
        Self {
            pool: Mutex::new(TreasuryPool::new()),
        }
    }

    /// Credit the pool, typically with an expedition's withheld cut.
    pub fn deposit(
        &self,
        sand_amount: u64,
        melange_amount: u64,
        expedition_id: Option<u64>,
        description: impl Into<String>,
    ) -> TreasuryTransaction {
        let tx = self
            .pool
            .lock()
            .deposit(sand_amount, melange_amount, expedition_id, description.into());
        info!(
            sand_amount,
            melange_amount,
            ?expedition_id,
            "treasury deposit"
        );
        tx
    }

    /// Administrative withdrawal of sand to a target user. Fails without
    /// mutating anything when the pool holds less than requested.
    pub fn withdraw(
        &self,
        sand_amount: u64,
        actor_id: &str,
        target_id: &str,
        description: impl Into<String>,
    ) -> Result<TreasuryTransaction> {
        let result =
            self.pool
                .lock()
                .withdraw(sand_amount, actor_id, target_id, description.into());
        match &result {
            Ok(_) => info!(sand_amount, actor_id, target_id, "treasury withdrawal"),
            Err(error) => warn!(sand_amount, actor_id, %error, "treasury withdrawal rejected"),
        }
        result
    }

    pub fn balance(&self) -> TreasuryBalance {
        self.pool.lock().balance()
    }

    pub fn report(&self) -> TreasuryReport {
        let pool = self.pool.lock();
        TreasuryReport {
            balance: pool.balance(),
            lifetime_sand_deposited: pool.lifetime_sand_deposited,
            lifetime_sand_withdrawn: pool.lifetime_sand_withdrawn,
            transaction_count: pool.transactions.len(),
            last_updated: pool.last_updated,
        }
    }

    pub fn transactions(&self) -> Vec<TreasuryTransaction> {
        self.pool.lock().transactions.clone()
    }

    /// Zero the pool and drop the audit trail. Irreversible.
    pub fn reset(&self) {
        *self.pool.lock() = TreasuryPool::new();
        info!("treasury reset");
    }

    pub fn snapshot(&self) -> TreasuryPool {
        self.pool.lock().clone()
    }

    pub fn restore(pool: TreasuryPool) -> Self {
        Self {
            pool: Mutex::new(pool),
        }
    }
}

impl Default for TreasuryStore {
    fn default() -> Self {
        Self::new()
    }
}
