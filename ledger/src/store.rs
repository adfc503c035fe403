//! Ledger store
//!
//! `DashMap` entry guards serialize read-modify-write on a single user's
//! counters (the per-row lock the bookkeeping invariants need); the deposit
//! log is append-only behind its own lock. Deposits record sand; melange is
//! computed once, at the rate captured by the caller, and folded into the
//! user's earned counter in the same critical section.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use economics::ConversionRate;
use spice_core::{Deposit, DepositOrigin, Result, TrackerError, UserAccount};

/// What a single deposit did: the immutable row plus the conversion result
/// and the user's updated earned total.
#[derive(Debug, Clone)]
pub struct DepositReceipt {
    pub deposit: Deposit,
    pub melange_earned: u64,
    /// Sand short of the next melange for this deposit alone. Reported
    /// once, never persisted as a carry balance.
    pub leftover_sand: u64,
    pub new_earned_total: u64,
}

/// Serializable copy of the full ledger state, for snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub accounts: Vec<UserAccount>,
    pub deposits: Vec<Deposit>,
    pub next_deposit_id: u64,
}

/// The ledger surface expedition crediting needs. Seam for exercising
/// partial-failure reporting.
pub trait DepositLedger {
    fn account(&self, user_id: &str) -> Option<UserAccount>;
    fn record_deposit(
        &self,
        user_id: &str,
        display_name: &str,
        sand_amount: u64,
        origin: DepositOrigin,
        expedition_id: Option<u64>,
        rate: ConversionRate,
    ) -> Result<DepositReceipt>;
}

impl DepositLedger for LedgerStore {
    fn account(&self, user_id: &str) -> Option<UserAccount> {
        LedgerStore::account(self, user_id)
    }

    fn record_deposit(
        &self,
        user_id: &str,
        display_name: &str,
        sand_amount: u64,
        origin: DepositOrigin,
        expedition_id: Option<u64>,
        rate: ConversionRate,
    ) -> Result<DepositReceipt> {
        LedgerStore::record_deposit(
            self,
            user_id,
            display_name,
            sand_amount,
            origin,
            expedition_id,
            rate,
        )
    }
}

/// In-memory ledger: per-user counters plus the append-only deposit log.
pub struct LedgerStore {
    accounts: DashMap<String, UserAccount>,
    deposits: RwLock<Vec<Deposit>>,
    next_deposit_id: AtomicU64,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            deposits: RwLock::new(Vec::new()),
            next_deposit_id: AtomicU64::new(1),
        }
    }

    /// Record a sand deposit and credit the converted melange to the user,
    /// creating the account on first contact. The counter update happens
    /// under the account's entry guard, so two concurrent deposits for the
    /// same user cannot lose an update.
    pub fn record_deposit(
        &self,
        user_id: &str,
        display_name: &str,
        sand_amount: u64,
        origin: DepositOrigin,
        expedition_id: Option<u64>,
        rate: ConversionRate,
    ) -> Result<DepositReceipt> {
        if sand_amount == 0 {
            return Err(TrackerError::invalid_input(
                "sand_amount",
                "deposit must be at least 1 sand",
            ));
        }

        let conversion = rate.convert(sand_amount);
        let new_earned_total = {
            let mut account = self
                .accounts
                .entry(user_id.to_string())
                .or_insert_with(|| UserAccount::new(user_id, display_name));
            account.display_name = display_name.to_string();
            account.earned_melange += conversion.melange;
            account.last_updated = Utc::now();
            account.earned_melange
        };

        let deposit = Deposit {
            id: self.next_deposit_id.fetch_add(1, Ordering::SeqCst),
            user_id: user_id.to_string(),
            sand_amount,
            origin,
            expedition_id,
            created_at: Utc::now(),
        };
        self.deposits.write().push(deposit.clone());

        info!(
            user_id,
            sand_amount,
            melange = conversion.melange,
            deposit_id = deposit.id,
            ?origin,
            "deposit recorded"
        );

        Ok(DepositReceipt {
            deposit,
            melange_earned: conversion.melange,
            leftover_sand: conversion.leftover_sand,
            new_earned_total,
        })
    }

    /// Earned-but-unpaid melange for a user. Zero for unknown users.
    pub fn pending_for(&self, user_id: &str) -> u64 {
        self.accounts
            .get(user_id)
            .map(|a| a.pending_melange())
            .unwrap_or(0)
    }

    /// Mark melange as paid. Fails without mutating when the amount exceeds
    /// the user's pending balance.
    pub fn mark_paid(&self, user_id: &str, amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(TrackerError::invalid_input(
                "amount",
                "payment must be at least 1 melange",
            ));
        }
        let mut account = self
            .accounts
            .get_mut(user_id)
            .ok_or_else(|| TrackerError::UnknownUser(user_id.to_string()))?;
        let pending = account.pending_melange();
        if amount > pending {
            warn!(user_id, amount, pending, "payment exceeds pending melange");
            return Err(TrackerError::InsufficientBalance {
                entity: "pending melange",
                requested: amount,
                available: pending,
            });
        }
        account.paid_melange += amount;
        account.last_updated = Utc::now();
        info!(user_id, amount, "melange paid");
        Ok(())
    }

    /// Copy of one account.
    pub fn account(&self, user_id: &str) -> Option<UserAccount> {
        self.accounts.get(user_id).map(|a| a.clone())
    }

    /// Every account, unordered.
    pub fn all_accounts(&self) -> Vec<UserAccount> {
        self.accounts.iter().map(|a| a.clone()).collect()
    }

    /// Users with a strictly positive pending balance, largest first, ties
    /// broken by display name.
    pub fn users_with_pending(&self) -> Vec<UserAccount> {
        let mut users: Vec<UserAccount> = self
            .accounts
            .iter()
            .filter(|a| a.pending_melange() > 0)
            .map(|a| a.clone())
            .collect();
        users.sort_by(|a, b| {
            b.pending_melange()
                .cmp(&a.pending_melange())
                .then_with(|| a.display_name.cmp(&b.display_name))
        });
        users
    }

    /// Top earners, by melange earned descending then display name.
    pub fn leaderboard(&self, limit: usize) -> Vec<UserAccount> {
        let mut users = self.all_accounts();
        users.sort_by(|a, b| {
            b.earned_melange
                .cmp(&a.earned_melange)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });
        users.truncate(limit);
        users
    }

    /// A user's deposits, newest first.
    pub fn deposits_for(&self, user_id: &str) -> Vec<Deposit> {
        let mut rows: Vec<Deposit> = self
            .deposits
            .read()
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        rows.reverse();
        rows
    }

    pub fn deposit_count(&self) -> usize {
        self.deposits.read().len()
    }

    /// Zero every user's counters and delete all deposit rows. Returns the
    /// number of users affected. Irreversible.
    pub fn reset_all(&self) -> usize {
        let mut affected = 0;
        for mut account in self.accounts.iter_mut() {
            if account.earned_melange > 0 || account.paid_melange > 0 {
                affected += 1;
            }
            account.earned_melange = 0;
            account.paid_melange = 0;
            account.last_updated = Utc::now();
        }
        self.deposits.write().clear();
        info!(affected, "ledger reset");
        affected
    }

    /// Retention pruning: drop deposit rows created before the cutoff.
    /// Storage hygiene only; counters are untouched.
    pub fn prune_deposits(&self, cutoff: DateTime<Utc>) -> usize {
        let mut deposits = self.deposits.write();
        let before = deposits.len();
        deposits.retain(|d| d.created_at >= cutoff);
        let removed = before - deposits.len();
        if removed > 0 {
            info!(removed, "old deposits pruned");
        }
        removed
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            accounts: self.all_accounts(),
            deposits: self.deposits.read().clone(),
            next_deposit_id: self.next_deposit_id.load(Ordering::SeqCst),
        }
    }

    pub fn restore(snapshot: LedgerSnapshot) -> Self {
        let store = Self::new();
        for account in snapshot.accounts {
            store.accounts.insert(account.user_id.clone(), account);
        }
        *store.deposits.write() = snapshot.deposits;
        store
            .next_deposit_id
            .store(snapshot.next_deposit_id, Ordering::SeqCst);
        store
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}
