//! Tracker service facade
//!
//! The operations the command surface calls. Authentication, permission
//! checks, and presentation happen before these are invoked; the service
//! trusts the caller-supplied actor ids. Allocation and conversion are pure
//! computations; only the store writes mutate state.

use chrono::{Duration, Utc};
use tracing::info;

use economics::{allocate, Allocation, ConversionRate, ParticipantSpec};
use ledger::{
    DepositLedger, DepositReceipt, Expedition, ExpeditionLog, LedgerStore, PaymentProcessor,
    PayrollReport,
};
use spice_core::{Deposit, DepositOrigin, Result, TrackerError, UserAccount};
use spice_storage::{
    SnapshotStore, CONFIG_SNAPSHOT, EXPEDITIONS_SNAPSHOT, LEDGER_SNAPSHOT, TREASURY_SNAPSHOT,
};
use treasury::{TreasuryBalance, TreasuryReport, TreasuryStore, TreasuryTransaction};

use crate::config::TrackerConfig;

/// Result of one expedition split, as reported to the caller.
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub expedition_id: u64,
    pub treasury_sand: u64,
    pub treasury_melange: u64,
    /// Residual sand the equal split could not hand out; banked into the
    /// treasury together with the cut.
    pub unallocated_sand: u64,
    pub shares: Vec<economics::ParticipantShare>,
}

/// One deployment's ledger, expedition history, treasury, and configuration.
pub struct SpiceTracker {
    config: TrackerConfig,
    ledger: LedgerStore,
    expeditions: ExpeditionLog,
    treasury: TreasuryStore,
}

impl SpiceTracker {
    pub fn new() -> Self {
        Self {
            config: TrackerConfig::new(),
            ledger: LedgerStore::new(),
            expeditions: ExpeditionLog::new(),
            treasury: TreasuryStore::new(),
        }
    }

    // --- deposits ---

    /// Record a solo sand deposit, converting at the currently active rate.
    pub fn deposit(
        &self,
        user_id: &str,
        display_name: &str,
        sand_amount: u64,
    ) -> Result<DepositReceipt> {
        let rate = self.config.active_rate();
        self.ledger.record_deposit(
            user_id,
            display_name,
            sand_amount,
            DepositOrigin::Solo,
            None,
            rate,
        )
    }

    /// Split an expedition's sand among its participants.
    ///
    /// The conversion rate is captured once, recorded on the expedition, and
    /// used for every share. The treasury receives its cut plus any residual
    /// the equal split could not allocate, in one expedition-tagged audit
    /// record. Each participant's deposit is its own atomic write; if one
    /// fails, everything already committed stands, and the error names each
    /// committed sub-operation (expedition row, treasury deposit, and
    /// per-participant credits) so an administrator can reconcile.
    pub fn split(
        &self,
        initiator_id: &str,
        total_sand: u64,
        treasury_percent: u8,
        participants: &[ParticipantSpec],
    ) -> Result<SplitOutcome> {
        let rate = self.config.active_rate();
        let allocation = allocate(total_sand, treasury_percent, participants, rate)?;

        let expedition_id =
            self.expeditions
                .record(initiator_id, total_sand, treasury_percent, rate, &allocation);

        let mut committed = vec![format!("expedition {expedition_id}")];

        let treasury_sand = allocation.treasury_sand + allocation.unallocated_sand;
        if treasury_sand > 0 {
            self.treasury.deposit(
                treasury_sand,
                allocation.treasury_melange,
                Some(expedition_id),
                format!("expedition {expedition_id} cut"),
            );
            committed.push(format!("treasury deposit of {treasury_sand} sand"));
        }

        credit_participants(&self.ledger, expedition_id, rate, &allocation, committed)?;

        info!(
            expedition_id,
            initiator_id,
            total_sand,
            treasury_percent,
            participants = allocation.shares.len(),
            "expedition split recorded"
        );

        Ok(SplitOutcome {
            expedition_id,
            treasury_sand: allocation.treasury_sand,
            treasury_melange: allocation.treasury_melange,
            unallocated_sand: allocation.unallocated_sand,
            shares: allocation.shares,
        })
    }

    // --- queries ---

    /// A user's earned-but-unpaid melange. Zero for unknown users.
    pub fn pending(&self, user_id: &str) -> u64 {
        self.ledger.pending_for(user_id)
    }

    /// Every user with a positive pending balance, largest first.
    pub fn pending_all(&self) -> Vec<UserAccount> {
        self.ledger.users_with_pending()
    }

    pub fn account(&self, user_id: &str) -> Option<UserAccount> {
        self.ledger.account(user_id)
    }

    /// All accounts, for the full-ledger listing.
    pub fn all_accounts(&self) -> Vec<UserAccount> {
        self.ledger.all_accounts()
    }

    pub fn leaderboard(&self, limit: usize) -> Vec<UserAccount> {
        self.ledger.leaderboard(limit)
    }

    /// A user's deposit history, newest first.
    pub fn deposits_for(&self, user_id: &str) -> Vec<Deposit> {
        self.ledger.deposits_for(user_id)
    }

    pub fn expedition(&self, id: u64) -> Result<Expedition> {
        self.expeditions.get(id)
    }

    /// Sand the user still needs before their next deposit would convert to
    /// a whole melange, at the active rate. Display helper only.
    pub fn sand_to_next_melange(&self, sand_on_hand: u64) -> u64 {
        self.config.active_rate().sand_to_next_melange(sand_on_hand)
    }

    // --- payments ---

    /// Pay a user's pending melange: all of it when `amount` is omitted, or
    /// an exact partial amount (rejected if above pending).
    pub fn pay(&self, user_id: &str, amount: Option<u64>) -> Result<u64> {
        PaymentProcessor::pay_user(&self.ledger, user_id, amount)
    }

    /// Settle every user with pending melange. Per-user failures are
    /// collected in the report; completed payments stand.
    pub fn pay_all(&self) -> PayrollReport {
        PaymentProcessor::pay_all(&self.ledger)
    }

    // --- treasury ---

    pub fn treasury_balance(&self) -> TreasuryBalance {
        self.treasury.balance()
    }

    pub fn treasury_report(&self) -> TreasuryReport {
        self.treasury.report()
    }

    pub fn treasury_transactions(&self) -> Vec<TreasuryTransaction> {
        self.treasury.transactions()
    }

    /// Administrative withdrawal of treasury sand to a user.
    pub fn treasury_withdraw(
        &self,
        target_id: &str,
        sand_amount: u64,
        actor_id: &str,
        description: &str,
    ) -> Result<TreasuryTransaction> {
        self.treasury
            .withdraw(sand_amount, actor_id, target_id, description)
    }

    // --- administration ---

    /// Set the standard sand-per-melange ratio for subsequent conversions.
    pub fn set_ratio(&self, sand_per_melange: u64) -> Result<()> {
        self.config.set_standard_ratio(sand_per_melange)
    }

    /// Toggle the bonus rate for subsequent conversions.
    pub fn set_bonus_active(&self, active: bool) {
        self.config.set_bonus_active(active)
    }

    pub fn active_rate(&self) -> ConversionRate {
        self.config.active_rate()
    }

    /// Zero every counter and drop all history: deposits, expeditions, and
    /// the treasury with its audit trail. Returns users affected.
    pub fn reset(&self) -> usize {
        let affected = self.ledger.reset_all();
        self.expeditions.clear();
        self.treasury.reset();
        info!(affected, "full tracker reset");
        affected
    }

    /// Retention pruning for deposit rows older than `days`.
    pub fn prune_deposits(&self, days: i64) -> usize {
        self.ledger.prune_deposits(Utc::now() - Duration::days(days))
    }

    // --- persistence ---

    /// Persist the whole tracker state as named snapshots.
    pub fn save_to(&self, store: &SnapshotStore) -> Result<()> {
        store
            .save(LEDGER_SNAPSHOT, &self.ledger.snapshot())
            .and_then(|_| store.save(EXPEDITIONS_SNAPSHOT, &self.expeditions.snapshot()))
            .and_then(|_| store.save(TREASURY_SNAPSHOT, &self.treasury.snapshot()))
            .and_then(|_| store.save(CONFIG_SNAPSHOT, &self.config.conversion()))
            .map_err(|e| TrackerError::StorageUnavailable(e.to_string()))
    }

    /// Rebuild a tracker from saved snapshots.
    pub fn load_from(store: &SnapshotStore) -> Result<Self> {
        let map_err = |e: spice_storage::SnapshotError| TrackerError::StorageUnavailable(e.to_string());
        Ok(Self {
            ledger: LedgerStore::restore(store.load(LEDGER_SNAPSHOT).map_err(map_err)?),
            expeditions: ExpeditionLog::restore(
                store.load(EXPEDITIONS_SNAPSHOT).map_err(map_err)?,
            ),
            treasury: TreasuryStore::restore(store.load(TREASURY_SNAPSHOT).map_err(map_err)?),
            config: TrackerConfig::restore(store.load(CONFIG_SNAPSHOT).map_err(map_err)?),
        })
    }
}

impl Default for SpiceTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Credit each non-zero participant share as its own deposit. `committed`
/// arrives pre-seeded with the expedition and treasury writes; a failed
/// credit surfaces as `PartialFailure` carrying everything durable so far.
fn credit_participants(
    ledger: &impl DepositLedger,
    expedition_id: u64,
    rate: ConversionRate,
    allocation: &Allocation,
    mut committed: Vec<String>,
) -> Result<()> {
    for share in &allocation.shares {
        if share.sand_share == 0 {
            continue;
        }
        let display_name = ledger
            .account(&share.user_id)
            .map(|a| a.display_name)
            .unwrap_or_else(|| share.user_id.clone());
        if let Err(err) = ledger.record_deposit(
            &share.user_id,
            &display_name,
            share.sand_share,
            DepositOrigin::Expedition,
            Some(expedition_id),
            rate,
        ) {
            return Err(TrackerError::PartialFailure {
                operation: "split",
                committed,
                cause: err.to_string(),
            });
        }
        committed.push(format!("deposit for {}", share.user_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_reports_conversion() {
        let tracker = SpiceTracker::new();
        let receipt = tracker.deposit("u1", "Adira", 2530).unwrap();
        assert_eq!(receipt.melange_earned, 50);
        assert_eq!(receipt.leftover_sand, 30);
        assert_eq!(receipt.new_earned_total, 50);
    }

    #[test]
    fn test_bonus_applies_only_going_forward() {
        let tracker = SpiceTracker::new();
        let before = tracker.deposit("u1", "Adira", 75).unwrap();
        assert_eq!(before.melange_earned, 1);

        tracker.set_bonus_active(true);
        let after = tracker.deposit("u1", "Adira", 75).unwrap();
        assert_eq!(after.melange_earned, 2);

        // Earlier deposit's contribution is unchanged: 1 + 2
        assert_eq!(tracker.account("u1").unwrap().earned_melange, 3);
    }

    #[test]
    fn test_split_banks_cut_and_residual() {
        let tracker = SpiceTracker::new();
        // 1001 at 0% treasury, 2 implicit users: 500 each, 1 unallocated
        let outcome = tracker
            .split(
                "u1",
                1001,
                0,
                &[
                    ParticipantSpec::implicit("u1"),
                    ParticipantSpec::implicit("u2"),
                ],
            )
            .unwrap();
        assert_eq!(outcome.treasury_sand, 0);
        assert_eq!(outcome.unallocated_sand, 1);
        // The residual sand landed in the treasury
        assert_eq!(tracker.treasury_balance().sand, 1);
    }

    #[test]
    fn test_split_captures_rate() {
        let tracker = SpiceTracker::new();
        let outcome = tracker
            .split("u1", 1000, 10, &[ParticipantSpec::implicit("u1")])
            .unwrap();
        tracker.set_ratio(10).unwrap();
        let expedition = tracker.expedition(outcome.expedition_id).unwrap();
        assert_eq!(expedition.rate, ConversionRate::standard());
    }

    struct RefusingLedger<'a> {
        inner: &'a LedgerStore,
        refused_user: &'a str,
    }

    impl DepositLedger for RefusingLedger<'_> {
        fn account(&self, user_id: &str) -> Option<UserAccount> {
            self.inner.account(user_id)
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
            if user_id == self.refused_user {
                return Err(TrackerError::StorageUnavailable("write refused".to_string()));
            }
            self.inner
                .record_deposit(user_id, display_name, sand_amount, origin, expedition_id, rate)
        }
    }

    #[test]
    fn test_split_failure_reports_all_committed_writes() {
        // 1000 at 10%: cut 100, then 450 sand (9 melange) per participant.
        // u2's credit fails after the expedition row, treasury deposit, and
        // u1's credit are durable; the error must name all three.
        let ledger = LedgerStore::new();
        let rate = ConversionRate::standard();
        let allocation = allocate(
            1000,
            10,
            &[
                ParticipantSpec::implicit("u1"),
                ParticipantSpec::implicit("u2"),
            ],
            rate,
        )
        .unwrap();
        let flaky = RefusingLedger {
            inner: &ledger,
            refused_user: "u2",
        };
        let seeded = vec![
            "expedition 7".to_string(),
            "treasury deposit of 100 sand".to_string(),
        ];

        let err = credit_participants(&flaky, 7, rate, &allocation, seeded).unwrap_err();
        match err {
            TrackerError::PartialFailure {
                operation,
                committed,
                ..
            } => {
                assert_eq!(operation, "split");
                assert_eq!(
                    committed,
                    vec![
                        "expedition 7",
                        "treasury deposit of 100 sand",
                        "deposit for u1",
                    ]
                );
            }
            other => panic!("expected partial failure, got {other}"),
        }
        // The credit that landed before the failure stands.
        assert_eq!(ledger.pending_for("u1"), 9);
        assert_eq!(ledger.pending_for("u2"), 0);
    }

    #[test]
    fn test_sand_to_next_melange_tracks_active_rate() {
        let tracker = SpiceTracker::new();
        assert_eq!(tracker.sand_to_next_melange(30), 20);
        tracker.set_bonus_active(true);
        assert_eq!(tracker.sand_to_next_melange(30), 8);
    }
}
