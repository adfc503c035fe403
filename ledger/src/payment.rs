//! Payroll processing
//!
//! Single payments settle a user's pending melange; bulk payroll runs the
//! single-user path once per user as independent atomic operations. A
//! failure for one user never rolls back payments already made to others;
//! failures are collected into the report instead.

use tracing::{info, warn};

use spice_core::{Result, TrackerError, UserAccount};

use crate::store::LedgerStore;

/// The ledger surface payroll needs. Seam for exercising failure isolation.
pub trait PayoutLedger {
    fn users_with_pending(&self) -> Vec<UserAccount>;
    fn pending_for(&self, user_id: &str) -> u64;
    fn mark_paid(&self, user_id: &str, amount: u64) -> Result<()>;
}

impl PayoutLedger for LedgerStore {
    fn users_with_pending(&self) -> Vec<UserAccount> {
        LedgerStore::users_with_pending(self)
    }

    fn pending_for(&self, user_id: &str) -> u64 {
        LedgerStore::pending_for(self, user_id)
    }

    fn mark_paid(&self, user_id: &str, amount: u64) -> Result<()> {
        LedgerStore::mark_paid(self, user_id, amount)
    }
}

/// One failed payroll entry. The user's pending balance is unchanged.
#[derive(Debug)]
pub struct PayrollFailure {
    pub user_id: String,
    pub error: TrackerError,
}

/// Outcome of a bulk payroll run.
#[derive(Debug, Default)]
pub struct PayrollReport {
    /// `(user_id, melange paid)` for every settled user.
    pub payments: Vec<(String, u64)>,
    pub failures: Vec<PayrollFailure>,
}

impl PayrollReport {
    pub fn total_paid(&self) -> u64 {
        self.payments.iter().map(|(_, amount)| amount).sum()
    }
}

pub struct PaymentProcessor;

impl PaymentProcessor {
    /// Pay a user. With `amount` omitted the full pending balance is paid
    /// (zero pending pays zero); an explicit amount above pending fails with
    /// an insufficient-balance error rather than being clamped.
    pub fn pay_user(
        ledger: &impl PayoutLedger,
        user_id: &str,
        amount: Option<u64>,
    ) -> Result<u64> {
        let pending = ledger.pending_for(user_id);
        let to_pay = match amount {
            None => pending,
            Some(requested) => {
                if requested > pending {
                    return Err(TrackerError::InsufficientBalance {
                        entity: "pending melange",
                        requested,
                        available: pending,
                    });
                }
                requested
            }
        };
        if to_pay == 0 {
            return Ok(0);
        }
        ledger.mark_paid(user_id, to_pay)?;
        Ok(to_pay)
    }

    /// Pay every user with a positive pending balance. Each payment is its
    /// own atomic operation; completed payments stand even when a later one
    /// fails.
    pub fn pay_all(ledger: &impl PayoutLedger) -> PayrollReport {
        let mut report = PayrollReport::default();
        for account in ledger.users_with_pending() {
            match Self::pay_user(ledger, &account.user_id, None) {
                Ok(0) => {}
                Ok(paid) => report.payments.push((account.user_id, paid)),
                Err(error) => {
                    warn!(user_id = %account.user_id, %error, "payroll entry failed");
                    report.failures.push(PayrollFailure {
                        user_id: account.user_id,
                        error,
                    });
                }
            }
        }
        info!(
            users_paid = report.payments.len(),
            total_paid = report.total_paid(),
            failures = report.failures.len(),
            "payroll complete"
        );
        report
    }
}
