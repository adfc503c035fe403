//! Expedition log
//!
//! Immutable records of group splits: the header captures the totals, the
//! treasury percentage, and the conversion rate in effect when the split was
//! made, so historical expeditions stay reproducible after a rate change.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use economics::{Allocation, ConversionRate};
use spice_core::{Result, TrackerError};

/// One participant row. `percent` is set only when the participant supplied
/// an explicit share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpeditionParticipant {
    pub user_id: String,
    pub sand_share: u64,
    pub melange_share: u64,
    pub leftover_sand: u64,
    pub percent: Option<u8>,
}

/// One expedition header plus its participant rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expedition {
    pub id: u64,
    pub initiator_id: String,
    pub total_sand: u64,
    pub treasury_percent: u8,
    pub treasury_sand: u64,
    /// Sand the equal split could not hand out; banked to the treasury by
    /// the split operation.
    pub unallocated_sand: u64,
    /// Rate captured at creation time, not the live global rate.
    pub rate: ConversionRate,
    pub participants: Vec<ExpeditionParticipant>,
    pub created_at: DateTime<Utc>,
}

/// Append-only expedition history.
pub struct ExpeditionLog {
    expeditions: RwLock<Vec<Expedition>>,
    next_id: AtomicU64,
}

impl ExpeditionLog {
    pub fn new() -> Self {
        Self {
            expeditions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Record a computed allocation as an immutable expedition. Returns the
    /// new expedition id.
    pub fn record(
        &self,
        initiator_id: &str,
        total_sand: u64,
        treasury_percent: u8,
        rate: ConversionRate,
        allocation: &Allocation,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let expedition = Expedition {
            id,
            initiator_id: initiator_id.to_string(),
            total_sand,
            treasury_percent,
            treasury_sand: allocation.treasury_sand,
            unallocated_sand: allocation.unallocated_sand,
            rate,
            participants: allocation
                .shares
                .iter()
                .map(|share| ExpeditionParticipant {
                    user_id: share.user_id.clone(),
                    sand_share: share.sand_share,
                    melange_share: share.melange_share,
                    leftover_sand: share.leftover_sand,
                    percent: share.percent,
                })
                .collect(),
            created_at: Utc::now(),
        };
        self.expeditions.write().push(expedition);
        id
    }

    pub fn get(&self, id: u64) -> Result<Expedition> {
        self.expeditions
            .read()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(TrackerError::UnknownExpedition(id))
    }

    pub fn count(&self) -> usize {
        self.expeditions.read().len()
    }

    pub fn clear(&self) {
        self.expeditions.write().clear();
    }

    pub fn snapshot(&self) -> Vec<Expedition> {
        self.expeditions.read().clone()
    }

    pub fn restore(expeditions: Vec<Expedition>) -> Self {
        let next = expeditions.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        Self {
            expeditions: RwLock::new(expeditions),
            next_id: AtomicU64::new(next),
        }
    }
}

impl Default for ExpeditionLog {
    fn default() -> Self {
        Self::new()
    }
}
