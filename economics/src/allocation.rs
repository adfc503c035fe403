//! Expedition allocation
//!
//! Pure computation: splits one sand total among a treasury cut, explicit-
//! percentage participants, and an equal split of the residual among the
//! rest. All shares use floor division and each participant's melange is
//! converted independently, so the summed melange can fall short of a single
//! conversion of the combined total. That divergence is intended and covered
//! by tests. Nothing here touches shared state; persistence belongs to the
//! caller.

use serde::{Deserialize, Serialize};
use spice_core::{Result, TrackerError};

use crate::conversion::ConversionRate;

/// One requested participant: an id plus an optional explicit percentage of
/// the post-treasury pool. Participants without a percentage split the
/// residual equally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantSpec {
    pub user_id: String,
    pub percent: Option<u8>,
}

impl ParticipantSpec {
    pub fn explicit(user_id: impl Into<String>, percent: u8) -> Self {
        Self {
            user_id: user_id.into(),
            percent: Some(percent),
        }
    }

    pub fn implicit(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            percent: None,
        }
    }
}

/// One computed share. `melange_share` is floor(sand_share / rate) for this
/// participant alone; `leftover_sand` is the conversion remainder, reported
/// but not redistributed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantShare {
    pub user_id: String,
    pub sand_share: u64,
    pub melange_share: u64,
    pub leftover_sand: u64,
    /// The explicit percentage this participant supplied, if any.
    pub percent: Option<u8>,
}

/// Full result of one allocation. Conservation invariant:
/// `treasury_sand + sum(sand_share) + unallocated_sand == total_sand`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub treasury_sand: u64,
    pub treasury_melange: u64,
    /// Residual sand that floor division could not hand to any implicit
    /// participant (or the whole residual when every participant is
    /// explicit). Disposition is the caller's decision.
    pub unallocated_sand: u64,
    pub shares: Vec<ParticipantShare>,
}

impl Allocation {
    /// Combined sand handed to participants.
    pub fn participant_sand(&self) -> u64 {
        self.shares.iter().map(|s| s.sand_share).sum()
    }

    /// Combined melange earned by participants.
    pub fn participant_melange(&self) -> u64 {
        self.shares.iter().map(|s| s.melange_share).sum()
    }
}

/// Split `total_sand` among `participants` with `treasury_percent` withheld
/// first, converting each share at `rate`.
///
/// Rejects the whole call, before computing anything, when the total is
/// zero, the treasury percentage or any explicit percentage exceeds 100,
/// the explicit percentages sum past 100, or the participant list is empty.
/// Participants are processed in caller order.
pub fn allocate(
    total_sand: u64,
    treasury_percent: u8,
    participants: &[ParticipantSpec],
    rate: ConversionRate,
) -> Result<Allocation> {
    if total_sand == 0 {
        return Err(TrackerError::invalid_input(
            "total_sand",
            "total sand must be at least 1",
        ));
    }
    if treasury_percent > 100 {
        return Err(TrackerError::invalid_input(
            "treasury_percent",
            format!("{treasury_percent}% is out of range 0-100"),
        ));
    }
    if participants.is_empty() {
        return Err(TrackerError::invalid_input(
            "participants",
            "an expedition needs at least one participant",
        ));
    }

    let mut explicit_total: u64 = 0;
    for spec in participants {
        if let Some(percent) = spec.percent {
            if percent > 100 {
                return Err(TrackerError::invalid_input(
                    "percent",
                    format!("{percent}% for {} is out of range 0-100", spec.user_id),
                ));
            }
            explicit_total += percent as u64;
        }
    }
    if explicit_total > 100 {
        return Err(TrackerError::invalid_input(
            "percent",
            format!("explicit percentages sum to {explicit_total}%, exceeding 100%"),
        ));
    }

    let treasury_sand = (total_sand as u128 * treasury_percent as u128 / 100) as u64;
    let treasury_melange = rate.convert(treasury_sand).melange;
    let remaining_sand = total_sand - treasury_sand;

    // Explicit shares first, each a floor cut of the post-treasury pool.
    let mut residual = remaining_sand;
    let mut explicit_sand = Vec::with_capacity(participants.len());
    let implicit_count = participants.iter().filter(|s| s.percent.is_none()).count() as u64;
    for spec in participants {
        if let Some(percent) = spec.percent {
            let sand = (remaining_sand as u128 * percent as u128 / 100) as u64;
            residual -= sand;
            explicit_sand.push(Some(sand));
        } else {
            explicit_sand.push(None);
        }
    }

    // Equal split of the residual among implicit participants. Floor
    // division leaves any leftover unallocated rather than handing extra
    // units to whoever happens to come first.
    let implicit_share = if implicit_count > 0 {
        residual / implicit_count
    } else {
        0
    };
    let unallocated_sand = residual - implicit_share * implicit_count;

    let shares = participants
        .iter()
        .zip(explicit_sand)
        .map(|(spec, sand)| {
            let sand_share = sand.unwrap_or(implicit_share);
            let conv = rate.convert(sand_share);
            ParticipantShare {
                user_id: spec.user_id.clone(),
                sand_share,
                melange_share: conv.melange,
                leftover_sand: conv.leftover_sand,
                percent: spec.percent,
            }
        })
        .collect();

    Ok(Allocation {
        treasury_sand,
        treasury_melange,
        unallocated_sand,
        shares,
    })
}
