//! Sand-to-melange conversion
//!
//! Rates are exact rationals (sand per melange as numerator/denominator) so
//! the 37.5-sand bonus rate stays in integer arithmetic. Each conversion is
//! computed independently from its own raw amount; the remainder is reported
//! to the caller but never carried forward as a stored balance.

use serde::{Deserialize, Serialize};
use spice_core::{Result, TrackerError};

use crate::constants;

/// Sand-per-melange rate as an exact rational. `numer / denom` sand buys
/// one melange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRate {
    numer: u64,
    denom: u64,
}

impl ConversionRate {
    /// Build a rate from a rational sand-per-melange value. Both parts must
    /// be positive; a zero rate is an invalid configuration.
    pub fn new(numer: u64, denom: u64) -> Result<Self> {
        if numer == 0 {
            return Err(TrackerError::invalid_input(
                "conversion_rate",
                "sand per melange must be positive",
            ));
        }
        if denom == 0 {
            return Err(TrackerError::invalid_input(
                "conversion_rate",
                "rate denominator must be positive",
            ));
        }
        Ok(Self { numer, denom })
    }

    /// Build a rate from a whole sand-per-melange value.
    pub fn from_whole(sand_per_melange: u64) -> Result<Self> {
        Self::new(sand_per_melange, 1)
    }

    /// The standard rate (50 sand = 1 melange).
    pub fn standard() -> Self {
        Self {
            numer: constants::STANDARD_SAND_PER_MELANGE,
            denom: 1,
        }
    }

    /// The bonus rate (37.5 sand = 1 melange).
    pub fn bonus() -> Self {
        Self {
            numer: constants::BONUS_SAND_NUMER,
            denom: constants::BONUS_SAND_DENOM,
        }
    }

    /// Convert a raw sand amount. `melange = floor(sand / rate)`; the
    /// leftover is whatever sand did not reach the next whole melange,
    /// floored to whole sand units.
    pub fn convert(&self, sand: u64) -> Conversion {
        let scaled = sand as u128 * self.denom as u128;
        let melange = (scaled / self.numer as u128) as u64;
        let leftover_scaled = scaled - melange as u128 * self.numer as u128;
        Conversion {
            melange,
            leftover_sand: (leftover_scaled / self.denom as u128) as u64,
        }
    }

    /// Sand still needed before the next whole melange would convert.
    /// Display-only; nothing in the ledger persists this.
    pub fn sand_to_next_melange(&self, sand: u64) -> u64 {
        let next = self.convert(sand).melange + 1;
        // ceil(next * numer / denom) - sand
        let needed = (next as u128 * self.numer as u128).div_ceil(self.denom as u128) as u64;
        needed.saturating_sub(sand)
    }

    pub fn numer(&self) -> u64 {
        self.numer
    }

    pub fn denom(&self) -> u64 {
        self.denom
    }
}

/// Result of converting one raw amount at one rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub melange: u64,
    /// Sand short of the next whole melange. Informational only.
    pub leftover_sand: u64,
}

/// The two-valued global rate policy. The bonus flag selects which rate new
/// operations capture; flipping it never rewrites historical records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub standard: ConversionRate,
    pub bonus: ConversionRate,
    pub bonus_active: bool,
}

impl ConversionConfig {
    /// The rate that new conversions should capture right now.
    pub fn active_rate(&self) -> ConversionRate {
        if self.bonus_active {
            self.bonus
        } else {
            self.standard
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            standard: ConversionRate::standard(),
            bonus: ConversionRate::bonus(),
            bonus_active: false,
        }
    }
}
