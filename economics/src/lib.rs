//! Spice Tracker Economics Module
//!
//! Implements the economic model including:
//! - Sand-to-melange conversion with remainder tracking
//! - The two-valued rate policy (standard rate, bonus rate)
//! - Expedition allocation: treasury cut, explicit percentages, equal split

pub mod allocation;
pub mod conversion;

pub use allocation::{allocate, Allocation, ParticipantShare, ParticipantSpec};
pub use conversion::{Conversion, ConversionConfig, ConversionRate};

/// Economic constants
pub mod constants {
    /// Standard conversion rate (50 sand = 1 melange)
    pub const STANDARD_SAND_PER_MELANGE: u64 = 50;

    /// Bonus conversion rate numerator (75 / 2 = 37.5 sand per melange)
    pub const BONUS_SAND_NUMER: u64 = 75;

    /// Bonus conversion rate denominator
    pub const BONUS_SAND_DENOM: u64 = 2;

    /// Default treasury cut on expedition splits (10%)
    pub const DEFAULT_TREASURY_PERCENT: u8 = 10;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_constants() {
        assert_eq!(constants::STANDARD_SAND_PER_MELANGE, 50);
        // 75 / 2 = 37.5 sand per melange under the bonus
        assert_eq!(constants::BONUS_SAND_NUMER, 75);
        assert_eq!(constants::BONUS_SAND_DENOM, 2);
        assert_eq!(constants::DEFAULT_TREASURY_PERCENT, 10);
    }
}
