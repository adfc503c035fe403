//! Mutable tracker configuration
//!
//! Holds the conversion policy behind a lock. Operations never read the
//! config mid-flight; they capture a rate snapshot up front so a concurrent
//! admin change cannot split one operation across two rates.

use parking_lot::RwLock;

use economics::{ConversionConfig, ConversionRate};
use spice_core::Result;

pub struct TrackerConfig {
    conversion: RwLock<ConversionConfig>,
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self {
            conversion: RwLock::new(ConversionConfig::default()),
        }
    }

    /// The rate new operations should capture right now.
    pub fn active_rate(&self) -> ConversionRate {
        self.conversion.read().active_rate()
    }

    pub fn conversion(&self) -> ConversionConfig {
        *self.conversion.read()
    }

    /// Replace the standard sand-per-melange ratio. Zero is rejected here,
    /// at the boundary, so stores never see an invalid rate.
    pub fn set_standard_ratio(&self, sand_per_melange: u64) -> Result<()> {
        let rate = ConversionRate::from_whole(sand_per_melange)?;
        self.conversion.write().standard = rate;
        Ok(())
    }

    /// Toggle the bonus rate. Applies to subsequent conversions only;
    /// historical records keep the rate they captured.
    pub fn set_bonus_active(&self, active: bool) {
        self.conversion.write().bonus_active = active;
    }

    pub fn restore(config: ConversionConfig) -> Self {
        Self {
            conversion: RwLock::new(config),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new()
    }
}
