//! Configuration types
//!
//! Board-level constants for the scheduler: interrupt timing budgets and
//! which pins may carry a waveform.

pub mod pins;
pub mod timing;

pub use pins::*;
pub use timing::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Complete scheduler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeneratorConfig {
    /// Interrupt timing budgets
    pub timing: TimingConfig,
    /// Controllable and reserved pins
    pub pins: PinConfig,
}

impl GeneratorConfig {
    /// ESP8266 defaults: 80 MHz nominal clock, GPIO0-16, flash pins reserved
    pub const ESP8266: Self = Self {
        timing: TimingConfig::ESP8266,
        pins: PinConfig::ESP8266,
    };
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::ESP8266
    }
}
