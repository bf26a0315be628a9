//! Pin configuration
//!
//! Waveform state is tracked in 32-bit masks, so at most [`MAX_PINS`] pins
//! can be controlled.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Upper bound on controllable pins (one bit each in the schedule masks)
pub const MAX_PINS: usize = 32;

/// Which pins the scheduler may drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// Number of controllable pins, numbered from 0
    pub pin_count: u8,
    /// Bitmask of pins reserved for another hardware function
    pub reserved: u32,
}

impl PinConfig {
    /// ESP8266: GPIO0-16, with GPIO6-11 wired to the SPI flash
    pub const ESP8266: Self = Self::new(17, 0b0000_1111_1100_0000);

    /// Create a pin config, capping `pin_count` at [`MAX_PINS`]
    pub const fn new(pin_count: u8, reserved: u32) -> Self {
        let pin_count = if pin_count as usize > MAX_PINS {
            MAX_PINS as u8
        } else {
            pin_count
        };
        Self {
            pin_count,
            reserved,
        }
    }

    /// Check if a pin number is in the controllable range
    pub const fn contains(&self, pin: u8) -> bool {
        pin < self.pin_count
    }

    /// Check if a pin is reserved for another hardware function
    pub const fn is_reserved(&self, pin: u8) -> bool {
        (pin as usize) < MAX_PINS && self.reserved & (1 << pin) != 0
    }
}

impl Default for PinConfig {
    fn default() -> Self {
        Self::ESP8266
    }
}

/// Mask bit for a pin, or 0 for a pin outside the 32-bit masks
pub const fn pin_bit(pin: u8) -> u32 {
    if (pin as usize) < MAX_PINS {
        1 << pin
    } else {
        0
    }
}
