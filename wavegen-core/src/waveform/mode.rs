//! Per-pin scheduling mode
//!
//! The mode tells the interrupt what to do with a pin on the firing that
//! picks up its pending request. `Init`, `UpdateExpiry` and `UpdatePhase`
//! are transient; `Infinite` and `Expires` are where every pin settles.

/// Scheduling mode of one waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    /// Runs until stopped
    Infinite = 0,
    /// Runs until its absolute expiry cycle
    Expires = 1,
    /// Expiry field holds a relative duration to convert
    UpdateExpiry = 2,
    /// Period boundary must be realigned to the reference pin
    UpdatePhase = 3,
    /// Freshly started, first period not yet placed
    Init = 4,
}

impl Mode {
    /// Get the mode as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a mode from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Mode::Infinite),
            1 => Some(Mode::Expires),
            2 => Some(Mode::UpdateExpiry),
            3 => Some(Mode::UpdatePhase),
            4 => Some(Mode::Init),
            _ => None,
        }
    }

    /// Check if the interrupt has nothing left to apply for this mode
    pub fn is_settled(&self) -> bool {
        matches!(self, Mode::Infinite | Mode::Expires)
    }
}
