//! Waveform descriptors and requests
//!
//! One [`Descriptor`] per controllable pin holds the live timing of that
//! pin's waveform. [`WaveformRequest`] is what callers hand to the gateway.

pub mod descriptor;
pub mod mode;
pub mod request;

pub use descriptor::Descriptor;
pub use mode::Mode;
pub use request::{Normalized, WaveformRequest};

/// Errors from gateway operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaveformError {
    /// Pin number outside the controllable range
    InvalidPin,
    /// Pin reserved for another hardware function
    ReservedPin,
    /// Phase-alignment target outside the controllable range
    InvalidAlignPin,
    /// High plus low time is not a positive period
    InvalidPeriod,
    /// Stop requested before the timer was ever started
    TimerNotRunning,
}

impl core::fmt::Display for WaveformError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            WaveformError::InvalidPin => "pin out of range",
            WaveformError::ReservedPin => "pin reserved for another function",
            WaveformError::InvalidAlignPin => "alignment pin out of range",
            WaveformError::InvalidPeriod => "period must be positive",
            WaveformError::TimerNotRunning => "waveform timer not running",
        };
        f.write_str(msg)
    }
}
