//! Waveform start requests
//!
//! Caller-facing description of a waveform, and the validation the gateway
//! runs before anything is staged.

use crate::config::{PinConfig, TimingConfig};

use super::WaveformError;

/// Parameters for starting or changing a waveform
///
/// All durations are in CPU cycles at the nominal clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WaveformRequest {
    /// Time spent high per period
    pub high_ccys: u32,
    /// Time spent low per period
    pub low_ccys: u32,
    /// Lifetime of the waveform (0 = until stopped)
    pub run_time_ccys: u32,
    /// Pin whose period boundary this waveform locks to
    pub align_to: Option<u8>,
    /// Offset from the reference pin's period boundary
    pub phase_offset_ccys: u32,
    /// Compensate on-time for late servicing
    pub auto_pwm: bool,
}

/// Validated duty and period, after zero-duty stretching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Normalized {
    /// On-time in cycles
    pub duty_ccys: u32,
    /// Period in cycles
    pub period_ccys: u32,
}

impl WaveformRequest {
    /// Free-running waveform with the given high and low times
    pub const fn new(high_ccys: u32, low_ccys: u32) -> Self {
        Self {
            high_ccys,
            low_ccys,
            run_time_ccys: 0,
            align_to: None,
            phase_offset_ccys: 0,
            auto_pwm: false,
        }
    }

    /// Build a request from microsecond timings
    pub const fn from_us(timing: &TimingConfig, high_us: u32, low_us: u32) -> Self {
        Self::new(timing.us_to_cycles(high_us), timing.us_to_cycles(low_us))
    }

    /// Stop the waveform by itself after `ccys` cycles
    pub const fn run_for(self, ccys: u32) -> Self {
        Self {
            run_time_ccys: ccys,
            ..self
        }
    }

    /// Lock the period boundary to `pin`, `offset_ccys` later
    pub const fn aligned_to(self, pin: u8, offset_ccys: u32) -> Self {
        Self {
            align_to: Some(pin),
            phase_offset_ccys: offset_ccys,
            ..self
        }
    }

    /// Enable or disable overshoot correction
    pub const fn auto_pwm(self, enabled: bool) -> Self {
        Self {
            auto_pwm: enabled,
            ..self
        }
    }

    /// Validate the request for `pin` and compute the effective timing
    ///
    /// A zero high or low half is stretched to the largest multiple of the
    /// period under `max_irq_ccys`, so a 0% or 100% waveform still wakes the
    /// interrupt at a bounded interval.
    pub fn normalize(
        &self,
        pin: u8,
        pins: &PinConfig,
        max_irq_ccys: u32,
    ) -> Result<Normalized, WaveformError> {
        if !pins.contains(pin) {
            return Err(WaveformError::InvalidPin);
        }
        if pins.is_reserved(pin) {
            return Err(WaveformError::ReservedPin);
        }
        if let Some(align) = self.align_to {
            if !pins.contains(align) {
                return Err(WaveformError::InvalidAlignPin);
            }
        }

        let mut duty = self.high_ccys;
        let mut period = self.high_ccys.wrapping_add(self.low_ccys);
        if (period as i32) <= 0 || (self.high_ccys as i32) < 0 || (self.low_ccys as i32) < 0 {
            return Err(WaveformError::InvalidPeriod);
        }

        if period < max_irq_ccys {
            if duty == 0 {
                period = (max_irq_ccys / period) * period;
            } else if self.low_ccys == 0 {
                period = (max_irq_ccys / period) * period;
                duty = period;
            }
        }

        Ok(Normalized {
            duty_ccys: duty,
            period_ccys: period,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MAX_IRQ: u32 = 800_000;

    fn pins() -> PinConfig {
        PinConfig::ESP8266
    }

    #[test]
    fn test_plain_request_unchanged() {
        let n = WaveformRequest::new(1000, 3000)
            .normalize(4, &pins(), MAX_IRQ)
            .unwrap();
        assert_eq!(n.duty_ccys, 1000);
        assert_eq!(n.period_ccys, 4000);
    }

    #[test]
    fn test_rejects_bad_pins() {
        let req = WaveformRequest::new(1000, 3000);
        assert_eq!(req.normalize(17, &pins(), MAX_IRQ), Err(WaveformError::InvalidPin));
        assert_eq!(req.normalize(6, &pins(), MAX_IRQ), Err(WaveformError::ReservedPin));
        assert_eq!(
            req.aligned_to(40, 0).normalize(4, &pins(), MAX_IRQ),
            Err(WaveformError::InvalidAlignPin)
        );
    }

    #[test]
    fn test_rejects_non_positive_period() {
        let pins = pins();
        assert_eq!(
            WaveformRequest::new(0, 0).normalize(4, &pins, MAX_IRQ),
            Err(WaveformError::InvalidPeriod)
        );
        assert_eq!(
            WaveformRequest::new(0x8000_0000, 0).normalize(4, &pins, MAX_IRQ),
            Err(WaveformError::InvalidPeriod)
        );
        assert_eq!(
            WaveformRequest::new(0x7000_0000, 0x7000_0000).normalize(4, &pins, MAX_IRQ),
            Err(WaveformError::InvalidPeriod)
        );
    }

    #[test]
    fn test_zero_duty_stretched() {
        let n = WaveformRequest::new(0, 3000)
            .normalize(4, &pins(), MAX_IRQ)
            .unwrap();
        assert_eq!(n.duty_ccys, 0);
        assert_eq!(n.period_ccys, 798_000);
    }

    #[test]
    fn test_full_duty_stretched() {
        let n = WaveformRequest::new(3000, 0)
            .normalize(4, &pins(), MAX_IRQ)
            .unwrap();
        assert_eq!(n.duty_ccys, 798_000);
        assert_eq!(n.period_ccys, 798_000);
    }

    #[test]
    fn test_builder() {
        let t = TimingConfig::ESP8266;
        let req = WaveformRequest::from_us(&t, 10, 40)
            .run_for(5)
            .aligned_to(2, 7)
            .auto_pwm(true);
        assert_eq!(req.high_ccys, 800);
        assert_eq!(req.low_ccys, 3200);
        assert_eq!(req.run_time_ccys, 5);
        assert_eq!(req.align_to, Some(2));
        assert_eq!(req.phase_offset_ccys, 7);
        assert!(req.auto_pwm);
    }

    proptest! {
        #[test]
        fn prop_normalized_period_is_positive(high in 0u32..0x4000_0000, low in 0u32..0x4000_0000) {
            match WaveformRequest::new(high, low).normalize(4, &pins(), MAX_IRQ) {
                Ok(n) => {
                    prop_assert!(n.period_ccys > 0);
                    prop_assert!(n.duty_ccys <= n.period_ccys);
                    prop_assert!((n.period_ccys as i32) > 0);
                }
                Err(e) => {
                    prop_assert_eq!(e, WaveformError::InvalidPeriod);
                    prop_assert_eq!(high, 0);
                    prop_assert_eq!(low, 0);
                }
            }
        }

        #[test]
        fn prop_stretch_keeps_multiple_of_period(half in 1u32..MAX_IRQ, zero_high in any::<bool>()) {
            let req = if zero_high {
                WaveformRequest::new(0, half)
            } else {
                WaveformRequest::new(half, 0)
            };
            let n = req.normalize(4, &pins(), MAX_IRQ).unwrap();
            prop_assert_eq!(n.period_ccys % half, 0);
            prop_assert!(n.period_ccys <= MAX_IRQ);
            prop_assert!(n.period_ccys > MAX_IRQ - half);
            if zero_high {
                prop_assert_eq!(n.duty_ccys, 0);
            } else {
                prop_assert_eq!(n.duty_ccys, n.period_ccys);
            }
        }
    }
}
