//! Mode transitions for the pending pin
//!
//! Applied once per handoff, inside the interrupt, before any edges are
//! dispatched. Every transition settles the pin in `Infinite` or `Expires`.

use core::sync::atomic::Ordering;

use wavegen_hal::Platform;

use crate::config::ClockScale;
use crate::generator::Generator;
use crate::waveform::{Descriptor, Mode};

impl<P: Platform> Generator<P> {
    /// Advance the mode of the pin named by `pending_set`
    pub(crate) fn apply_transition(
        &self,
        pin: usize,
        enabled: u32,
        states: &mut u32,
        scale: ClockScale,
    ) {
        let st = &self.state;
        let Some(wave) = st.pins.get(pin) else {
            return;
        };

        let settled = match wave.mode() {
            Mode::Init => {
                *states &= !(1 << pin);
                let first_period = match st.reference_pin(enabled) {
                    Some(reference) => st.pins[reference]
                        .next_period_ccy()
                        .wrapping_add(self.scaled_phase_offset(scale)),
                    None => st.next_event_ccy.load(Ordering::Relaxed),
                };
                wave.set_next_period_ccy(first_period);
                if wave.expiry_ccy() == 0 {
                    Mode::Infinite
                } else {
                    place_expiry(wave, scale)
                }
            }
            Mode::UpdateExpiry => place_expiry(wave, scale),
            Mode::UpdatePhase => {
                if let Some(reference) = st.reference_pin(enabled) {
                    let target = st.pins[reference]
                        .next_period_ccy()
                        .wrapping_add(self.scaled_phase_offset(scale));
                    let period = scale.apply(wave.period_ccys());
                    let shift = phase_shift(target, wave.next_period_ccy(), period);
                    let next_period = wave.next_period_ccy().wrapping_add(shift as u32);
                    wave.set_next_period_ccy(next_period);
                    if wave.end_duty_ccy().wrapping_sub(next_period) as i32 > 0 {
                        wave.set_end_duty_ccy(next_period);
                    }
                }
                Mode::Infinite
            }
            settled @ (Mode::Infinite | Mode::Expires) => settled,
        };
        debug_assert!(settled.is_settled());
        wave.set_mode(settled);
    }

    fn scaled_phase_offset(&self, scale: ClockScale) -> u32 {
        scale.apply(self.state.phase_offset_ccys.load(Ordering::Relaxed) as i32) as u32
    }
}

/// Turn the relative duration held in `expiry_ccy` into an absolute cycle
fn place_expiry(wave: &Descriptor, scale: ClockScale) -> Mode {
    let duration = scale.apply(wave.expiry_ccy() as i32);
    wave.set_expiry_ccy(wave.next_period_ccy().wrapping_add(duration as u32));
    Mode::Expires
}

/// Shortest signed shift that moves `current` onto `target` modulo `period`
///
/// The result lies in `[-period/2, period/2)`.
pub fn phase_shift(target: u32, current: u32, period: i32) -> i32 {
    if period <= 0 {
        return 0;
    }
    let period = period as i64;
    let half = period / 2;
    let distance = target.wrapping_sub(current) as i32 as i64;
    ((distance + half).rem_euclid(period) - half) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_shift_zero_when_aligned() {
        assert_eq!(phase_shift(1000, 1000, 4000), 0);
        assert_eq!(phase_shift(5000, 1000, 4000), 0);
        assert_eq!(phase_shift(1000, 5000, 4000), 0);
    }

    #[test]
    fn test_shift_takes_short_way() {
        assert_eq!(phase_shift(2000, 1000, 4000), 1000);
        assert_eq!(phase_shift(1000, 2000, 4000), -1000);
        // Three quarters ahead is a quarter behind
        assert_eq!(phase_shift(4000, 1000, 4000), -1000);
    }

    #[test]
    fn test_shift_across_wrap() {
        let current = u32::MAX - 499;
        let target = 500;
        assert_eq!(phase_shift(target, current, 4000), 1000);
    }

    #[test]
    fn test_shift_degenerate_period() {
        assert_eq!(phase_shift(10, 0, 0), 0);
        assert_eq!(phase_shift(10, 0, -5), 0);
    }

    proptest! {
        #[test]
        fn prop_shift_lands_on_target_phase(
            current in any::<u32>(),
            offset in -(1i32 << 30)..(1i32 << 30),
            period in 2i32..1_000_000,
        ) {
            let target = current.wrapping_add(offset as u32);
            let shift = phase_shift(target, current, period);
            prop_assert!(shift >= -(period / 2) && shift < period - period / 2);
            let moved = current.wrapping_add(shift as u32);
            let residue = (target.wrapping_sub(moved) as i32 as i64).rem_euclid(period as i64);
            prop_assert_eq!(residue, 0);
        }
    }
}
