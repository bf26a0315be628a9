//! Timer interrupt service routine
//!
//! Runs at the highest interrupt priority and blocks everything else on
//! the core, so each firing is bounded: edges are batched only while the
//! nearest deadline is within the servicing budget measured from the
//! firing's start. Nothing in here logs.

use core::sync::atomic::Ordering;

use wavegen_hal::Platform;

use crate::config::{ClockScale, IrqBudgets};
use crate::generator::timer::TickScale;
use crate::generator::Generator;
use crate::waveform::Mode;

impl<P: Platform> Generator<P> {
    /// Service one timer firing
    pub fn service(&self) {
        let hw = &self.platform;
        let isr_start = hw.cycle_count();

        self.guard.repair(hw);

        let timing = &self.config.timing;
        let cpu_hz = hw.cpu_hz();
        let scale = timing.clock_scale(cpu_hz);
        let budgets = timing.budgets(cpu_hz);
        let st = &self.state;

        let to_set = st.pending_set.load(Ordering::Acquire);
        let to_clear = st.pending_clear.load(Ordering::Acquire);
        let mut enabled = st.enabled.load(Ordering::Relaxed);
        let mut states = st.states.load(Ordering::Relaxed);

        if (to_set != 0 && enabled & to_set == 0) || to_clear != 0 {
            enabled = (enabled & !to_clear) | to_set;
            states = self.idle_pins(states, to_clear);
            st.enabled.store(enabled, Ordering::Release);
            st.states.store(states, Ordering::Release);
            st.pending_clear.store(0, Ordering::Release);
        }

        if to_set != 0 {
            let pin = to_set.trailing_zeros() as usize;
            self.apply_transition(pin, enabled, &mut states, scale);
            st.states.store(states, Ordering::Release);
            st.pending_set.store(0, Ordering::Release);
        }

        let isr_timeout_ccy = isr_start.wrapping_add(budgets.isr_budget_ccys);
        let irq_latency_ccys = budgets.irq_latency_ccys as i32;
        let mut busy_pins = enabled;
        let mut next_event_ccy = isr_start.wrapping_add(budgets.max_irq_ccys);

        let mut now = hw.cycle_count();
        let mut isr_next_event_ccy = now;
        while busy_pins != 0 {
            // Leave once the nearest deadline is worth a separate firing
            if isr_next_event_ccy.wrapping_sub(now) as i32 > irq_latency_ccys {
                next_event_ccy = isr_next_event_ccy;
                break;
            }
            isr_next_event_ccy = next_event_ccy;

            let mut loop_pins = busy_pins;
            while loop_pins != 0 {
                let pin = loop_pins.trailing_zeros() as usize;
                let pin_bit = 1u32 << pin;
                loop_pins ^= pin_bit;

                let wave = &st.pins[pin];
                let is_high = states & pin_bit != 0;
                let mut wave_next_ccy = if is_high {
                    wave.end_duty_ccy()
                } else {
                    wave.next_period_ccy()
                };

                let expires = wave.mode() == Mode::Expires;
                if expires
                    && wave_next_ccy.wrapping_sub(wave.expiry_ccy()) as i32 >= 0
                    && now.wrapping_sub(wave.expiry_ccy()) as i32 >= 0
                {
                    // Lifetime over: the slot goes inert
                    enabled ^= pin_bit;
                    busy_pins ^= pin_bit;
                    states = self.idle_pins(states, pin_bit);
                } else {
                    let overshoot_ccys = now.wrapping_sub(wave_next_ccy) as i32;
                    if overshoot_ccys >= 0 {
                        let period_ccys = scale.apply(wave.period_ccys());
                        if is_high {
                            if wave.period_ccys() == wave.duty_ccys() {
                                // 100% duty never goes low
                                let next_period = wave.next_period_ccy().wrapping_add(period_ccys as u32);
                                wave.set_next_period_ccy(next_period);
                                wave.set_end_duty_ccy(next_period);
                            } else {
                                if wave.auto_pwm() {
                                    let adj = wave
                                        .adj_duty_ccys()
                                        .saturating_add(overshoot_ccys)
                                        .min(period_ccys);
                                    wave.set_adj_duty_ccys(adj);
                                }
                                states ^= pin_bit;
                                hw.set_low(pin as u8);
                            }
                            wave_next_ccy = wave.next_period_ccy();
                        } else {
                            let next_period = wave.next_period_ccy().wrapping_add(period_ccys as u32);
                            wave.set_next_period_ccy(next_period);
                            if wave.duty_ccys() == 0 {
                                wave.set_end_duty_ccy(next_period);
                            } else {
                                let (duty_ccys, adj) =
                                    corrected_duty(scale.apply(wave.duty_ccys()), wave.adj_duty_ccys());
                                wave.set_adj_duty_ccys(adj);
                                let mut end_duty = now.wrapping_add(duty_ccys as u32);
                                if end_duty.wrapping_sub(next_period) as i32 > 0 {
                                    end_duty = next_period;
                                }
                                wave.set_end_duty_ccy(end_duty);
                                states |= pin_bit;
                                hw.set_high(pin as u8);
                            }
                            wave_next_ccy = wave.end_duty_ccy();
                        }

                        if expires && wave_next_ccy.wrapping_sub(wave.expiry_ccy()) as i32 > 0 {
                            wave_next_ccy = wave.expiry_ccy();
                        }
                    }

                    if wave_next_ccy.wrapping_sub(isr_timeout_ccy) as i32 >= 0 {
                        // Beyond this firing's budget: leave it to the timer
                        busy_pins ^= pin_bit;
                        if next_event_ccy.wrapping_sub(wave_next_ccy) as i32 > 0 {
                            next_event_ccy = wave_next_ccy;
                        }
                    } else if isr_next_event_ccy.wrapping_sub(wave_next_ccy) as i32 > 0 {
                        isr_next_event_ccy = wave_next_ccy;
                    }
                }
                now = hw.cycle_count();
            }
        }

        st.enabled.store(enabled, Ordering::Release);
        st.states.store(states, Ordering::Release);

        self.rearm(next_event_ccy, scale, budgets);
    }

    /// Fold in the secondary callback and program the next firing
    fn rearm(&self, mut next_event_ccy: u32, scale: ClockScale, budgets: IrqBudgets) {
        let hw = &self.platform;

        let callback = self.state.callback.load();
        let mut callback_ccys = 0;
        if let Some(callback) = callback {
            callback_ccys = scale.apply(callback().min(i32::MAX as u32) as i32);
        }

        let now = hw.cycle_count();
        let mut next_event_ccys = next_event_ccy.wrapping_sub(now) as i32;
        // The callback may only pull the wake time earlier
        if callback.is_some() && next_event_ccys > callback_ccys {
            next_event_ccy = now.wrapping_add(callback_ccys as u32);
            next_event_ccys = callback_ccys;
        }

        let ticks = TickScale::new(hw.cpu_hz(), hw.tick_hz());
        let irq_latency_ccys = budgets.irq_latency_ccys as i32;
        let irq_entry_ccys = budgets.irq_entry_ccys as i32;
        let irq_latency_ticks = ticks.to_ticks(irq_latency_ccys);
        let irq_entry_ticks = ticks.to_ticks(irq_entry_ccys);
        let mut next_event_ticks = ticks.to_ticks(next_event_ccys);

        // Firing any sooner would re-enter before this one has returned
        if next_event_ticks < irq_latency_ticks + irq_entry_ticks {
            next_event_ccy = now.wrapping_add((irq_latency_ccys + irq_entry_ccys) as u32);
            next_event_ticks = irq_latency_ticks;
        } else {
            next_event_ticks -= irq_entry_ticks;
        }

        self.state.next_event_ccy.store(next_event_ccy, Ordering::Relaxed);
        hw.write(next_event_ticks as u32);
    }

    /// Drive the given pins low and clear them from `states`
    fn idle_pins(&self, states: u32, pins: u32) -> u32 {
        let mut high = states & pins;
        while high != 0 {
            let pin = high.trailing_zeros();
            high ^= 1 << pin;
            self.platform.set_low(pin as u8);
        }
        states & !pins
    }
}

/// Take accumulated overshoot out of this period's on-time
///
/// Returns the on-time to use and the correction left over. When the
/// correction is at least the whole duty, half the duty is paid back and
/// the rest carried to later periods.
pub fn corrected_duty(duty_ccys: i32, adj_duty_ccys: i32) -> (i32, i32) {
    if duty_ccys <= adj_duty_ccys {
        let duty = duty_ccys >> 1;
        (duty, adj_duty_ccys - duty)
    } else if adj_duty_ccys != 0 {
        (duty_ccys - adj_duty_ccys, 0)
    } else {
        (duty_ccys, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_correction() {
        assert_eq!(corrected_duty(1000, 0), (1000, 0));
    }

    #[test]
    fn test_small_correction_applied_outright() {
        assert_eq!(corrected_duty(1000, 120), (880, 0));
    }

    #[test]
    fn test_large_correction_halves_duty() {
        assert_eq!(corrected_duty(1000, 1000), (500, 500));
        assert_eq!(corrected_duty(1000, 3000), (500, 2500));
    }

    #[test]
    fn test_correction_drains_over_periods() {
        let mut adj = 2500;
        let mut periods = 0;
        while adj != 0 {
            let (_, left) = corrected_duty(1000, adj);
            adj = left;
            periods += 1;
        }
        // 500 paid per period until under the duty, then the remainder at once
        assert_eq!(periods, 5);
    }
}
