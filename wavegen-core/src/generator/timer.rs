//! Hardware timer adapter
//!
//! Attaches and detaches the interrupt, and converts cycle-domain delays
//! into ticks of the fixed-rate timer.

use core::sync::atomic::Ordering;

use wavegen_hal::Platform;

use super::Generator;

/// Ratio between CPU cycles and timer ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickScale {
    ccys_per_tick: i32,
}

impl TickScale {
    /// Derive the ratio from the CPU clock and the timer tick rate
    pub fn new(cpu_hz: u32, tick_hz: u32) -> Self {
        let ratio = if tick_hz == 0 { 1 } else { cpu_hz / tick_hz };
        Self {
            ccys_per_tick: ratio.clamp(1, i32::MAX as u32) as i32,
        }
    }

    /// Convert a cycle count to timer ticks
    #[inline]
    pub fn to_ticks(self, ccys: i32) -> i32 {
        ccys / self.ccys_per_tick
    }
}

impl<P: Platform> Generator<P> {
    /// Minimum re-arm delay in timer ticks
    pub(crate) fn latency_ticks(&self) -> u32 {
        let cpu_hz = self.platform.cpu_hz();
        let ticks = TickScale::new(cpu_hz, self.platform.tick_hz());
        let budgets = self.config.timing.budgets(cpu_hz);
        ticks.to_ticks(budgets.irq_latency_ccys as i32) as u32
    }

    /// Attach the interrupt and schedule a firing right away
    pub(crate) fn start_timer(&'static self)
    where
        P: 'static,
    {
        let hw = &self.platform;
        let budgets = self.config.timing.budgets(hw.cpu_hz());

        hw.disable();
        hw.detach();
        hw.attach(self);
        hw.enable();

        let first_event = hw
            .cycle_count()
            .wrapping_add(budgets.irq_latency_ccys)
            .wrapping_add(budgets.irq_entry_ccys);
        self.state.next_event_ccy.store(first_event, Ordering::Relaxed);
        self.state.timer_running.store(true, Ordering::Release);
        hw.write(self.latency_ticks());
        debug!("waveform timer attached");
    }

    /// Detach the interrupt and stop the timer
    pub(crate) fn stop_timer(&self) {
        let hw = &self.platform;
        hw.detach();
        hw.disable();
        self.state.timer_running.store(false, Ordering::Release);
        debug!("waveform timer detached");
    }

    /// Bring the next firing forward unless it is already imminent
    pub(crate) fn expedite_timer(&self) {
        let latency = self.latency_ticks();
        if self.platform.remaining() > latency {
            self.platform.write(latency);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_scale_unity() {
        let ticks = TickScale::new(80_000_000, 80_000_000);
        assert_eq!(ticks.to_ticks(1234), 1234);
    }

    #[test]
    fn test_tick_scale_double_clock() {
        let ticks = TickScale::new(160_000_000, 80_000_000);
        assert_eq!(ticks.to_ticks(1000), 500);
        assert_eq!(ticks.to_ticks(-1000), -500);
    }

    #[test]
    fn test_tick_scale_degenerate() {
        assert_eq!(TickScale::new(80_000_000, 0).to_ticks(10), 10);
        assert_eq!(TickScale::new(1, 80_000_000).to_ticks(10), 10);
    }
}
