//! Interrupt timing configuration
//!
//! Budgets are given in microseconds and converted to cycles at the
//! nominal CPU clock, the clock that callers express waveform lengths in.
//! The interrupt rescales them to the running clock with [`TimingConfig::budgets`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timing budgets for the timer interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingConfig {
    /// CPU clock that caller cycle counts are expressed in (Hz)
    pub nominal_cpu_hz: u32,
    /// Longest allowed gap between two firings (µs)
    pub max_irq_interval_us: u32,
    /// Longest a single firing may keep servicing edges (µs)
    pub isr_budget_us: u32,
    /// Shortest delay between re-arming the timer and its firing (µs)
    pub irq_latency_us: u32,
    /// Time from timer expiry until the handler's first instruction (µs)
    pub irq_entry_us: u32,
}

impl TimingConfig {
    /// ESP8266 TIMER1 budgets at an 80 MHz nominal clock
    ///
    /// TIMER1 counts at most 2^23 ticks, so the interval stays at 10 ms.
    pub const ESP8266: Self = Self {
        nominal_cpu_hz: 80_000_000,
        max_irq_interval_us: 10_000,
        isr_budget_us: 18,
        irq_latency_us: 2,
        irq_entry_us: 2,
    };

    /// Convert microseconds to nominal CPU cycles, saturating
    pub const fn us_to_cycles(&self, us: u32) -> u32 {
        let cycles = us as u64 * self.nominal_cpu_hz as u64 / 1_000_000;
        if cycles > u32::MAX as u64 {
            u32::MAX
        } else {
            cycles as u32
        }
    }

    /// Longest gap between firings, in cycles
    pub const fn max_irq_ccys(&self) -> u32 {
        self.us_to_cycles(self.max_irq_interval_us)
    }

    /// Per-firing servicing budget, in cycles
    pub const fn isr_budget_ccys(&self) -> u32 {
        self.us_to_cycles(self.isr_budget_us)
    }

    /// Minimum re-arm latency, in cycles
    pub const fn irq_latency_ccys(&self) -> u32 {
        self.us_to_cycles(self.irq_latency_us)
    }

    /// Interrupt entry delay, in cycles
    pub const fn irq_entry_ccys(&self) -> u32 {
        self.us_to_cycles(self.irq_entry_us)
    }

    /// Scale between the nominal clock and the current CPU clock
    pub fn clock_scale(&self, cpu_hz: u32) -> ClockScale {
        ClockScale::new(cpu_hz, self.nominal_cpu_hz)
    }

    /// Budgets in cycles of the clock the CPU is running at now
    pub fn budgets(&self, cpu_hz: u32) -> IrqBudgets {
        let scale = self.clock_scale(cpu_hz);
        let at_runtime = |ccys: u32| scale.apply(ccys.min(i32::MAX as u32) as i32) as u32;
        IrqBudgets {
            max_irq_ccys: at_runtime(self.max_irq_ccys()),
            isr_budget_ccys: at_runtime(self.isr_budget_ccys()),
            irq_latency_ccys: at_runtime(self.irq_latency_ccys()),
            irq_entry_ccys: at_runtime(self.irq_entry_ccys()),
        }
    }
}

/// Interrupt budgets converted at the running CPU clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqBudgets {
    /// Longest gap between firings
    pub max_irq_ccys: u32,
    /// Per-firing servicing budget
    pub isr_budget_ccys: u32,
    /// Minimum re-arm latency
    pub irq_latency_ccys: u32,
    /// Interrupt entry delay
    pub irq_entry_ccys: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::ESP8266
    }
}

/// Integer ratio between the running CPU clock and the nominal clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockScale {
    /// Running at the nominal clock
    Unity,
    /// Running this many times faster than nominal
    Up(u32),
    /// Running this many times slower than nominal
    Down(u32),
}

impl ClockScale {
    /// Derive the scale from the current and nominal clock rates
    pub fn new(cpu_hz: u32, nominal_hz: u32) -> Self {
        if nominal_hz == 0 || cpu_hz == 0 || cpu_hz == nominal_hz {
            ClockScale::Unity
        } else if cpu_hz > nominal_hz {
            ClockScale::Up(cpu_hz / nominal_hz)
        } else {
            ClockScale::Down(nominal_hz / cpu_hz)
        }
    }

    /// Convert a nominal cycle count to current CPU cycles
    ///
    /// Saturates rather than wrapping, so a long period never turns
    /// negative at a higher clock.
    #[inline]
    pub fn apply(self, ccys: i32) -> i32 {
        match self {
            ClockScale::Unity => ccys,
            ClockScale::Up(n) => ccys.saturating_mul(n.min(i32::MAX as u32) as i32),
            ClockScale::Down(n) => ccys / n as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_esp8266_cycle_budgets() {
        let t = TimingConfig::ESP8266;
        assert_eq!(t.max_irq_ccys(), 800_000);
        assert_eq!(t.isr_budget_ccys(), 1_440);
        assert_eq!(t.irq_latency_ccys(), 160);
        assert_eq!(t.irq_entry_ccys(), 160);
    }

    #[test]
    fn test_us_to_cycles_saturates() {
        let t = TimingConfig::ESP8266;
        assert_eq!(t.us_to_cycles(1), 80);
        assert_eq!(t.us_to_cycles(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_clock_scale() {
        assert_eq!(ClockScale::new(80_000_000, 80_000_000), ClockScale::Unity);
        assert_eq!(ClockScale::new(160_000_000, 80_000_000), ClockScale::Up(2));
        assert_eq!(ClockScale::new(80_000_000, 160_000_000), ClockScale::Down(2));

        assert_eq!(ClockScale::Up(2).apply(1000), 2000);
        assert_eq!(ClockScale::Down(2).apply(1000), 500);
        assert_eq!(ClockScale::Unity.apply(-7), -7);
    }

    #[test]
    fn test_clock_scale_saturates() {
        assert_eq!(ClockScale::Up(2).apply(i32::MAX - 5), i32::MAX);
        assert_eq!(ClockScale::Up(2).apply(i32::MIN + 5), i32::MIN);
        assert_eq!(ClockScale::Up(u32::MAX).apply(3), i32::MAX);
        assert!(ClockScale::Up(2).apply(1_500_000_000) > 0);
    }

    #[test]
    fn test_budgets_follow_cpu_clock() {
        let t = TimingConfig::ESP8266;
        assert_eq!(
            t.budgets(80_000_000),
            IrqBudgets {
                max_irq_ccys: 800_000,
                isr_budget_ccys: 1_440,
                irq_latency_ccys: 160,
                irq_entry_ccys: 160,
            }
        );

        // Same microseconds at twice the clock
        let fast = t.budgets(160_000_000);
        assert_eq!(fast.max_irq_ccys, 1_600_000);
        assert_eq!(fast.isr_budget_ccys, 2_880);
        assert_eq!(fast.irq_latency_ccys, 320);
        assert_eq!(fast.irq_entry_ccys, 320);

        assert_eq!(t.budgets(40_000_000).irq_latency_ccys, 80);
    }
}
