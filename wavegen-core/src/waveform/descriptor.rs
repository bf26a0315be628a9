//! Waveform descriptor
//!
//! Timing state for one pin. Ordinary code writes the duty/period fields
//! and stages transitions; only the interrupt advances the absolute
//! deadlines. Every field is an independent atomic, so the two contexts
//! never need a lock. Cross-field ordering comes from the fences around
//! each mailbox handoff.

use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU8, Ordering};

use super::mode::Mode;

/// Live timing state of one pin's waveform
#[derive(Debug)]
pub struct Descriptor {
    /// Cycle count when the current period begins (rising edge)
    next_period_ccy: AtomicU32,
    /// Cycle count of the high-to-low transition in the current period
    end_duty_ccy: AtomicU32,
    /// Nominal on-time in cycles
    duty_ccys: AtomicI32,
    /// Overshoot still to be taken out of a later on-time
    adj_duty_ccys: AtomicI32,
    /// Full period in cycles
    period_ccys: AtomicI32,
    /// Absolute stop cycle; a relative duration while `Init`/`UpdateExpiry`
    expiry_ccy: AtomicU32,
    /// Scheduling mode (see [`Mode`])
    mode: AtomicU8,
    /// Compensate on-time for late servicing
    auto_pwm: AtomicBool,
}

impl Default for Descriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Descriptor {
    /// Create an inert descriptor
    pub const fn new() -> Self {
        Self {
            next_period_ccy: AtomicU32::new(0),
            end_duty_ccy: AtomicU32::new(0),
            duty_ccys: AtomicI32::new(0),
            adj_duty_ccys: AtomicI32::new(0),
            period_ccys: AtomicI32::new(0),
            expiry_ccy: AtomicU32::new(0),
            mode: AtomicU8::new(Mode::Infinite as u8),
            auto_pwm: AtomicBool::new(false),
        }
    }

    /// Cycle count of the next period boundary
    pub fn next_period_ccy(&self) -> u32 {
        self.next_period_ccy.load(Ordering::Relaxed)
    }

    pub(crate) fn set_next_period_ccy(&self, ccy: u32) {
        self.next_period_ccy.store(ccy, Ordering::Relaxed);
    }

    /// Cycle count of the current period's falling edge
    pub fn end_duty_ccy(&self) -> u32 {
        self.end_duty_ccy.load(Ordering::Relaxed)
    }

    pub(crate) fn set_end_duty_ccy(&self, ccy: u32) {
        self.end_duty_ccy.store(ccy, Ordering::Relaxed);
    }

    /// Nominal on-time in cycles
    pub fn duty_ccys(&self) -> i32 {
        self.duty_ccys.load(Ordering::Relaxed)
    }

    /// Pending overshoot correction in cycles
    pub fn adj_duty_ccys(&self) -> i32 {
        self.adj_duty_ccys.load(Ordering::Relaxed)
    }

    pub(crate) fn set_adj_duty_ccys(&self, ccys: i32) {
        self.adj_duty_ccys.store(ccys, Ordering::Relaxed);
    }

    /// Full period in cycles
    pub fn period_ccys(&self) -> i32 {
        self.period_ccys.load(Ordering::Relaxed)
    }

    /// Expiry cycle (or relative duration while a transition is pending)
    pub fn expiry_ccy(&self) -> u32 {
        self.expiry_ccy.load(Ordering::Relaxed)
    }

    pub(crate) fn set_expiry_ccy(&self, ccy: u32) {
        self.expiry_ccy.store(ccy, Ordering::Relaxed);
    }

    /// Current scheduling mode
    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Relaxed)).unwrap_or(Mode::Infinite)
    }

    pub(crate) fn set_mode(&self, mode: Mode) {
        self.mode.store(mode.as_u8(), Ordering::Relaxed);
    }

    /// Whether overshoot correction is enabled
    pub fn auto_pwm(&self) -> bool {
        self.auto_pwm.load(Ordering::Relaxed)
    }

    /// Load new nominal timing; the interrupt picks it up at the next
    /// period boundary since it re-reads duty and period on every edge.
    pub(crate) fn load_timing(&self, duty_ccys: u32, period_ccys: u32, auto_pwm: bool) {
        self.duty_ccys.store(duty_ccys as i32, Ordering::Relaxed);
        self.adj_duty_ccys.store(0, Ordering::Relaxed);
        self.period_ccys.store(period_ccys as i32, Ordering::Relaxed);
        self.auto_pwm.store(auto_pwm, Ordering::Relaxed);
    }
}
