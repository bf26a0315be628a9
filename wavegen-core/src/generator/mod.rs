//! Waveform generator
//!
//! Owns the platform, the configuration and the one schedule state. The
//! gateway methods run in ordinary code; [`Generator::service`] runs in the
//! timer interrupt once the timer adapter has attached it.
//!
//! Create one instance and give it a `'static` home (a `StaticCell`, or
//! a leaked box on a host) before starting any waveform, since the timer
//! interrupt keeps a reference to it.

mod gateway;
pub(crate) mod timer;

use wavegen_hal::{InterruptService, Platform};

use crate::config::{pin_bit, GeneratorConfig};
use crate::safety::ReturnGuard;
use crate::scheduler::ScheduleState;
use crate::waveform::Descriptor;

pub use timer::TickScale;

/// Waveform generator bound to one platform
#[derive(Debug)]
pub struct Generator<P: Platform> {
    pub(crate) platform: P,
    pub(crate) config: GeneratorConfig,
    pub(crate) state: ScheduleState,
    pub(crate) guard: ReturnGuard,
}

impl<P: Platform> Generator<P> {
    /// Create a generator with nothing enabled and the timer stopped
    pub fn new(platform: P, config: GeneratorConfig) -> Self {
        Self {
            platform,
            config,
            state: ScheduleState::new(),
            guard: ReturnGuard::new(),
        }
    }

    /// Platform this generator drives
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Active configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Shared schedule state (read-only view)
    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    /// Descriptor of a pin's waveform
    pub fn descriptor(&self, pin: u8) -> Option<&Descriptor> {
        self.state.descriptor(pin)
    }

    /// Check if a pin has an armed waveform
    pub fn is_enabled(&self, pin: u8) -> bool {
        self.state.enabled() & pin_bit(pin) != 0
    }

    /// Check if a pin is currently driven high by its waveform
    pub fn is_high(&self, pin: u8) -> bool {
        self.state.states() & pin_bit(pin) != 0
    }

    /// Bitmask of pins with an armed waveform
    pub fn enabled_mask(&self) -> u32 {
        self.state.enabled()
    }

    /// Whether the timer interrupt is attached
    pub fn timer_running(&self) -> bool {
        self.state.timer_running()
    }

    /// Cycle count of the next scheduled firing
    pub fn next_event_ccy(&self) -> u32 {
        self.state.next_event_ccy()
    }

    /// Number of interrupt-return frames repaired so far
    pub fn return_repairs(&self) -> u32 {
        self.guard.repairs()
    }
}

impl<P: Platform> InterruptService for Generator<P> {
    fn on_interrupt(&self) {
        self.service();
    }
}
