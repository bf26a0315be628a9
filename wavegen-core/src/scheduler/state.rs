//! Schedule state
//!
//! One instance per generator. `enabled`, `states` and the descriptors'
//! deadlines change only inside the interrupt; ordinary code stages
//! scratch values and raises a single mailbox bit.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::callback::CallbackSlot;
use crate::config::MAX_PINS;
use crate::waveform::Descriptor;

/// Alignment scratch value meaning "no phase alignment"
pub const NO_ALIGN: u8 = u8::MAX;

/// Shared state between the gateway and the interrupt
#[derive(Debug)]
pub struct ScheduleState {
    /// One descriptor per pin
    pub(crate) pins: [Descriptor; MAX_PINS],
    /// Pins currently driven high
    pub(crate) states: AtomicU32,
    /// Pins with an armed waveform
    pub(crate) enabled: AtomicU32,
    /// Mailbox: the one pin to start or modify
    pub(crate) pending_set: AtomicU32,
    /// Mailbox: the one pin to disable
    pub(crate) pending_clear: AtomicU32,
    /// Phase offset for the in-flight `pending_set`
    pub(crate) phase_offset_ccys: AtomicU32,
    /// Reference pin for the in-flight `pending_set`, or [`NO_ALIGN`]
    pub(crate) align_pin: AtomicU8,
    /// Cycle count the timer is armed for
    pub(crate) next_event_ccy: AtomicU32,
    /// Optional hook run on every firing
    pub(crate) callback: CallbackSlot,
    /// Timer interrupt attached and counting
    pub(crate) timer_running: AtomicBool,
}

impl Default for ScheduleState {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleState {
    /// Create a schedule with nothing enabled
    pub fn new() -> Self {
        Self {
            pins: core::array::from_fn(|_| Descriptor::new()),
            states: AtomicU32::new(0),
            enabled: AtomicU32::new(0),
            pending_set: AtomicU32::new(0),
            pending_clear: AtomicU32::new(0),
            phase_offset_ccys: AtomicU32::new(0),
            align_pin: AtomicU8::new(NO_ALIGN),
            next_event_ccy: AtomicU32::new(0),
            callback: CallbackSlot::new(),
            timer_running: AtomicBool::new(false),
        }
    }

    /// Bitmask of pins with an armed waveform
    pub fn enabled(&self) -> u32 {
        self.enabled.load(Ordering::Acquire)
    }

    /// Bitmask of pins currently driven high
    pub fn states(&self) -> u32 {
        self.states.load(Ordering::Acquire)
    }

    /// Descriptor for a pin
    pub fn descriptor(&self, pin: u8) -> Option<&Descriptor> {
        self.pins.get(pin as usize)
    }

    /// Cycle count the timer is currently armed for
    pub fn next_event_ccy(&self) -> u32 {
        self.next_event_ccy.load(Ordering::Relaxed)
    }

    /// Whether the timer interrupt is attached
    pub fn timer_running(&self) -> bool {
        self.timer_running.load(Ordering::Acquire)
    }

    /// Reference pin staged for the in-flight request, if it is enabled
    pub(crate) fn reference_pin(&self, enabled: u32) -> Option<usize> {
        let align = self.align_pin.load(Ordering::Relaxed) as usize;
        if align < MAX_PINS && enabled & (1 << align) != 0 {
            Some(align)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = ScheduleState::new();
        assert_eq!(state.enabled(), 0);
        assert_eq!(state.states(), 0);
        assert!(!state.timer_running());
        assert!(state.descriptor(31).is_some());
        assert!(state.descriptor(32).is_none());
    }

    #[test]
    fn test_reference_pin_requires_enabled() {
        let state = ScheduleState::new();
        assert_eq!(state.reference_pin(0xFFFF_FFFF), None);

        state.align_pin.store(3, Ordering::Relaxed);
        assert_eq!(state.reference_pin(0), None);
        assert_eq!(state.reference_pin(1 << 3), Some(3));
    }
}
