//! Cortex-M platform for the wavegen scheduler
//!
//! Uses the DWT cycle counter as the cycle clock and SysTick as the
//! one-shot timer, clocked from the core so one tick is one cycle. Outputs
//! are any `embedded-hal` output pins of one type (use the chip HAL's
//! type-erased pin).
//!
//! Needs a core with a DWT cycle counter (M3, M4, M7, M33). The firmware
//! forwards its SysTick exception here:
//!
//! ```ignore
//! #[exception]
//! fn SysTick() {
//!     wavegen_hal_cortex_m::on_systick();
//! }
//! ```

#![no_std]
#![deny(unsafe_code)]

mod systick;

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::interrupt::{self, Mutex};
use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::{DCB, DWT, SCB, SYST};
use embedded_hal::digital::OutputPin;
use wavegen_hal::{Cpu, InterruptReturn, InterruptService, OneShotTimer, OutputBank};

pub use systick::on_systick;

/// Cortex-M platform with `N` output slots
///
/// Slot index is the pin number the scheduler uses. Empty slots ignore
/// writes.
pub struct CortexMPlatform<P: OutputPin, const N: usize> {
    pins: Mutex<RefCell<[Option<P>; N]>>,
    cpu_hz: AtomicU32,
}

impl<P: OutputPin, const N: usize> CortexMPlatform<P, N> {
    /// Take over the cycle counter and SysTick
    ///
    /// `SYST` is consumed since the scheduler reprograms it on every
    /// firing; SysTick is raised to the highest priority.
    pub fn new(
        pins: [Option<P>; N],
        cpu_hz: u32,
        mut syst: SYST,
        dcb: &mut DCB,
        dwt: &mut DWT,
        scb: &mut SCB,
    ) -> Self {
        dcb.enable_trace();
        dwt.enable_cycle_counter();

        syst.disable_interrupt();
        syst.disable_counter();
        syst.set_clock_source(cortex_m::peripheral::syst::SystClkSource::Core);
        syst.clear_current();

        // Priority 0 is the highest on every Cortex-M
        #[allow(unsafe_code)]
        unsafe {
            scb.set_priority(SystemHandler::SysTick, 0);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("wavegen platform ready: {} pins at {} Hz", N, cpu_hz);

        Self {
            pins: Mutex::new(RefCell::new(pins)),
            cpu_hz: AtomicU32::new(cpu_hz),
        }
    }

    /// Record a core clock change
    pub fn set_cpu_hz(&self, hz: u32) {
        self.cpu_hz.store(hz, Ordering::Relaxed);
    }

    fn with_pin(&self, pin: u8, f: impl FnOnce(&mut P)) {
        interrupt::free(|cs| {
            let mut pins = self.pins.borrow(cs).borrow_mut();
            if let Some(Some(p)) = pins.get_mut(pin as usize) {
                f(p);
            }
        });
    }
}

impl<P: OutputPin, const N: usize> Cpu for CortexMPlatform<P, N> {
    fn cycle_count(&self) -> u32 {
        DWT::cycle_count()
    }

    fn cpu_hz(&self) -> u32 {
        self.cpu_hz.load(Ordering::Relaxed)
    }

    fn yield_now(&self) {
        // The pending SysTick wakes us
        cortex_m::asm::wfi();
    }
}

impl<P: OutputPin, const N: usize> OutputBank for CortexMPlatform<P, N> {
    fn set_high(&self, pin: u8) {
        self.with_pin(pin, |p| {
            let _ = p.set_high();
        });
    }

    fn set_low(&self, pin: u8) {
        self.with_pin(pin, |p| {
            let _ = p.set_low();
        });
    }
}

impl<P: OutputPin, const N: usize> OneShotTimer for CortexMPlatform<P, N> {
    fn tick_hz(&self) -> u32 {
        // Core clock source
        self.cpu_hz()
    }

    fn attach(&self, isr: &'static dyn InterruptService) {
        systick::set_handler(Some(isr));
    }

    fn detach(&self) {
        systick::set_handler(None);
    }

    fn enable(&self) {
        systick::enable_interrupt();
    }

    fn disable(&self) {
        systick::stop();
    }

    fn write(&self, ticks: u32) {
        systick::arm(ticks);
    }

    fn remaining(&self) -> u32 {
        systick::remaining()
    }
}

/// Cortex-M saves a precise return context; nothing to repair
impl<P: OutputPin, const N: usize> InterruptReturn for CortexMPlatform<P, N> {}
