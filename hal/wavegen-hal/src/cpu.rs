//! CPU clock abstractions
//!
//! The scheduler keeps all of its deadlines in CPU cycles, read from a
//! free-running 32-bit counter that wraps.

/// CPU cycle counter and waiting hooks
pub trait Cpu {
    /// Current value of the free-running cycle counter
    fn cycle_count(&self) -> u32;

    /// Current CPU clock rate in Hz
    ///
    /// May differ from the rate the scheduler was configured for when the
    /// chip can switch clock speed at runtime.
    fn cpu_hz(&self) -> u32;

    /// Let other cooperative work run while waiting for the interrupt
    fn yield_now(&self);

    /// One iteration of a busy-wait
    ///
    /// Must not yield: callers may be in a context where yielding is unsafe.
    fn relax(&self) {
        core::hint::spin_loop();
    }
}

impl<T: Cpu + ?Sized> Cpu for &T {
    fn cycle_count(&self) -> u32 {
        (**self).cycle_count()
    }

    fn cpu_hz(&self) -> u32 {
        (**self).cpu_hz()
    }

    fn yield_now(&self) {
        (**self).yield_now()
    }

    fn relax(&self) {
        (**self).relax()
    }
}
