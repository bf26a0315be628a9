//! One-shot timer abstractions
//!
//! The scheduler owns exactly one hardware countdown timer. Each firing
//! runs the attached [`InterruptService`] at the highest interrupt
//! priority, and the service reprograms the timer for the next firing.

/// Code run on every timer firing
pub trait InterruptService {
    /// Handle one timer interrupt
    fn on_interrupt(&self);
}

/// Single-shot countdown timer
pub trait OneShotTimer {
    /// Timer tick rate in Hz
    ///
    /// Usually fixed while the CPU clock may change.
    fn tick_hz(&self) -> u32;

    /// Route the timer interrupt to `isr`
    fn attach(&self, isr: &'static dyn InterruptService);

    /// Disconnect the timer interrupt
    fn detach(&self);

    /// Enable the timer peripheral in single-shot mode
    fn enable(&self);

    /// Disable the timer peripheral
    fn disable(&self);

    /// Program the timer to fire once after `ticks` timer ticks
    fn write(&self, ticks: u32);

    /// Ticks left before the programmed firing (0 when not counting)
    fn remaining(&self) -> u32;
}

impl<T: OneShotTimer + ?Sized> OneShotTimer for &T {
    fn tick_hz(&self) -> u32 {
        (**self).tick_hz()
    }

    fn attach(&self, isr: &'static dyn InterruptService) {
        (**self).attach(isr)
    }

    fn detach(&self) {
        (**self).detach()
    }

    fn enable(&self) {
        (**self).enable()
    }

    fn disable(&self) {
        (**self).disable()
    }

    fn write(&self, ticks: u32) {
        (**self).write(ticks)
    }

    fn remaining(&self) -> u32 {
        (**self).remaining()
    }
}
