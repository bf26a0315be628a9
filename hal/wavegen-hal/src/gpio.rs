//! GPIO output abstractions
//!
//! Provides a trait for a bank of digital outputs addressed by pin number.
//! The scheduler toggles pins from interrupt context, so implementations
//! should be a single register write where the hardware allows it.

/// Bank of digital output pins
pub trait OutputBank {
    /// Drive the pin high (logic 1)
    fn set_high(&self, pin: u8);

    /// Drive the pin low (logic 0)
    fn set_low(&self, pin: u8);
}

impl<T: OutputBank + ?Sized> OutputBank for &T {
    fn set_high(&self, pin: u8) {
        (**self).set_high(pin)
    }

    fn set_low(&self, pin: u8) {
        (**self).set_low(pin)
    }
}
