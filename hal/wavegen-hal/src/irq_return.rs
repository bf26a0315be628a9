//! Saved interrupt-return state
//!
//! Some cores (the ESP8266's NMI path) occasionally save a return address
//! that points back into the interrupt handler instead of the interrupted
//! code. Returning through it stalls the CPU on the next firing. Platforms
//! with that erratum expose the saved state here so the scheduler can
//! repair it; every other platform keeps the no-op defaults.

/// Saved program counter and processor status of the interrupted context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReturnFrame {
    /// Return address
    pub pc: u32,
    /// Saved processor status word
    pub ps: u32,
}

impl ReturnFrame {
    /// Create a frame
    pub const fn new(pc: u32, ps: u32) -> Self {
        Self { pc, ps }
    }
}

/// Access to the saved interrupt-return frame
pub trait InterruptReturn {
    /// Read the frame the current interrupt will return through
    ///
    /// `None` on platforms without the erratum.
    fn saved_return(&self) -> Option<ReturnFrame> {
        None
    }

    /// Overwrite the frame the current interrupt will return through
    fn restore_return(&self, _frame: ReturnFrame) {}

    /// Whether `pc` lies inside the interrupt handler's own code
    fn in_handler(&self, _pc: u32) -> bool {
        false
    }
}

impl<T: InterruptReturn + ?Sized> InterruptReturn for &T {
    fn saved_return(&self) -> Option<ReturnFrame> {
        (**self).saved_return()
    }

    fn restore_return(&self, frame: ReturnFrame) {
        (**self).restore_return(frame)
    }

    fn in_handler(&self, pc: u32) -> bool {
        (**self).in_handler(pc)
    }
}
