//! Interrupt-return safety
//!
//! Guards against a hardware erratum that leaves the saved interrupt
//! return address pointing into the interrupt handler itself.

pub mod return_guard;

pub use return_guard::{GuardOutcome, ReturnGuard};
