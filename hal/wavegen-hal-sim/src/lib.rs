//! Host simulator for the wavegen HAL
//!
//! Implements every `wavegen-hal` trait against a virtual cycle counter so
//! the scheduler can be exercised deterministically on a development
//! machine:
//!
//! - Virtual 32-bit cycle counter, free to start anywhere (wraparound tests)
//! - One-shot timer that runs the attached interrupt when the clock reaches it
//! - Configurable interrupt entry latency and extra servicing delay
//! - Configurable CPU clock (e.g. 160 MHz against an 80 MHz timer)
//! - Edge trace of every output transition
//! - Fault injection for the stuck interrupt-return erratum
//!
//! Waiting in ordinary code (`yield_now`, `relax`) delivers the next
//! pending firing, which is how the interrupt preempts a waiting caller.

pub mod board;
pub mod trace;

pub use board::{SimBoard, HANDLER_END, HANDLER_START};
pub use trace::{Edge, EdgeTrace};
