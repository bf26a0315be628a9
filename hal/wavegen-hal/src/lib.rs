//! Wavegen Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the waveform scheduler runs on.
//! Chip-specific crates implement them; the scheduler itself never touches
//! a register.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  wavegen-core (gateway + scheduler)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  wavegen-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ wavegen-hal-  │       │ wavegen-hal-  │
//! │   cortex-m    │       │      sim      │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`cpu::Cpu`] - Cycle counter, clock rate, yield and busy-wait hooks
//! - [`gpio::OutputBank`] - Pin outputs addressed by index
//! - [`timer::OneShotTimer`] - The single one-shot timer and its interrupt
//! - [`irq_return::InterruptReturn`] - Saved interrupt-return state access
//!
//! All methods take `&self`: the same platform instance is used from both
//! ordinary code and the timer interrupt.

#![no_std]
#![deny(unsafe_code)]

pub mod cpu;
pub mod gpio;
pub mod irq_return;
pub mod timer;

// Re-export key traits at crate root for convenience
pub use cpu::Cpu;
pub use gpio::OutputBank;
pub use irq_return::{InterruptReturn, ReturnFrame};
pub use timer::{InterruptService, OneShotTimer};

/// Everything the waveform scheduler needs from a board
pub trait Platform: Cpu + OutputBank + OneShotTimer + InterruptReturn {}

// Blanket implementation for types that implement all the parts
impl<T: Cpu + OutputBank + OneShotTimer + InterruptReturn + ?Sized> Platform for T {}
