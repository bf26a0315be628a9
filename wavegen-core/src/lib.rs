//! Board-agnostic waveform scheduler
//!
//! Generates many independent periodic digital waveforms (PWM dimming,
//! tones, servo pulses) on a bank of pins while sharing one hardware
//! one-shot timer and one highest-priority interrupt:
//!
//! - Mutation gateway: validates start/stop requests from ordinary code and
//!   hands exactly one of them at a time to the interrupt
//! - Interrupt scheduler: the only code that mutates live schedule state
//! - Timer adapter: attaches the interrupt and converts cycles to ticks
//! - Return guard: repairs a stuck interrupt-return frame on every firing
//!
//! All deadlines are absolute CPU cycle counts compared with signed
//! differences, so the 32-bit counter may wrap freely.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

mod callback;
pub mod config;
pub mod generator;
pub mod safety;
pub mod scheduler;
pub mod waveform;

pub use config::{GeneratorConfig, PinConfig, TimingConfig};
pub use generator::Generator;
pub use waveform::{Mode, WaveformError, WaveformRequest};

/// Cycles-until-next-run hook invoked once per interrupt firing
pub type SecondaryCallback = fn() -> u32;
