//! Interrupt scheduler
//!
//! Everything that runs inside the timer interrupt: applying the one
//! pending mutation, advancing each pin's edges, and re-arming the timer.

mod dispatch;
pub mod state;
mod transition;

pub use dispatch::corrected_duty;
pub use state::{ScheduleState, NO_ALIGN};
pub use transition::phase_shift;
