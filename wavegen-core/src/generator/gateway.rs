//! Mutation gateway
//!
//! Entry points for ordinary (non-interrupt) code. Requests are validated
//! here, staged into the descriptor, and handed to the interrupt through a
//! single-bit mailbox. Each call returns only once the interrupt has
//! consumed its mailbox bit, so at most one request is ever in flight.

use core::sync::atomic::{fence, Ordering};

use wavegen_hal::Platform;

use super::Generator;
use crate::config::pin_bit;
use crate::scheduler::NO_ALIGN;
use crate::waveform::{Mode, WaveformError, WaveformRequest};
use crate::SecondaryCallback;

impl<P: Platform + 'static> Generator<P> {
    /// Start a waveform on `pin`, or change the one already running there
    ///
    /// A new duty or period on a running pin takes effect at its next
    /// period boundary. A run time or alignment target on a running pin is
    /// applied by the interrupt without a glitch. Cooperatively yields
    /// until the interrupt has taken the request.
    pub fn start(&'static self, pin: u8, request: WaveformRequest) -> Result<(), WaveformError> {
        let timing = self.config.timing;
        let timing_ok = request
            .normalize(pin, &self.config.pins, timing.max_irq_ccys())
            .map_err(|e| {
                warn!("waveform start rejected on pin {}: {}", pin, e);
                e
            })?;

        let st = &self.state;
        // Never overwrite a request that is still in flight
        while st.pending_set.load(Ordering::Acquire) != 0 {
            self.platform.yield_now();
        }

        let wave = &st.pins[pin as usize];
        wave.load_timing(timing_ok.duty_ccys, timing_ok.period_ccys, request.auto_pwm);
        st.align_pin
            .store(request.align_to.unwrap_or(NO_ALIGN), Ordering::Relaxed);
        st.phase_offset_ccys
            .store(request.phase_offset_ccys, Ordering::Relaxed);

        fence(Ordering::Acquire);
        let bit = pin_bit(pin);
        if st.enabled.load(Ordering::Relaxed) & bit == 0 {
            // Deadlines are placed by the interrupt; expiry holds the run time until then
            wave.set_expiry_ccy(request.run_time_ccys);
            wave.set_mode(Mode::Init);
            if timing_ok.duty_ccys == 0 {
                self.platform.set_low(pin);
            }
            fence(Ordering::Release);
            st.pending_set.store(bit, Ordering::Release);
            fence(Ordering::Release);
            trace!("waveform start handoff on pin {}", pin);
            if !st.timer_running.load(Ordering::Acquire) {
                self.start_timer();
            } else {
                self.expedite_timer();
            }
        } else {
            // Drop any expiry first so the interrupt never sees a half-made update
            wave.set_mode(Mode::Infinite);
            fence(Ordering::Release);
            if request.run_time_ccys != 0 {
                wave.set_expiry_ccy(request.run_time_ccys);
                wave.set_mode(Mode::UpdateExpiry);
                fence(Ordering::Release);
                st.pending_set.store(bit, Ordering::Release);
                trace!("waveform expiry handoff on pin {}", pin);
            } else if request.align_to.is_some() {
                wave.set_mode(Mode::UpdatePhase);
                fence(Ordering::Release);
                st.pending_set.store(bit, Ordering::Release);
                trace!("waveform phase handoff on pin {}", pin);
            }
        }

        fence(Ordering::AcqRel);
        while st.pending_set.load(Ordering::Acquire) != 0 {
            self.platform.yield_now();
        }
        debug!("waveform running on pin {}", pin);
        Ok(())
    }

    /// Install or remove the per-firing secondary callback
    ///
    /// Installing starts the timer if needed; removing it while no pin is
    /// enabled stops the timer.
    pub fn set_secondary_callback(&'static self, callback: Option<SecondaryCallback>) {
        let st = &self.state;
        st.callback.store(callback);
        fence(Ordering::AcqRel);

        let running = st.timer_running.load(Ordering::Acquire);
        if !running && callback.is_some() {
            self.start_timer();
        } else if running && callback.is_none() && st.enabled.load(Ordering::Acquire) == 0 {
            self.stop_timer();
        }
    }

    /// Flat boolean form of [`Generator::start`]
    ///
    /// `align_phase < 0` means no phase alignment.
    #[allow(clippy::too_many_arguments)]
    pub fn start_waveform(
        &'static self,
        pin: u8,
        high_ccys: u32,
        low_ccys: u32,
        run_time_ccys: u32,
        align_phase: i8,
        phase_offset_ccys: u32,
        auto_pwm: bool,
    ) -> bool {
        let mut request = WaveformRequest::new(high_ccys, low_ccys)
            .run_for(run_time_ccys)
            .auto_pwm(auto_pwm);
        if align_phase >= 0 {
            request = request.aligned_to(align_phase as u8, phase_offset_ccys);
        }
        self.start(pin, request).is_ok()
    }
}

impl<P: Platform> Generator<P> {
    /// Stop the waveform on `pin`
    ///
    /// Busy-waits (never yields) until the interrupt has disabled the pin,
    /// so it is safe where yielding is not. Tears the timer down once
    /// nothing needs it. Stopping a pin without a waveform is a no-op.
    pub fn stop(&self, pin: u8) -> Result<(), WaveformError> {
        let st = &self.state;
        if !st.timer_running.load(Ordering::Acquire) {
            return Err(WaveformError::TimerNotRunning);
        }

        fence(Ordering::Acquire);
        let bit = pin_bit(pin);
        if st.enabled.load(Ordering::Relaxed) & bit != 0 {
            st.pending_clear.store(bit, Ordering::Release);
            fence(Ordering::Release);
            self.expedite_timer();
            while st.pending_clear.load(Ordering::Acquire) != 0 {
                self.platform.relax();
            }
            debug!("waveform stopped on pin {}", pin);
        }

        if st.enabled.load(Ordering::Acquire) == 0 && !st.callback.is_set() {
            self.stop_timer();
        }
        Ok(())
    }

    /// Flat boolean form of [`Generator::stop`]
    pub fn stop_waveform(&self, pin: u8) -> bool {
        self.stop(pin).is_ok()
    }
}
