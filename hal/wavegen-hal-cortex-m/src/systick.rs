//! SysTick as a one-shot timer
//!
//! SysTick only counts periodically, so the exception handler stops the
//! counter before running the scheduler; the scheduler's re-arm starts it
//! again. The reload register is 24 bits wide and longer delays are
//! clamped, which only makes the scheduler wake early.

use core::cell::Cell;

use cortex_m::interrupt::{self, Mutex};
use cortex_m::peripheral::SYST;
use wavegen_hal::InterruptService;

const CSR_ENABLE: u32 = 1 << 0;
const CSR_TICKINT: u32 = 1 << 1;
const CSR_CLKSOURCE: u32 = 1 << 2;
const MAX_RELOAD: u32 = 0x00FF_FFFF;

#[derive(Clone, Copy)]
struct Handler(&'static dyn InterruptService);

// Single core: the handler is only ever called from the SysTick exception
#[allow(unsafe_code)]
unsafe impl Send for Handler {}

static HANDLER: Mutex<Cell<Option<Handler>>> = Mutex::new(Cell::new(None));

/// SysTick exception body
///
/// Call from the firmware's `SysTick` exception handler.
pub fn on_systick() {
    stop_counter();
    let handler = interrupt::free(|cs| HANDLER.borrow(cs).get());
    if let Some(Handler(isr)) = handler {
        isr.on_interrupt();
    }
}

pub(crate) fn set_handler(isr: Option<&'static dyn InterruptService>) {
    interrupt::free(|cs| HANDLER.borrow(cs).set(isr.map(Handler)));
}

pub(crate) fn enable_interrupt() {
    modify_csr(|csr| csr | CSR_TICKINT | CSR_CLKSOURCE);
}

pub(crate) fn stop() {
    modify_csr(|csr| csr & !(CSR_ENABLE | CSR_TICKINT));
}

pub(crate) fn arm(ticks: u32) {
    let reload = ticks.clamp(1, MAX_RELOAD);
    stop_counter();
    #[allow(unsafe_code)]
    unsafe {
        let syst = &*SYST::PTR;
        syst.rvr.write(reload);
        // Any write clears the counter; it reloads on the next clock
        syst.cvr.write(0);
    }
    modify_csr(|csr| csr | CSR_ENABLE | CSR_TICKINT | CSR_CLKSOURCE);
}

pub(crate) fn remaining() -> u32 {
    #[allow(unsafe_code)]
    let csr = unsafe { (*SYST::PTR).csr.read() };
    if csr & CSR_ENABLE == 0 {
        0
    } else {
        SYST::get_current()
    }
}

fn stop_counter() {
    modify_csr(|csr| csr & !CSR_ENABLE);
}

fn modify_csr(f: impl FnOnce(u32) -> u32) {
    interrupt::free(|_| {
        #[allow(unsafe_code)]
        unsafe {
            let syst = &*SYST::PTR;
            let csr = syst.csr.read();
            syst.csr.write(f(csr));
        }
    });
}
