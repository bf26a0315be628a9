//! Simulated board
//!
//! A single-threaded stand-in for a microcontroller with a free-running
//! cycle counter, a one-shot timer wired to one interrupt, and a bank of
//! push-pull outputs. Interior mutability keeps every HAL method on `&self`
//! so the board can be shared with the scheduler it drives.

use core::cell::{Cell, RefCell};

use wavegen_hal::{Cpu, InterruptReturn, InterruptService, OneShotTimer, OutputBank, ReturnFrame};

use crate::trace::{Edge, EdgeTrace};

/// First address of the simulated interrupt handler
pub const HANDLER_START: u32 = 0x4010_0000;
/// One past the last address of the simulated interrupt handler
pub const HANDLER_END: u32 = 0x4010_0200;

/// Base of the addresses used for ordinary interrupted code
const APP_CODE_BASE: u32 = 0x4020_0000;
/// Processor status saved with every frame
const SAVED_PS: u32 = 0x0000_0030;

/// Deterministic board model
pub struct SimBoard {
    clock: Cell<u32>,
    read_cost: Cell<u32>,
    cpu_hz: Cell<u32>,
    tick_hz: u32,
    entry_latency: Cell<u32>,
    service_delay: Cell<u32>,
    one_shot_delay: Cell<u32>,

    isr: Cell<Option<&'static dyn InterruptService>>,
    enabled: Cell<bool>,
    fire_at: Cell<Option<u32>>,
    in_isr: Cell<bool>,
    firings: Cell<u64>,
    last_entry: Cell<Option<u32>>,

    outputs: Cell<u32>,
    trace: RefCell<Vec<Edge>>,

    frame: Cell<ReturnFrame>,
    fault_next: Cell<bool>,
    stalls: Cell<u32>,
}

impl core::fmt::Debug for SimBoard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimBoard")
            .field("clock", &self.clock.get())
            .field("cpu_hz", &self.cpu_hz.get())
            .field("tick_hz", &self.tick_hz)
            .field("attached", &self.is_attached())
            .field("fire_at", &self.fire_at.get())
            .field("outputs", &self.outputs.get())
            .field("firings", &self.firings.get())
            .finish()
    }
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::esp8266()
    }
}

impl SimBoard {
    /// Create a board
    ///
    /// `entry_latency` is the number of cycles between the timer expiring
    /// and the handler's first instruction.
    pub fn new(cpu_hz: u32, tick_hz: u32, entry_latency: u32) -> Self {
        Self {
            clock: Cell::new(0),
            read_cost: Cell::new(1),
            cpu_hz: Cell::new(cpu_hz),
            tick_hz: tick_hz.max(1),
            entry_latency: Cell::new(entry_latency),
            service_delay: Cell::new(0),
            one_shot_delay: Cell::new(0),
            isr: Cell::new(None),
            enabled: Cell::new(false),
            fire_at: Cell::new(None),
            in_isr: Cell::new(false),
            firings: Cell::new(0),
            last_entry: Cell::new(None),
            outputs: Cell::new(0),
            trace: RefCell::new(Vec::new()),
            frame: Cell::new(ReturnFrame::new(APP_CODE_BASE, SAVED_PS)),
            fault_next: Cell::new(false),
            stalls: Cell::new(0),
        }
    }

    /// ESP8266 at 80 MHz with its timer at the CPU clock and 2 µs entry
    pub fn esp8266() -> Self {
        Self::new(80_000_000, 80_000_000, 160)
    }

    /// Start the cycle counter at `clock`
    pub fn starting_at(self, clock: u32) -> Self {
        self.clock.set(clock);
        self
    }

    /// Cycles consumed by every cycle-counter read
    ///
    /// Defaults to 1 so busy-waits make progress. Zero gives exact edges
    /// but hangs any handler that busy-waits for a close deadline.
    pub fn with_read_cost(self, cycles: u32) -> Self {
        self.read_cost.set(cycles);
        self
    }

    /// Current cycle count, without the cost of a read
    pub fn now(&self) -> u32 {
        self.clock.get()
    }

    /// Change the CPU clock (the timer rate stays fixed)
    pub fn set_cpu_hz(&self, hz: u32) {
        self.cpu_hz.set(hz);
    }

    /// Change the timer-to-handler latency
    pub fn set_entry_latency(&self, cycles: u32) {
        self.entry_latency.set(cycles);
    }

    /// Add a fixed delay to every firing, on top of the entry latency
    pub fn set_service_delay(&self, cycles: u32) {
        self.service_delay.set(cycles);
    }

    /// Add a delay to the next firing only
    pub fn delay_next_firing(&self, cycles: u32) {
        self.one_shot_delay.set(cycles);
    }

    /// Make the next firing save a return address inside the handler
    pub fn inject_return_fault(&self) {
        self.fault_next.set(true);
    }

    /// Number of firings that returned into the handler
    pub fn stalls(&self) -> u32 {
        self.stalls.get()
    }

    /// Frame the most recent firing returned through
    pub fn last_return(&self) -> ReturnFrame {
        self.frame.get()
    }

    /// Number of interrupts delivered so far
    pub fn firings(&self) -> u64 {
        self.firings.get()
    }

    /// Cycle count at which the most recent firing entered the handler
    pub fn last_entry(&self) -> Option<u32> {
        self.last_entry.get()
    }

    /// Whether an interrupt handler is attached
    pub fn is_attached(&self) -> bool {
        self.isr.get().is_some()
    }

    /// Whether the timer counts
    pub fn timer_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Level currently driven on `pin`
    pub fn level(&self, pin: u8) -> bool {
        pin < 32 && self.outputs.get() & (1 << pin) != 0
    }

    /// Bitmask of pins driven high
    pub fn outputs(&self) -> u32 {
        self.outputs.get()
    }

    /// Copy of every edge recorded so far
    pub fn trace(&self) -> EdgeTrace {
        EdgeTrace::new(self.trace.borrow().clone())
    }

    /// Forget the recorded edges
    pub fn clear_trace(&self) {
        self.trace.borrow_mut().clear();
    }

    /// Cycle count at which the pending firing enters the handler
    pub fn next_entry(&self) -> Option<u32> {
        if !self.enabled.get() || self.isr.get().is_none() {
            return None;
        }
        let fire_at = self.fire_at.get()?;
        let clock = self.clock.get();
        let mut entry = fire_at.wrapping_add(self.entry_latency.get());
        // Already overdue: taken as soon as ordinary code runs again
        if clock.wrapping_sub(entry) as i32 > 0 {
            entry = clock;
        }
        Some(
            entry
                .wrapping_add(self.service_delay.get())
                .wrapping_add(self.one_shot_delay.get()),
        )
    }

    /// Deliver the pending firing, if any
    ///
    /// Moves the clock to the handler entry and runs the attached handler.
    /// Returns `false` when nothing was pending.
    pub fn fire_next(&self) -> bool {
        if self.in_isr.get() {
            return false;
        }
        let (Some(entry), Some(isr)) = (self.next_entry(), self.isr.get()) else {
            return false;
        };

        if entry.wrapping_sub(self.clock.get()) as i32 > 0 {
            self.clock.set(entry);
        }
        self.last_entry.set(Some(self.clock.get()));
        self.fire_at.set(None);
        self.one_shot_delay.set(0);
        let firings = self.firings.get() + 1;
        self.firings.set(firings);

        let pc = if self.fault_next.replace(false) {
            HANDLER_START + 0x40
        } else {
            APP_CODE_BASE + ((firings as u32 & 0xFF) << 2)
        };
        self.frame.set(ReturnFrame::new(pc, SAVED_PS));

        self.in_isr.set(true);
        isr.on_interrupt();
        self.in_isr.set(false);

        if self.in_handler(self.frame.get().pc) {
            self.stalls.set(self.stalls.get() + 1);
        }
        true
    }

    /// Let `cycles` pass, delivering every firing due in that window
    pub fn advance(&self, cycles: u32) {
        let target = self.clock.get().wrapping_add(cycles);
        while let Some(entry) = self.next_entry() {
            let clock = self.clock.get();
            if entry.wrapping_sub(clock) as i32 > target.wrapping_sub(clock) as i32 {
                break;
            }
            self.fire_next();
        }
        // A handler may already have run past the target
        if target.wrapping_sub(self.clock.get()) as i32 > 0 {
            self.clock.set(target);
        }
    }

    /// Run until the clock reaches `at`
    pub fn run_until(&self, at: u32) {
        let remaining = at.wrapping_sub(self.clock.get());
        if remaining as i32 > 0 {
            self.advance(remaining);
        }
    }

    fn wait(&self) {
        if !self.fire_next() {
            self.clock.set(self.clock.get().wrapping_add(1));
        }
    }

    fn drive(&self, pin: u8, high: bool) {
        if pin >= 32 {
            return;
        }
        let bit = 1u32 << pin;
        let outputs = self.outputs.get();
        if (outputs & bit != 0) == high {
            return;
        }
        self.outputs.set(outputs ^ bit);
        self.trace.borrow_mut().push(Edge {
            pin,
            high,
            at: self.clock.get(),
        });
    }

    fn ccys_per_tick(&self) -> u32 {
        (self.cpu_hz.get() / self.tick_hz).max(1)
    }
}

impl Cpu for SimBoard {
    fn cycle_count(&self) -> u32 {
        let now = self.clock.get();
        self.clock.set(now.wrapping_add(self.read_cost.get()));
        now
    }

    fn cpu_hz(&self) -> u32 {
        self.cpu_hz.get()
    }

    fn yield_now(&self) {
        self.wait();
    }

    fn relax(&self) {
        self.wait();
    }
}

impl OutputBank for SimBoard {
    fn set_high(&self, pin: u8) {
        self.drive(pin, true);
    }

    fn set_low(&self, pin: u8) {
        self.drive(pin, false);
    }
}

impl OneShotTimer for SimBoard {
    fn tick_hz(&self) -> u32 {
        self.tick_hz
    }

    fn attach(&self, isr: &'static dyn InterruptService) {
        self.isr.set(Some(isr));
    }

    fn detach(&self) {
        self.isr.set(None);
    }

    fn enable(&self) {
        self.enabled.set(true);
    }

    fn disable(&self) {
        self.enabled.set(false);
        self.fire_at.set(None);
    }

    fn write(&self, ticks: u32) {
        let ccys = ticks.wrapping_mul(self.ccys_per_tick());
        self.fire_at.set(Some(self.clock.get().wrapping_add(ccys)));
    }

    fn remaining(&self) -> u32 {
        match self.fire_at.get() {
            Some(at) if self.enabled.get() => {
                let left = at.wrapping_sub(self.clock.get()) as i32;
                if left > 0 {
                    left as u32 / self.ccys_per_tick()
                } else {
                    0
                }
            }
            _ => 0,
        }
    }
}

impl InterruptReturn for SimBoard {
    fn saved_return(&self) -> Option<ReturnFrame> {
        self.in_isr.get().then(|| self.frame.get())
    }

    fn restore_return(&self, frame: ReturnFrame) {
        if self.in_isr.get() {
            self.frame.set(frame);
        }
    }

    fn in_handler(&self, pc: u32) -> bool {
        (HANDLER_START..HANDLER_END).contains(&pc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counter {
        hits: AtomicU32,
        at: AtomicU32,
        board: &'static SimBoard,
    }

    impl InterruptService for Counter {
        fn on_interrupt(&self) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            self.at.store(self.board.now(), Ordering::Relaxed);
        }
    }

    fn rig(board: SimBoard) -> (&'static SimBoard, &'static Counter) {
        let board: &'static SimBoard = Box::leak(Box::new(board));
        let counter: &'static Counter = Box::leak(Box::new(Counter {
            hits: AtomicU32::new(0),
            at: AtomicU32::new(0),
            board,
        }));
        board.attach(counter);
        board.enable();
        (board, counter)
    }

    #[test]
    fn test_cycle_count_costs_a_read() {
        let board = SimBoard::esp8266().starting_at(100);
        assert_eq!(board.cycle_count(), 100);
        assert_eq!(board.cycle_count(), 101);
        assert_eq!(board.now(), 102);
    }

    #[test]
    fn test_firing_lands_after_entry_latency() {
        let (board, counter) = rig(SimBoard::esp8266().starting_at(1000));
        board.write(500);
        assert_eq!(board.remaining(), 500);

        board.advance(10_000);
        assert_eq!(counter.hits.load(Ordering::Relaxed), 1);
        assert_eq!(counter.at.load(Ordering::Relaxed), 1000 + 500 + 160);
        assert_eq!(board.last_entry(), Some(1000 + 500 + 160));
        assert_eq!(board.now(), 11_000);
        assert_eq!(board.remaining(), 0);
    }

    #[test]
    fn test_firing_outside_window_waits() {
        let (board, counter) = rig(SimBoard::esp8266());
        board.write(5000);
        board.advance(1000);
        assert_eq!(counter.hits.load(Ordering::Relaxed), 0);
        assert!(board.remaining() > 0);
    }

    #[test]
    fn test_tick_ratio_at_double_clock() {
        let (board, counter) = rig(SimBoard::new(160_000_000, 80_000_000, 160));
        board.write(100);
        board.advance(1000);
        assert_eq!(counter.at.load(Ordering::Relaxed), 200 + 160);
    }

    #[test]
    fn test_firing_across_counter_wrap() {
        let (board, counter) = rig(SimBoard::esp8266().starting_at(u32::MAX - 50));
        board.write(100);
        board.advance(1000);
        assert_eq!(counter.hits.load(Ordering::Relaxed), 1);
        assert_eq!(counter.at.load(Ordering::Relaxed), 49 + 160);
    }

    #[test]
    fn test_yield_delivers_pending_firing() {
        let (board, counter) = rig(SimBoard::esp8266());
        board.write(10);
        board.yield_now();
        assert_eq!(counter.hits.load(Ordering::Relaxed), 1);
        // Nothing pending: time still moves
        let before = board.now();
        board.relax();
        assert_eq!(board.now(), before + 1);
    }

    #[test]
    fn test_detached_timer_never_fires() {
        let (board, counter) = rig(SimBoard::esp8266());
        board.write(10);
        board.detach();
        board.advance(10_000);
        assert_eq!(counter.hits.load(Ordering::Relaxed), 0);
        assert!(!board.is_attached());
    }

    #[test]
    fn test_only_transitions_traced() {
        let board = SimBoard::esp8266();
        board.set_low(3);
        board.set_high(3);
        board.set_high(3);
        board.set_low(3);
        let trace = board.trace();
        assert_eq!(trace.edges().len(), 2);
        assert!(!board.level(3));
    }

    #[test]
    fn test_unrepaired_fault_counts_stall() {
        let (board, _) = rig(SimBoard::esp8266());
        board.inject_return_fault();
        board.write(10);
        board.advance(1000);
        assert_eq!(board.stalls(), 1);
        assert!(board.in_handler(board.last_return().pc));
    }
}
