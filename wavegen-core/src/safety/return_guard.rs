//! Stuck interrupt-return repair
//!
//! Runs first on every firing. A saved return address outside the handler
//! is a real interrupted context and is cached; one inside the handler is
//! the fault signature and gets overwritten with the cached frame, which
//! breaks the stall before the handler returns.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use wavegen_hal::{InterruptReturn, ReturnFrame};

/// Result of one guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GuardOutcome {
    /// Platform has no erratum to guard against
    NotApplicable,
    /// Frame was good and is now the cached backup
    Cached,
    /// Frame pointed into the handler and was replaced by the backup
    Restored,
    /// Frame pointed into the handler but no good frame was seen yet
    NoBackup,
}

/// Cached last-good return frame
///
/// Only plain loads and stores: the guard runs in an interrupt that may
/// not have atomic read-modify-write available.
#[derive(Debug)]
pub struct ReturnGuard {
    pc: AtomicU32,
    ps: AtomicU32,
    primed: AtomicBool,
    repairs: AtomicU32,
}

impl Default for ReturnGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ReturnGuard {
    /// Create a guard with no cached frame
    pub const fn new() -> Self {
        Self {
            pc: AtomicU32::new(0),
            ps: AtomicU32::new(0),
            primed: AtomicBool::new(false),
            repairs: AtomicU32::new(0),
        }
    }

    /// Inspect the saved return frame and repair it if needed
    pub fn repair<R: InterruptReturn + ?Sized>(&self, hw: &R) -> GuardOutcome {
        let Some(frame) = hw.saved_return() else {
            return GuardOutcome::NotApplicable;
        };

        if !hw.in_handler(frame.pc) {
            self.pc.store(frame.pc, Ordering::Relaxed);
            self.ps.store(frame.ps, Ordering::Relaxed);
            self.primed.store(true, Ordering::Relaxed);
            return GuardOutcome::Cached;
        }

        if !self.primed.load(Ordering::Relaxed) {
            return GuardOutcome::NoBackup;
        }

        hw.restore_return(self.last_good());
        let repairs = self.repairs.load(Ordering::Relaxed);
        self.repairs.store(repairs.wrapping_add(1), Ordering::Relaxed);
        GuardOutcome::Restored
    }

    /// Most recently cached good frame
    pub fn last_good(&self) -> ReturnFrame {
        ReturnFrame::new(
            self.pc.load(Ordering::Relaxed),
            self.ps.load(Ordering::Relaxed),
        )
    }

    /// Number of frames repaired so far
    pub fn repairs(&self) -> u32 {
        self.repairs.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    const HANDLER_START: u32 = 0x4010_0000;
    const HANDLER_END: u32 = 0x4010_0100;

    struct FakeCore {
        frame: Cell<ReturnFrame>,
    }

    impl InterruptReturn for FakeCore {
        fn saved_return(&self) -> Option<ReturnFrame> {
            Some(self.frame.get())
        }

        fn restore_return(&self, frame: ReturnFrame) {
            self.frame.set(frame);
        }

        fn in_handler(&self, pc: u32) -> bool {
            (HANDLER_START..HANDLER_END).contains(&pc)
        }
    }

    struct NoErratum;

    impl InterruptReturn for NoErratum {}

    #[test]
    fn test_good_frame_is_cached() {
        let guard = ReturnGuard::new();
        let core = FakeCore {
            frame: Cell::new(ReturnFrame::new(0x4020_1234, 0x23)),
        };

        assert_eq!(guard.repair(&core), GuardOutcome::Cached);
        assert_eq!(guard.last_good(), ReturnFrame::new(0x4020_1234, 0x23));
        assert_eq!(guard.repairs(), 0);
    }

    #[test]
    fn test_handler_frame_is_restored() {
        let guard = ReturnGuard::new();
        let core = FakeCore {
            frame: Cell::new(ReturnFrame::new(0x4020_1234, 0x23)),
        };
        guard.repair(&core);

        // Fault signature: return address inside the handler
        core.frame.set(ReturnFrame::new(HANDLER_START + 8, 0x33));
        assert_eq!(guard.repair(&core), GuardOutcome::Restored);
        assert_eq!(core.frame.get(), ReturnFrame::new(0x4020_1234, 0x23));
        assert_eq!(guard.repairs(), 1);

        // Backup is not replaced by the faulty frame
        assert_eq!(guard.last_good(), ReturnFrame::new(0x4020_1234, 0x23));
    }

    #[test]
    fn test_no_backup_leaves_frame_alone() {
        let guard = ReturnGuard::new();
        let core = FakeCore {
            frame: Cell::new(ReturnFrame::new(HANDLER_START, 0x33)),
        };

        assert_eq!(guard.repair(&core), GuardOutcome::NoBackup);
        assert_eq!(core.frame.get(), ReturnFrame::new(HANDLER_START, 0x33));
    }

    #[test]
    fn test_platform_without_erratum() {
        let guard = ReturnGuard::new();
        assert_eq!(guard.repair(&NoErratum), GuardOutcome::NotApplicable);
        assert_eq!(guard.repairs(), 0);
    }
}
