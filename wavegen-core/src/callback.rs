//! Lock-free slot for the secondary callback
//!
//! Written from ordinary code, read on every interrupt firing. Only plain
//! loads and stores are used since some supported cores have no atomic
//! read-modify-write.

use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::SecondaryCallback;

/// Optional `fn() -> u32` stored as an atomic pointer
#[derive(Debug)]
pub(crate) struct CallbackSlot {
    raw: AtomicPtr<()>,
}

impl CallbackSlot {
    pub(crate) const fn new() -> Self {
        Self {
            raw: AtomicPtr::new(ptr::null_mut()),
        }
    }

    pub(crate) fn store(&self, callback: Option<SecondaryCallback>) {
        let raw = match callback {
            Some(f) => f as *mut (),
            None => ptr::null_mut(),
        };
        self.raw.store(raw, Ordering::Release);
    }

    #[allow(unsafe_code)]
    pub(crate) fn load(&self) -> Option<SecondaryCallback> {
        let raw = self.raw.load(Ordering::Acquire);
        if raw.is_null() {
            None
        } else {
            // SAFETY: `store` is the only writer and only ever stores null or
            // a `SecondaryCallback` cast to a data pointer.
            Some(unsafe { core::mem::transmute::<*mut (), SecondaryCallback>(raw) })
        }
    }

    pub(crate) fn is_set(&self) -> bool {
        !self.raw.load(Ordering::Acquire).is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_thousand() -> u32 {
        1000
    }

    #[test]
    fn test_store_and_load() {
        let slot = CallbackSlot::new();
        assert!(!slot.is_set());
        assert!(slot.load().is_none());

        slot.store(Some(every_thousand));
        assert!(slot.is_set());
        assert_eq!(slot.load().map(|f| f()), Some(1000));

        slot.store(None);
        assert!(slot.load().is_none());
    }
}
