use alloc::boxed::Box;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::Spsc;

/// A single atomically-swapped cell, used when an operator's prefetch is 1
/// and a full ring buffer would be overkill (the design calls this out as
/// its own queue shape rather than a `Bounded::new(1)`).
pub struct OneSlot<T> {
    slot: AtomicPtr<T>,
}

// SAFETY: the slot is a single heap allocation moved atomically between the
// producer and consumer; never aliased, never read after being swapped out.
unsafe impl<T: Send> Send for OneSlot<T> {}
unsafe impl<T: Send> Sync for OneSlot<T> {}

impl<T> OneSlot<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

impl<T> Default for OneSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Spsc<T> for OneSlot<T> {
    fn push(&self, value: T) -> Result<(), T> {
        let boxed = Box::into_raw(Box::new(value));
        match self
            .slot
            .compare_exchange(ptr::null_mut(), boxed, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(_) => {
                // SAFETY: the CAS failed, so this box was never published;
                // we still own the only reference to it.
                let value = unsafe { *Box::from_raw(boxed) };
                Err(value)
            }
        }
    }

    fn pop(&self) -> Option<T> {
        let ptr = self.slot.swap(ptr::null_mut(), Ordering::AcqRel);
        if ptr.is_null() {
            None
        } else {
            // SAFETY: this pointer was published by `push` via `Box::into_raw`
            // and the swap above is the only place that can observe it again.
            Some(unsafe { *Box::from_raw(ptr) })
        }
    }

    fn is_empty(&self) -> bool {
        self.slot.load(Ordering::Acquire).is_null()
    }

    fn len(&self) -> usize {
        usize::from(!self.is_empty())
    }
}

impl<T> Drop for OneSlot<T> {
    fn drop(&mut self) {
        self.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_at_most_one_value() {
        let q: OneSlot<i32> = OneSlot::new();
        assert!(q.push(1).is_ok());
        assert_eq!(q.push(2), Err(2));
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn can_be_refilled_after_pop() {
        let q: OneSlot<i32> = OneSlot::new();
        q.push(1).unwrap();
        q.pop().unwrap();
        assert!(q.push(2).is_ok());
        assert_eq!(q.pop(), Some(2));
    }
}
