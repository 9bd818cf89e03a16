use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::Spsc;

/// A lock-free single-producer/single-consumer ring buffer.
///
/// Capacity is rounded up to the next power of two so index wraparound can be
/// done with a mask instead of a modulo. `head`/`tail` are each wrapped in a
/// [`CachePadded`] so the producer and consumer don't thrash the same cache
/// line on every push/pop — the one concession this queue makes to the
/// "padded head/tail" note in the design.
pub struct Bounded<T> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
}

// SAFETY: `Bounded` hands out exactly one producer capability (`push`) and
// one consumer capability (`pop`); the slot a push writes is never read by
// another push, and the slot a pop reads is never written by another pop.
unsafe impl<T: Send> Send for Bounded<T> {}
unsafe impl<T: Send> Sync for Bounded<T> {}

impl<T> Bounded<T> {
    #[must_use]
    pub fn new(requested_capacity: usize) -> Self {
        let capacity = requested_capacity.max(1).next_power_of_two();
        let mut buffer = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            buffer.push(UnsafeCell::new(MaybeUninit::uninit()));
        }
        Self {
            buffer: buffer.into_boxed_slice(),
            mask: capacity - 1,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }
}

impl<T> Spsc<T> for Bounded<T> {
    fn push(&self, value: T) -> Result<(), T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) >= self.capacity() {
            return Err(value);
        }
        let idx = tail & self.mask;
        // SAFETY: this slot was vacated by the consumer before `head` advanced
        // past it, and only the single producer ever writes here.
        unsafe {
            (*self.buffer[idx].get()).write(value);
        }
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let idx = head & self.mask;
        // SAFETY: the producer published this slot via `tail`'s Release
        // store, observed above via Acquire; only the single consumer reads.
        let value = unsafe { (*self.buffer[idx].get()).assume_init_read() };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }
}

impl<T> Drop for Bounded<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_capacity_up_to_power_of_two() {
        let q: Bounded<i32> = Bounded::new(5);
        assert_eq!(q.capacity(), 8);
    }

    #[test]
    fn fifo_order_and_overflow() {
        let q: Bounded<i32> = Bounded::new(2);
        assert!(q.push(1).is_ok());
        assert!(q.push(2).is_ok());
        assert_eq!(q.push(3), Err(3));
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn clear_discards_every_pending_value() {
        let q: Bounded<i32> = Bounded::new(4);
        q.push(1).unwrap();
        q.push(2).unwrap();
        let mut discarded = Vec::new();
        q.clear(|v| discarded.push(v));
        assert_eq!(discarded, vec![1, 2]);
        assert!(q.is_empty());
    }
}
