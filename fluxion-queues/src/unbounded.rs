use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::{Cell, UnsafeCell};
use core::mem::MaybeUninit;
use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use crate::Spsc;

/// Number of slots per chained segment. Kept a power of two purely by
/// convention with the bounded queue; nothing here relies on masking.
const SEGMENT_SIZE: usize = 32;

struct Segment<T> {
    cells: Box<[UnsafeCell<MaybeUninit<T>>]>,
    next: AtomicPtr<Segment<T>>,
}

impl<T> Segment<T> {
    fn new() -> *mut Self {
        let mut cells = Vec::with_capacity(SEGMENT_SIZE);
        for _ in 0..SEGMENT_SIZE {
            cells.push(UnsafeCell::new(MaybeUninit::uninit()));
        }
        Box::into_raw(Box::new(Self {
            cells: cells.into_boxed_slice(),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }
}

/// An unbounded SPSC queue built from a forward-linked chain of fixed-size
/// segments, used by sinks where no upper bound on buffered items is known
/// (the caller has opted into unbounded buffering; see the Non-goals in the
/// design around bounded-memory guarantees).
///
/// The producer appends to the tail segment and links a fresh one in when it
/// fills up; the consumer walks forward and frees segments as it drains past
/// them. Because there is exactly one producer and one consumer, the
/// forward-pointer link needs no CAS: the producer's `Release` store of
/// `next`, observed by the consumer's `Acquire` load of the shared length
/// counter, is enough to publish it safely.
pub struct Unbounded<T> {
    write_segment: Cell<*mut Segment<T>>,
    write_idx: Cell<usize>,
    read_segment: Cell<*mut Segment<T>>,
    read_idx: Cell<usize>,
    length: AtomicUsize,
}

// SAFETY: `write_*` fields are only ever touched from `push`, `read_*` only
// from `pop`; the contract of this type is single-producer/single-consumer.
unsafe impl<T: Send> Send for Unbounded<T> {}
unsafe impl<T: Send> Sync for Unbounded<T> {}

impl<T> Unbounded<T> {
    #[must_use]
    pub fn new() -> Self {
        let initial = Segment::new();
        Self {
            write_segment: Cell::new(initial),
            write_idx: Cell::new(0),
            read_segment: Cell::new(initial),
            read_idx: Cell::new(0),
            length: AtomicUsize::new(0),
        }
    }
}

impl<T> Default for Unbounded<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Spsc<T> for Unbounded<T> {
    fn push(&self, value: T) -> Result<(), T> {
        let seg = self.write_segment.get();
        let idx = self.write_idx.get();
        // SAFETY: only `push` writes into the write segment, at the
        // producer-owned index, which is always within bounds.
        unsafe {
            (*(*seg).cells[idx].get()).write(value);
        }
        if idx + 1 == SEGMENT_SIZE {
            let new_seg = Segment::new();
            // SAFETY: `seg` is the current write segment, exclusively owned
            // by the producer until linked.
            unsafe {
                (*seg).next.store(new_seg, Ordering::Release);
            }
            self.write_segment.set(new_seg);
            self.write_idx.set(0);
        } else {
            self.write_idx.set(idx + 1);
        }
        self.length.fetch_add(1, Ordering::Release);
        Ok(())
    }

    fn pop(&self) -> Option<T> {
        if self.length.load(Ordering::Acquire) == 0 {
            return None;
        }
        let seg = self.read_segment.get();
        let idx = self.read_idx.get();
        // SAFETY: `length > 0` guarantees this slot was published by a push
        // that happened-before this load (via the length counter's
        // release/acquire pair), and only `pop` reads the read segment.
        let value = unsafe { (*(*seg).cells[idx].get()).assume_init_read() };
        if idx + 1 == SEGMENT_SIZE {
            // SAFETY: length > 0 at a segment boundary means the producer
            // has already linked and published the next segment.
            let next = unsafe { (*seg).next.load(Ordering::Acquire) };
            debug_assert!(!next.is_null(), "producer must link before crossing");
            self.read_segment.set(next);
            self.read_idx.set(0);
            // SAFETY: no other reference to `seg` survives past this point;
            // the producer never touches a segment once it links the next.
            unsafe {
                drop(Box::from_raw(seg));
            }
        } else {
            self.read_idx.set(idx + 1);
        }
        self.length.fetch_sub(1, Ordering::AcqRel);
        Some(value)
    }

    fn is_empty(&self) -> bool {
        self.length.load(Ordering::Acquire) == 0
    }

    fn len(&self) -> usize {
        self.length.load(Ordering::Acquire)
    }
}

impl<T> Drop for Unbounded<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
        // SAFETY: after draining every value, the single remaining segment
        // (read_segment == write_segment) is still live and must be freed.
        unsafe {
            drop(Box::from_raw(self.read_segment.get()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_across_many_segments() {
        let q: Unbounded<i32> = Unbounded::new();
        let n = SEGMENT_SIZE * 3 + 5;
        for i in 0..n {
            q.push(i as i32).unwrap();
        }
        assert_eq!(q.len(), n);
        for i in 0..n {
            assert_eq!(q.pop(), Some(i as i32));
        }
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn interleaved_push_pop_across_boundary() {
        let q: Unbounded<i32> = Unbounded::new();
        for i in 0..SEGMENT_SIZE {
            q.push(i as i32).unwrap();
        }
        for i in 0..SEGMENT_SIZE / 2 {
            assert_eq!(q.pop(), Some(i as i32));
        }
        for i in SEGMENT_SIZE..SEGMENT_SIZE + 4 {
            q.push(i as i32).unwrap();
        }
        for i in SEGMENT_SIZE / 2..SEGMENT_SIZE + 4 {
            assert_eq!(q.pop(), Some(i as i32));
        }
        assert_eq!(q.pop(), None);
    }
}
