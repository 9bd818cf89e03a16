#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::multiple_crate_versions)]
//! Single-producer/single-consumer queues backing Fluxion's drain loops and
//! fusion fast path.
//!
//! Every operator that needs to hand values from a producer thread to a
//! consumer-driven `poll` does so through one of the three queue shapes here:
//!
//! - [`OneSlot`] — a single atomically-swapped cell, used when an operator's
//!   prefetch is exactly 1 (e.g. a `switchMap`/`concatMap` inner with no
//!   overlap allowed).
//! - [`Bounded`] — a lock-free ring buffer of capacity rounded up to a power
//!   of two, used between stages with a known prefetch.
//! - [`Unbounded`] — a linked chain of power-of-two arrays, used for sinks
//!   (multicast, `publish`) where no upper bound on buffered items is known.
//!
//! [`new_queue`] picks among the three the way the distilled design calls
//! for: capacity `1` gets a [`OneSlot`], capacity greater than
//! [`UNBOUNDED_THRESHOLD`] gets an [`Unbounded`], anything else gets a
//! [`Bounded`] of that (power-of-two-rounded) capacity.

extern crate alloc;

mod bounded;
mod one_slot;
mod unbounded;

pub use bounded::Bounded;
pub use one_slot::OneSlot;
pub use unbounded::Unbounded;

/// A capacity request above this threshold is treated as "unbounded" by
/// [`new_queue`], matching the distilled design's `>10M` rule of thumb.
pub const UNBOUNDED_THRESHOLD: usize = 10_000_000;

/// A minimal single-producer/single-consumer queue capability.
///
/// Implementations never block: `push` fails (returning the value back) when
/// full, `pop` returns `None` when empty. Callers build back-pressure and
/// wake-ups on top of this, as the drain-loop pattern in `fluxion-stream-core`
/// does.
pub trait Spsc<T> {
    /// Push a value. Returns it back on overflow so the caller can route it
    /// through the overflow-error path instead of silently dropping it.
    fn push(&self, value: T) -> Result<(), T>;

    /// Pop the oldest value, if any.
    fn pop(&self) -> Option<T>;

    /// True iff no value is currently queued. Racy under concurrent push,
    /// but that race is inherent to SPSC: only the consumer thread is
    /// entitled to treat the answer as authoritative.
    fn is_empty(&self) -> bool;

    /// Drop every queued value without returning them; used when an operator
    /// must clear its buffer on cancellation and pass each discarded value to
    /// the context's discard hook.
    fn clear(&self, mut discard: impl FnMut(T)) {
        while let Some(v) = self.pop() {
            discard(v);
        }
    }

    /// Best-effort count of queued items. `usize::MAX` for queues (like the
    /// unbounded chain) that would need to walk their structure to know for
    /// sure and choose not to.
    fn len(&self) -> usize;
}

/// Either queue shape produced by [`new_queue`], so callers don't need to be
/// generic over which one was picked.
pub enum AnyQueue<T> {
    /// Backing queue is a [`OneSlot`].
    One(OneSlot<T>),
    /// Backing queue is a [`Bounded`] ring buffer.
    Bounded(Bounded<T>),
    /// Backing queue is an [`Unbounded`] linked chain.
    Unbounded(Unbounded<T>),
}

impl<T> Spsc<T> for AnyQueue<T> {
    fn push(&self, value: T) -> Result<(), T> {
        match self {
            Self::One(q) => q.push(value),
            Self::Bounded(q) => q.push(value),
            Self::Unbounded(q) => q.push(value),
        }
    }

    fn pop(&self) -> Option<T> {
        match self {
            Self::One(q) => q.pop(),
            Self::Bounded(q) => q.pop(),
            Self::Unbounded(q) => q.pop(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::One(q) => q.is_empty(),
            Self::Bounded(q) => q.is_empty(),
            Self::Unbounded(q) => q.is_empty(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::One(q) => q.len(),
            Self::Bounded(q) => q.len(),
            Self::Unbounded(q) => q.len(),
        }
    }
}

/// Build the queue shape appropriate for a requested capacity.
///
/// `1` yields a [`OneSlot`]; anything above [`UNBOUNDED_THRESHOLD`] yields an
/// [`Unbounded`] chain; everything else yields a [`Bounded`] ring buffer
/// whose real capacity is `requested` rounded up to the next power of two.
#[must_use]
pub fn new_queue<T>(requested: usize) -> AnyQueue<T> {
    match requested {
        0 | 1 => AnyQueue::One(OneSlot::new()),
        n if n > UNBOUNDED_THRESHOLD => AnyQueue::Unbounded(Unbounded::new()),
        n => AnyQueue::Bounded(Bounded::new(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_one_slot_for_capacity_one() {
        assert!(matches!(new_queue::<i32>(1), AnyQueue::One(_)));
    }

    #[test]
    fn picks_unbounded_above_threshold() {
        assert!(matches!(
            new_queue::<i32>(UNBOUNDED_THRESHOLD + 1),
            AnyQueue::Unbounded(_)
        ));
    }

    #[test]
    fn picks_bounded_otherwise() {
        assert!(matches!(new_queue::<i32>(128), AnyQueue::Bounded(_)));
    }
}
