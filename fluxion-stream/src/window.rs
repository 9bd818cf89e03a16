// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `window`: like [`crate::buffer`], but each segment is re-exposed
//! as a `Flux<T>` instead of materialized as a `Vec<T>` — the design's
//! "window (size/time/boundary)" sibling to the buffer deep dive.
//!
//! Built directly on top of [`crate::buffer`]: a window is a buffered
//! segment wrapped back into a one-shot `Flux` ([`fluxion_stream_multi::from_array`]).
//! This keeps the segment-cutting state machine in exactly one place
//! (buffer's) rather than duplicating the boundary/count bookkeeping for a
//! second time with a live per-window queue.

use alloc::vec::Vec;

use fluxion_stream_core::Flux;
use fluxion_stream_multi::{from_array, map};

use crate::buffer::{buffer_boundary, buffer_count};

/// `window(boundary)`: re-segment `main` every time `boundary` emits,
/// handing each segment to the downstream as its own `Flux<T>`.
pub fn window_boundary<T, U>(main: Flux<T>, boundary: Flux<U>) -> Flux<Flux<T>>
where
    T: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    map(buffer_boundary(main, boundary), |segment: Vec<T>| {
        from_array(segment)
    })
}

/// `window(size)`: re-segment `main` into fixed-size runs, handing each run
/// to the downstream as its own `Flux<T>`.
///
/// # Panics
/// Panics if `size == 0`.
pub fn window_count<T: Clone + Send + Sync + 'static>(main: Flux<T>, size: usize) -> Flux<Flux<T>> {
    map(buffer_count(main, size), |segment: Vec<T>| from_array(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use fluxion_core::subscription::UNBOUNDED;
    use fluxion_stream_multi::from_array as source;
    use fluxion_test_utils::step_verifier::{run_to_completion, TestSubscriber};

    #[test]
    fn window_boundary_emits_inner_fluxes_per_segment() {
        let main = source(alloc::vec![1, 2, 3, 4, 5]);
        let boundary = source(alloc::vec![(), ()]);
        let flux = window_boundary(main, boundary);
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(3, Duration::from_secs(1)));
        let windows = subscriber.values();
        assert_eq!(windows.len(), 3);
        let first = run_to_completion(&windows[0], Duration::from_secs(1));
        assert_eq!(first.values(), alloc::vec![1, 2]);
        let last = run_to_completion(&windows[2], Duration::from_secs(1));
        assert_eq!(last.values(), alloc::vec![5]);
    }

    #[test]
    fn window_count_emits_fixed_size_inner_fluxes() {
        let main = source(alloc::vec![1, 2, 3, 4, 5]);
        let flux = window_count(main, 2);
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(3, Duration::from_secs(1)));
        let windows = subscriber.values();
        let middle = run_to_completion(&windows[1], Duration::from_secs(1));
        assert_eq!(middle.values(), alloc::vec![3, 4]);
    }
}
