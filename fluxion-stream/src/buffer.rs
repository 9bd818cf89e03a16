// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `buffer`: collect upstream elements
//! into `Vec<T>` segments, cut either by a boundary publisher's pulses or
//! by a fixed element count.
//!
//! The boundary variant is the one the design singles out: `current` is
//! mutated from two independent producer threads (the main upstream and
//! the boundary upstream), so every mutation happens inside one critical
//! section (`state.current`), matching .G's "all mutations of `current`
//! are inside an operator-local critical section" rule.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use fluxion_core::context::Context;
use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::operators::{add_cap, on_discard, sub_or_zero};
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_core::subscription::{Subscription, UNBOUNDED};
use fluxion_error::FluxionError;
use fluxion_stream_core::Flux;

struct BoundaryState<T: Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<Vec<T>>>,
    current: Mutex<Option<Vec<T>>>,
    requested: AtomicU64,
    main_subscription: Mutex<Option<Arc<dyn Subscription>>>,
    boundary_subscription: Mutex<Option<Arc<dyn Subscription>>>,
    terminated: AtomicBool,
}

impl<T: Send + Sync + 'static> BoundaryState<T> {
    fn discard_remaining(&self) {
        if let Some(buf) = self.current.lock().take() {
            for value in buf {
                on_discard(self.downstream.current_context(), value);
            }
        }
    }

    fn cancel_all(&self) {
        if let Some(sub) = self.main_subscription.lock().clone() {
            sub.cancel();
        }
        if let Some(sub) = self.boundary_subscription.lock().clone() {
            sub.cancel();
        }
    }

    fn terminate_with_error(&self, error: FluxionError) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel_all();
        self.discard_remaining();
        self.downstream.on_error(error);
    }

    /// Swap `current` for a fresh, empty collection and emit the old one
    /// downstream, provided it is non-empty and demand allows. Zero demand
    /// with a non-empty buffer is an overflow, not a silent drop.
    fn swap_and_emit(&self) {
        let emitted = {
            let mut guard = self.current.lock();
            match guard.as_mut() {
                Some(buf) if !buf.is_empty() => Some(core::mem::replace(buf, Vec::new())),
                _ => None,
            }
        };
        let Some(buf) = emitted else { return };
        loop {
            let current = self.requested.load(Ordering::Acquire);
            if current == 0 {
                self.terminate_with_error(FluxionError::overflow(
                    "buffer",
                    "boundary pulsed but downstream has no outstanding demand",
                ));
                return;
            }
            let next = sub_or_zero(current, 1);
            if self
                .requested
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }
        self.downstream.on_next(buf);
    }
}

struct MainSubscriber<T: Send + Sync + 'static> {
    state: Arc<BoundaryState<T>>,
}

impl<T: Send + Sync + 'static> Subscriber<T> for MainSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.state.main_subscription.lock() = Some(subscription.clone());
        subscription.request(UNBOUNDED);
    }

    fn on_next(&self, value: T) {
        if self.state.terminated.load(Ordering::Acquire) {
            fluxion_core::operators::on_next_dropped(self.state.downstream.current_context(), value);
            return;
        }
        let mut guard = self.state.current.lock();
        match guard.as_mut() {
            Some(buf) => buf.push(value),
            None => drop(guard),
        }
    }

    fn on_error(&self, error: FluxionError) {
        self.state.terminate_with_error(error);
    }

    fn on_complete(&self) {
        if self.state.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(sub) = self.state.boundary_subscription.lock().clone() {
            sub.cancel();
        }
        let last = self.state.current.lock().take();
        if let Some(buf) = last {
            if !buf.is_empty() {
                if self.state.requested.load(Ordering::Acquire) >= 1 {
                    self.state.requested.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                        Some(sub_or_zero(n, 1))
                    }).ok();
                    self.state.downstream.on_next(buf);
                } else {
                    for value in buf {
                        on_discard(self.state.downstream.current_context(), value);
                    }
                }
            }
        }
        self.state.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static> CoreSubscriber<T> for MainSubscriber<T> {
    fn current_context(&self) -> &Context {
        self.state.downstream.current_context()
    }
}

struct BoundarySubscriber<T: Send + Sync + 'static, U: Send + Sync + 'static> {
    state: Arc<BoundaryState<T>>,
    _marker: core::marker::PhantomData<fn(U)>,
}

impl<T: Send + Sync + 'static, U: Send + Sync + 'static> Subscriber<U> for BoundarySubscriber<T, U> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.state.boundary_subscription.lock() = Some(subscription.clone());
        subscription.request(UNBOUNDED);
    }

    fn on_next(&self, _value: U) {
        self.state.swap_and_emit();
    }

    fn on_error(&self, error: FluxionError) {
        self.state.terminate_with_error(error);
    }

    fn on_complete(&self) {
        // The boundary ending does not end the main sequence; it simply
        // stops cutting new segments. Remaining elements join the final
        // buffer emitted when `main` completes.
    }
}

impl<T: Send + Sync + 'static, U: Send + Sync + 'static> CoreSubscriber<U> for BoundarySubscriber<T, U> {
    fn current_context(&self) -> &Context {
        self.state.downstream.current_context()
    }
}

struct BufferSubscription<T: Send + Sync + 'static> {
    state: Arc<BoundaryState<T>>,
}

impl<T: Send + Sync + 'static> Subscription for BufferSubscription<T> {
    fn request(&self, n: u64) {
        self.state.requested.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            Some(add_cap(current, n))
        }).ok();
    }

    fn cancel(&self) {
        if self.state.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.cancel_all();
        self.state.discard_remaining();
    }
}

struct BufferBoundaryPublisher<T: Send + Sync + 'static, U: Send + Sync + 'static> {
    main: Flux<T>,
    boundary: Flux<U>,
}

impl<T: Send + Sync + 'static, U: Send + Sync + 'static> Publisher<Vec<T>> for BufferBoundaryPublisher<T, U> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<Vec<T>>>) {
        let state = Arc::new(BoundaryState {
            downstream: subscriber,
            current: Mutex::new(Some(Vec::new())),
            requested: AtomicU64::new(0),
            main_subscription: Mutex::new(None),
            boundary_subscription: Mutex::new(None),
            terminated: AtomicBool::new(false),
        });
        state
            .downstream
            .on_subscribe(Arc::new(BufferSubscription { state: Arc::clone(&state) }));
        self.boundary.subscribe_arc(Arc::new(BoundarySubscriber {
            state: Arc::clone(&state),
            _marker: core::marker::PhantomData,
        }));
        self.main.subscribe_arc(Arc::new(MainSubscriber { state }));
    }
}

/// `buffer(boundary)`: cut `main` into `Vec<T>` segments every time
/// `boundary` emits. The boundary's own values are discarded; only its
/// pulses (and terminal signals) matter.
pub fn buffer_boundary<T, U>(main: Flux<T>, boundary: Flux<U>) -> Flux<Vec<T>>
where
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    Flux::from_publisher(BufferBoundaryPublisher { main, boundary })
}

struct CountState<T: Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<Vec<T>>>,
    current: Mutex<Vec<T>>,
    size: usize,
    requested: AtomicU64,
    main_subscription: Mutex<Option<Arc<dyn Subscription>>>,
    terminated: AtomicBool,
}

struct CountSubscriber<T: Send + Sync + 'static> {
    state: Arc<CountState<T>>,
}

impl<T: Send + Sync + 'static> Subscriber<T> for CountSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.state.main_subscription.lock() = Some(subscription.clone());
        subscription.request(UNBOUNDED);
    }

    fn on_next(&self, value: T) {
        if self.state.terminated.load(Ordering::Acquire) {
            fluxion_core::operators::on_next_dropped(self.state.downstream.current_context(), value);
            return;
        }
        let full = {
            let mut guard = self.state.current.lock();
            guard.push(value);
            guard.len() >= self.state.size
        };
        if full {
            let buf = core::mem::take(&mut *self.state.current.lock());
            let ok = self.state.requested.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                if n == 0 { None } else { Some(sub_or_zero(n, 1)) }
            }).is_ok();
            if ok {
                self.state.downstream.on_next(buf);
            } else {
                if self.state.terminated.swap(true, Ordering::AcqRel) {
                    return;
                }
                if let Some(sub) = self.state.main_subscription.lock().clone() {
                    sub.cancel();
                }
                for value in buf {
                    on_discard(self.state.downstream.current_context(), value);
                }
                self.state.downstream.on_error(FluxionError::overflow(
                    "buffer",
                    "count buffer closed but downstream has no outstanding demand",
                ));
            }
        }
    }

    fn on_error(&self, error: FluxionError) {
        if self.state.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        for value in core::mem::take(&mut *self.state.current.lock()) {
            on_discard(self.state.downstream.current_context(), value);
        }
        self.state.downstream.on_error(error);
    }

    fn on_complete(&self) {
        if self.state.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        let buf = core::mem::take(&mut *self.state.current.lock());
        if !buf.is_empty() {
            self.state.downstream.on_next(buf);
        }
        self.state.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static> CoreSubscriber<T> for CountSubscriber<T> {
    fn current_context(&self) -> &Context {
        self.state.downstream.current_context()
    }
}

struct CountSubscription<T: Send + Sync + 'static> {
    state: Arc<CountState<T>>,
}

impl<T: Send + Sync + 'static> Subscription for CountSubscription<T> {
    fn request(&self, n: u64) {
        self.state.requested.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            Some(add_cap(current, n))
        }).ok();
    }

    fn cancel(&self) {
        if self.state.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(sub) = self.state.main_subscription.lock().clone() {
            sub.cancel();
        }
        for value in core::mem::take(&mut *self.state.current.lock()) {
            on_discard(self.state.downstream.current_context(), value);
        }
    }
}

struct BufferCountPublisher<T: Send + Sync + 'static> {
    main: Flux<T>,
    size: usize,
}

impl<T: Send + Sync + 'static> Publisher<Vec<T>> for BufferCountPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<Vec<T>>>) {
        let state = Arc::new(CountState {
            downstream: subscriber,
            current: Mutex::new(Vec::with_capacity(self.size)),
            size: self.size,
            requested: AtomicU64::new(0),
            main_subscription: Mutex::new(None),
            terminated: AtomicBool::new(false),
        });
        state
            .downstream
            .on_subscribe(Arc::new(CountSubscription { state: Arc::clone(&state) }));
        self.main.subscribe_arc(Arc::new(CountSubscriber { state }));
    }
}

/// `buffer(size)`: cut `main` into fixed-size `Vec<T>` segments; the final,
/// possibly-short segment is emitted on `onComplete` if non-empty.
///
/// # Panics
/// Panics if `size == 0`.
pub fn buffer_count<T: Send + Sync + 'static>(main: Flux<T>, size: usize) -> Flux<Vec<T>> {
    assert!(size > 0, "buffer_count: size must be positive");
    Flux::from_publisher(BufferCountPublisher { main, size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use fluxion_stream_multi::from_array;
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn buffer_boundary_cuts_on_each_pulse() {
        let main = from_array(alloc::vec![1, 2, 3, 4, 5]);
        let boundary = from_array(alloc::vec![(), ()]);
        let flux = buffer_boundary(main, boundary);
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(3, Duration::from_secs(1)));
        assert_eq!(
            subscriber.values(),
            alloc::vec![alloc::vec![1, 2], alloc::vec![3, 4], alloc::vec![5]]
        );
        assert!(subscriber.is_terminated());
    }

    #[test]
    fn buffer_boundary_overflows_without_demand() {
        let main = from_array(alloc::vec![1, 2]);
        let boundary = from_array(alloc::vec![()]);
        let flux = buffer_boundary(main, boundary);
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        // No demand requested at all: the boundary pulse has nothing to
        // satisfy it with, which is an overflow, not a silent drop.
        assert!(subscriber.wait_for(1, Duration::from_secs(1)));
        assert!(subscriber.error().is_some());
    }

    #[test]
    fn buffer_count_emits_fixed_size_chunks_and_a_short_tail() {
        let main = from_array(alloc::vec![1, 2, 3, 4, 5]);
        let flux = buffer_count(main, 2);
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(3, Duration::from_secs(1)));
        assert_eq!(
            subscriber.values(),
            alloc::vec![alloc::vec![1, 2], alloc::vec![3, 4], alloc::vec![5]]
        );
        assert!(subscriber.is_terminated());
    }
}
