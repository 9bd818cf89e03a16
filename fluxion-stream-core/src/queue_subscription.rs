// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Reusable fuseable subscriptions (component J) for the two simplest
//! source shapes: a single scalar value and a pre-materialized slice.
//! Source-specific state machines that don't fit either shape (lazy
//! iterables, `range`, `interval`) build their own in `fluxion-stream-multi`
//! following the same slow/fast-path pattern demonstrated here.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::fuseable::{mode, FuseableSubscription};
use fluxion_core::operators::{add_cap, on_discard};
use fluxion_core::subscriber::CoreSubscriber;
use fluxion_core::subscription::{Subscription, UNBOUNDED};
use fluxion_error::FluxionError;

const STATE_INIT: u8 = 0;
const STATE_FUSED_SYNC: u8 = 1;
const STATE_DONE: u8 = 2;

/// A fuseable [`Subscription`] for a single materialized value (`just`,
/// `fromCallable`'s already-evaluated result). Grants [`mode::SYNC`]
/// fusion whenever the downstream asks for it; otherwise delivers `on_next`
/// + `on_complete` the first time `request` sees a positive demand.
pub struct ScalarSubscription<T, S: CoreSubscriber<T>> {
    value: Mutex<Option<T>>,
    subscriber: Arc<S>,
    state: AtomicU8,
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static> ScalarSubscription<T, S> {
    #[must_use]
    pub fn new(value: T, subscriber: Arc<S>) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(Some(value)),
            subscriber,
            state: AtomicU8::new(STATE_INIT),
        })
    }
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static> Subscription
    for ScalarSubscription<T, S>
{
    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        if self
            .state
            .compare_exchange(
                STATE_INIT,
                STATE_DONE,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            if let Some(value) = self.value.lock().take() {
                self.subscriber.on_next(value);
                self.subscriber.on_complete();
            }
        }
    }

    fn cancel(&self) {
        self.state.store(STATE_DONE, Ordering::Release);
        if let Some(value) = self.value.lock().take() {
            on_discard(self.subscriber.current_context(), value);
        }
    }
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static> FuseableSubscription<T>
    for ScalarSubscription<T, S>
{
    fn request_fusion(&self, requested_mode: u8) -> u8 {
        if requested_mode & mode::SYNC != 0 {
            self.state.store(STATE_FUSED_SYNC, Ordering::Release);
            mode::SYNC
        } else {
            mode::NONE
        }
    }

    fn poll(&self) -> Result<Option<T>, FluxionError> {
        Ok(self.value.lock().take())
    }

    fn is_empty(&self) -> bool {
        self.value.lock().is_none()
    }

    fn clear(&self) {
        if let Some(value) = self.value.lock().take() {
            on_discard(self.subscriber.current_context(), value);
        }
    }

    fn size(&self) -> usize {
        usize::from(!self.is_empty())
    }
}

/// A fuseable [`Subscription`] over a pre-materialized slice (`fromArray`).
///
/// Under unbounded demand the fast path drains the whole slice in one
/// `request` call without touching the outstanding-demand counter again
///; otherwise the slow
/// path emits up to the requested count and re-reads the demand counter
/// after each batch, so interleaved `request` calls are honored promptly.
pub struct SliceSubscription<T, S: CoreSubscriber<T>> {
    values: Vec<T>,
    index: AtomicU64,
    requested: AtomicU64,
    subscriber: Arc<S>,
    cancelled: core::sync::atomic::AtomicBool,
    draining: core::sync::atomic::AtomicBool,
}

impl<T: Clone + Send + Sync + 'static, S: CoreSubscriber<T> + 'static> SliceSubscription<T, S> {
    #[must_use]
    pub fn new(values: Vec<T>, subscriber: Arc<S>) -> Arc<Self> {
        Arc::new(Self {
            values,
            index: AtomicU64::new(0),
            requested: AtomicU64::new(0),
            subscriber,
            cancelled: core::sync::atomic::AtomicBool::new(false),
            draining: core::sync::atomic::AtomicBool::new(false),
        })
    }

    fn drain(&self) {
        if self.draining.swap(true, Ordering::AcqRel) {
            return;
        }
        loop {
            let mut emitted: u64 = 0;
            loop {
                if self.cancelled.load(Ordering::Acquire) {
                    self.draining.store(false, Ordering::Release);
                    return;
                }
                let requested = self.requested.load(Ordering::Acquire);
                if emitted >= requested {
                    break;
                }
                let idx = self.index.load(Ordering::Acquire) as usize;
                if idx >= self.values.len() {
                    self.subscriber.on_complete();
                    self.draining.store(false, Ordering::Release);
                    return;
                }
                self.subscriber.on_next(self.values[idx].clone());
                self.index.store((idx + 1) as u64, Ordering::Release);
                emitted += 1;
            }
            self.requested.fetch_sub(emitted, Ordering::AcqRel);
            self.draining.store(false, Ordering::Release);
            // Re-check: a request arriving right as we cleared the flag must
            // not be left undrained.
            if self.requested.load(Ordering::Acquire) == 0
                || self.cancelled.load(Ordering::Acquire)
                || self.draining.swap(true, Ordering::AcqRel)
            {
                return;
            }
        }
    }
}

impl<T: Clone + Send + Sync + 'static, S: CoreSubscriber<T> + 'static> Subscription
    for SliceSubscription<T, S>
{
    fn request(&self, n: u64) {
        if n == 0 || self.cancelled.load(Ordering::Acquire) {
            return;
        }
        let mut current = self.requested.load(Ordering::Acquire);
        loop {
            let next = add_cap(current, n);
            match self.requested.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.drain();
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl<T: Clone + Send + Sync + 'static, S: CoreSubscriber<T> + 'static> FuseableSubscription<T>
    for SliceSubscription<T, S>
{
    fn request_fusion(&self, requested_mode: u8) -> u8 {
        if requested_mode & mode::SYNC != 0 {
            mode::SYNC
        } else {
            mode::NONE
        }
    }

    fn poll(&self) -> Result<Option<T>, FluxionError> {
        let idx = self.index.load(Ordering::Acquire) as usize;
        if idx >= self.values.len() {
            return Ok(None);
        }
        self.index.store((idx + 1) as u64, Ordering::Release);
        Ok(Some(self.values[idx].clone()))
    }

    fn is_empty(&self) -> bool {
        self.index.load(Ordering::Acquire) as usize >= self.values.len()
    }

    fn clear(&self) {
        self.index.store(self.values.len() as u64, Ordering::Release);
    }

    fn size(&self) -> usize {
        self.values
            .len()
            .saturating_sub(self.index.load(Ordering::Acquire) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc as StdArc;
    use alloc::vec;
    use fluxion_core::context::Context;
    use fluxion_core::subscriber::Subscriber;

    struct Recorder {
        values: Mutex<Vec<i32>>,
        completed: core::sync::atomic::AtomicBool,
        ctx: Context,
    }

    impl Subscriber<i32> for Recorder {
        fn on_subscribe(&self, _subscription: StdArc<dyn Subscription>) {}
        fn on_next(&self, value: i32) {
            self.values.lock().push(value);
        }
        fn on_error(&self, _error: FluxionError) {}
        fn on_complete(&self) {
            self.completed.store(true, Ordering::SeqCst);
        }
    }

    impl CoreSubscriber<i32> for Recorder {
        fn current_context(&self) -> &Context {
            &self.ctx
        }
    }

    #[test]
    fn slice_subscription_honours_bounded_demand() {
        let recorder = StdArc::new(Recorder {
            values: Mutex::new(Vec::new()),
            completed: core::sync::atomic::AtomicBool::new(false),
            ctx: Context::empty(),
        });
        let sub = SliceSubscription::new(vec![1, 2, 3], StdArc::clone(&recorder));
        sub.request(2);
        assert_eq!(*recorder.values.lock(), vec![1, 2]);
        assert!(!recorder.completed.load(Ordering::SeqCst));
        sub.request(1);
        assert_eq!(*recorder.values.lock(), vec![1, 2, 3]);
        assert!(recorder.completed.load(Ordering::SeqCst));
    }

    #[test]
    fn slice_subscription_fast_path_drains_everything() {
        let recorder = StdArc::new(Recorder {
            values: Mutex::new(Vec::new()),
            completed: core::sync::atomic::AtomicBool::new(false),
            ctx: Context::empty(),
        });
        let sub = SliceSubscription::new(vec![1, 2, 3], StdArc::clone(&recorder));
        sub.request(UNBOUNDED);
        assert_eq!(*recorder.values.lock(), vec![1, 2, 3]);
        assert!(recorder.completed.load(Ordering::SeqCst));
    }

    #[test]
    fn already_exhausted_slice_completes_on_first_request() {
        let recorder = StdArc::new(Recorder {
            values: Mutex::new(Vec::new()),
            completed: core::sync::atomic::AtomicBool::new(false),
            ctx: Context::empty(),
        });
        let sub: Arc<SliceSubscription<i32, _>> =
            SliceSubscription::new(Vec::new(), StdArc::clone(&recorder));
        sub.request(1);
        assert!(recorder.completed.load(Ordering::SeqCst));
    }

    #[test]
    fn scalar_subscription_delivers_once() {
        let recorder = StdArc::new(Recorder {
            values: Mutex::new(Vec::new()),
            completed: core::sync::atomic::AtomicBool::new(false),
            ctx: Context::empty(),
        });
        let sub = ScalarSubscription::new(42, StdArc::clone(&recorder));
        sub.request(1);
        assert_eq!(*recorder.values.lock(), vec![42]);
        assert!(recorder.completed.load(Ordering::SeqCst));
        sub.request(1);
        assert_eq!(recorder.values.lock().len(), 1);
    }
}
