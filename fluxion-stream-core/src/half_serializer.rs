// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::signal::Signal;
use fluxion_core::subscriber::CoreSubscriber;
use fluxion_error::FluxionError;

/// Enforces Rule 1.3 (serial signal delivery) when more than one producer
/// thread might call `on_next`/`on_error`/`on_complete` on the same
/// downstream subscriber concurrently — exactly the situation `window`,
/// `combineLatest`, and multicast sinks are in.
///
/// Implemented as a work-in-progress counter plus a queue: the thread whose
/// increment moves the counter from `0` wins the drain and delivers every
/// signal (its own and any queued by threads that arrived while it was
/// draining) to `inner`, one at a time; every other thread just enqueues and
/// returns. This is the drain-loop pattern, specialized to exactly one
/// downstream subscriber.
pub struct SerializedSubscriber<T, S: CoreSubscriber<T>> {
    inner: Arc<S>,
    wip: AtomicUsize,
    queue: Mutex<VecDeque<Signal<T>>>,
    terminated: AtomicBool,
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T>> SerializedSubscriber<T, S> {
    #[must_use]
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            wip: AtomicUsize::new(0),
            queue: Mutex::new(VecDeque::new()),
            terminated: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// Serially deliver `value`. Returns `false` (a `FAIL_NON_SERIALIZED`
    /// equivalent outcome, per the design's naming) if this subscriber is
    /// already terminated — callers that know only recovery operators may
    /// recover can treat that as "drop the value".
    pub fn on_next(&self, value: T) -> bool {
        self.emit(Signal::Next(value))
    }

    /// Serially deliver a terminal error. No-op if already terminated.
    pub fn on_error(&self, error: FluxionError) {
        self.emit(Signal::Error(error));
    }

    /// Serially deliver completion. No-op if already terminated.
    pub fn on_complete(&self) {
        self.emit(Signal::Complete);
    }

    fn emit(&self, signal: Signal<T>) -> bool {
        if self.terminated.load(Ordering::Acquire) {
            return false;
        }
        self.queue.lock().push_back(signal);
        self.drain();
        true
    }

    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        loop {
            loop {
                let next = self.queue.lock().pop_front();
                match next {
                    Some(Signal::Next(v)) => {
                        if self.terminated.load(Ordering::Acquire) {
                            continue;
                        }
                        self.inner.on_next(v);
                    }
                    Some(Signal::Error(e)) => {
                        self.terminated.store(true, Ordering::Release);
                        self.inner.on_error(e);
                    }
                    Some(Signal::Complete) => {
                        self.terminated.store(true, Ordering::Release);
                        self.inner.on_complete();
                    }
                    None => break,
                }
            }
            if self.wip.fetch_sub(1, Ordering::AcqRel) == 1 {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc as StdArc;
    use alloc::vec::Vec;
    use core::sync::atomic::AtomicUsize as Counter;
    use fluxion_core::context::Context;
    use fluxion_core::subscriber::Subscriber;
    use fluxion_core::subscription::Subscription;

    struct Recorder {
        values: Mutex<Vec<i32>>,
        completes: Counter,
        errors: Counter,
        ctx: Context,
    }

    impl Subscriber<i32> for Recorder {
        fn on_subscribe(&self, _subscription: StdArc<dyn Subscription>) {}
        fn on_next(&self, value: i32) {
            self.values.lock().push(value);
        }
        fn on_error(&self, _error: FluxionError) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
        fn on_complete(&self) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CoreSubscriber<i32> for Recorder {
        fn current_context(&self) -> &Context {
            &self.ctx
        }
    }

    #[test]
    fn delivers_values_in_order_then_complete() {
        let recorder = StdArc::new(Recorder {
            values: Mutex::new(Vec::new()),
            completes: Counter::new(0),
            errors: Counter::new(0),
            ctx: Context::empty(),
        });
        let serialized = SerializedSubscriber::new(StdArc::clone(&recorder));
        serialized.on_next(1);
        serialized.on_next(2);
        serialized.on_complete();
        assert_eq!(*recorder.values.lock(), alloc::vec![1, 2]);
        assert_eq!(recorder.completes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn nothing_delivered_after_termination() {
        let recorder = StdArc::new(Recorder {
            values: Mutex::new(Vec::new()),
            completes: Counter::new(0),
            errors: Counter::new(0),
            ctx: Context::empty(),
        });
        let serialized = SerializedSubscriber::new(StdArc::clone(&recorder));
        serialized.on_error(FluxionError::invalid_state("boom"));
        assert!(!serialized.on_next(99));
        assert!(recorder.values.lock().is_empty());
        assert_eq!(recorder.errors.load(Ordering::SeqCst), 1);
    }
}
