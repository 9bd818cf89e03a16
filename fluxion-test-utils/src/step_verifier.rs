// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! A `StepVerifier`-style assertion harness for the Reactive Streams
//! protocol: a recording [`CoreSubscriber`] plus an ordered-expectation
//! builder, so operator tests read as a script of what should arrive
//! instead of hand-rolled `Vec` comparisons against a polled stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use fluxion_core::context::Context;
use fluxion_core::signal::Signal;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_core::subscription::Subscription;
use fluxion_error::FluxionError;
use fluxion_stream_core::Flux;

struct Inner<T> {
    signals: Mutex<Vec<Signal<T>>>,
    condvar: Condvar,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    ctx: Context,
}

/// A [`CoreSubscriber`] that records every signal it receives, in order,
/// and exposes the installed [`Subscription`] so a test can drive demand
/// explicitly.
pub struct TestSubscriber<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for TestSubscriber<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for TestSubscriber<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TestSubscriber<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                signals: Mutex::new(Vec::new()),
                condvar: Condvar::new(),
                subscription: Mutex::new(None),
                ctx: Context::empty(),
            }),
        }
    }

    /// Build a subscriber seeded with a context (e.g. one carrying discard
    /// hooks a test wants to assert against).
    #[must_use]
    pub fn with_context(ctx: Context) -> Self {
        Self {
            inner: Arc::new(Inner {
                signals: Mutex::new(Vec::new()),
                condvar: Condvar::new(),
                subscription: Mutex::new(None),
                ctx,
            }),
        }
    }

    /// The subscription this subscriber was handed, once `on_subscribe` has
    /// fired.
    #[must_use]
    pub fn subscription(&self) -> Option<Arc<dyn Subscription>> {
        self.inner.subscription.lock().unwrap().clone()
    }

    /// Request `n` from the installed subscription. Panics if
    /// `on_subscribe` hasn't happened yet.
    pub fn request(&self, n: u64) {
        self.subscription()
            .expect("request() called before on_subscribe")
            .request(n);
    }

    /// Cancel the installed subscription.
    pub fn cancel(&self) {
        if let Some(sub) = self.subscription() {
            sub.cancel();
        }
    }

    /// Block the calling thread until at least `count` signals have been
    /// recorded or `timeout` elapses. Returns `false` on timeout.
    #[must_use]
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let guard = self.inner.signals.lock().unwrap();
        let (guard, result) = self
            .inner
            .condvar
            .wait_timeout_while(guard, timeout, |signals| signals.len() < count)
            .unwrap();
        drop(guard);
        !result.timed_out() || self.inner.signals.lock().unwrap().len() >= count
    }

    /// Snapshot of every signal recorded so far, in arrival order.
    #[must_use]
    pub fn signals(&self) -> Vec<Signal<T>>
    where
        T: Clone,
    {
        self.inner.signals.lock().unwrap().clone()
    }

    /// The `on_next` values recorded so far, in order (terminal signals
    /// excluded).
    #[must_use]
    pub fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.signals()
            .into_iter()
            .filter_map(Signal::into_next_value)
            .collect()
    }

    /// True once exactly one terminal signal has been recorded.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.inner
            .signals
            .lock()
            .unwrap()
            .iter()
            .any(Signal::is_terminal)
    }

    /// The terminal error recorded, if the sequence ended in `on_error`.
    #[must_use]
    pub fn error(&self) -> Option<FluxionError>
    where
        T: Clone,
    {
        self.signals().into_iter().find_map(|s| match s {
            Signal::Error(e) => Some(e),
            _ => None,
        })
    }

    fn record(&self, signal: Signal<T>) {
        let mut guard = self.inner.signals.lock().unwrap();
        guard.push(signal);
        self.inner.condvar.notify_all();
    }
}

impl<T: Send + Sync> Subscriber<T> for TestSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.inner.subscription.lock().unwrap() = Some(subscription);
    }

    fn on_next(&self, value: T) {
        self.record(Signal::Next(value));
    }

    fn on_error(&self, error: FluxionError) {
        self.record(Signal::Error(error));
    }

    fn on_complete(&self) {
        self.record(Signal::Complete);
    }
}

impl<T: Send + Sync> CoreSubscriber<T> for TestSubscriber<T> {
    fn current_context(&self) -> &Context {
        &self.inner.ctx
    }
}

/// Subscribes to `flux`, immediately requesting [`fluxion_core::subscription::UNBOUNDED`],
/// and returns the recorded subscriber once the sequence has terminated or
/// `timeout` elapses (whichever first) — the common case of "run this to
/// completion and assert on what came out".
pub fn run_to_completion<T: Send + Sync + 'static>(
    flux: &Flux<T>,
    timeout: Duration,
) -> TestSubscriber<T> {
    let subscriber = TestSubscriber::new();
    flux.subscribe(subscriber.clone());
    subscriber.request(fluxion_core::subscription::UNBOUNDED);
    let deadline = Instant::now() + timeout;
    while !subscriber.is_terminated() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    subscriber
}

/// An atomic counter used by tests that need to assert how many times a
/// callback ran without pulling in a whole mock-object crate.
#[derive(Default)]
pub struct CallCounter(AtomicU64);

impl CallCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_stream_multi::{from_array, map};

    #[test]
    fn records_values_then_complete() {
        let flux = map(from_array(vec![1, 2, 3]), |v| v * 2);
        let subscriber = run_to_completion(&flux, Duration::from_secs(1));
        assert_eq!(subscriber.values(), vec![2, 4, 6]);
        assert!(subscriber.is_terminated());
        assert!(subscriber.error().is_none());
    }
}
