// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! A source [`Publisher`] that emits a fixed run of values and then fails a
//! configurable number of times before finally completing — the shape
//! `retry`/`usingWhen` tests need to assert recovery behavior without
//! standing up a real flaky upstream.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::operators::{add_cap, on_discard};
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::CoreSubscriber;
use fluxion_core::subscription::Subscription;
use fluxion_error::FluxionError;
use fluxion_stream_core::Flux;

/// Each subscribe attempt replays `values` honouring demand, then either
/// fails with the configured error (if this is one of the first `failures`
/// attempts) or completes normally.
pub struct FlakyProducer<T> {
    values: Vec<T>,
    failures: u64,
    attempt: Arc<AtomicU64>,
    error: Arc<dyn Fn() -> FluxionError + Send + Sync>,
}

impl<T: Clone + Send + Sync + 'static> FlakyProducer<T> {
    /// Fails every subscribe attempt with `FluxionError::stream_error` until
    /// the `failures`-th attempt (0-indexed), which completes instead.
    #[must_use]
    pub fn new(values: Vec<T>, failures: u64) -> Self {
        Self::with_error(values, failures, || {
            FluxionError::stream_error("injected failure")
        })
    }

    /// Like [`Self::new`] but with a caller-supplied error factory.
    #[must_use]
    pub fn with_error(
        values: Vec<T>,
        failures: u64,
        error: impl Fn() -> FluxionError + Send + Sync + 'static,
    ) -> Self {
        Self {
            values,
            failures,
            attempt: Arc::new(AtomicU64::new(0)),
            error: Arc::new(error),
        }
    }

    /// Number of subscribe attempts observed so far.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempt.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn into_flux(self) -> Flux<T> {
        Flux::from_publisher(self)
    }
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for FlakyProducer<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let attempt = self.attempt.fetch_add(1, Ordering::SeqCst);
        let fails_this_attempt = attempt < self.failures;
        let sub = FlakySubscription::new(
            self.values.clone(),
            fails_this_attempt.then(|| Arc::clone(&self.error)),
            subscriber.clone(),
        );
        subscriber.on_subscribe(sub);
    }
}

struct FlakySubscription<T, S: CoreSubscriber<T>> {
    values: Vec<T>,
    index: AtomicU64,
    requested: AtomicU64,
    cancelled: AtomicBool,
    draining: AtomicBool,
    error: Option<Arc<dyn Fn() -> FluxionError + Send + Sync>>,
    subscriber: Arc<S>,
}

impl<T: Clone + Send + Sync + 'static, S: CoreSubscriber<T> + 'static> FlakySubscription<T, S> {
    fn new(
        values: Vec<T>,
        error: Option<Arc<dyn Fn() -> FluxionError + Send + Sync>>,
        subscriber: Arc<S>,
    ) -> Arc<Self> {
        Arc::new(Self {
            values,
            index: AtomicU64::new(0),
            requested: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            draining: AtomicBool::new(false),
            error,
            subscriber,
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
                    match &self.error {
                        Some(factory) => self.subscriber.on_error(factory()),
                        None => self.subscriber.on_complete(),
                    }
                    self.draining.store(false, Ordering::Release);
                    return;
                }
                self.subscriber.on_next(self.values[idx].clone());
                self.index.store((idx + 1) as u64, Ordering::Release);
                emitted += 1;
            }
            self.requested.fetch_sub(emitted, Ordering::AcqRel);
            self.draining.store(false, Ordering::Release);
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
    for FlakySubscription<T, S>
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
        let remaining: Vec<T> = self
            .values
            .iter()
            .skip(self.index.load(Ordering::Acquire) as usize)
            .cloned()
            .collect();
        for value in remaining {
            on_discard(self.subscriber.current_context(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_core::context::Context;
    use fluxion_core::subscriber::Subscriber;
    use fluxion_core::subscription::UNBOUNDED;

    struct Recorder<T> {
        values: Mutex<Vec<T>>,
        completed: AtomicBool,
        error: Mutex<Option<FluxionError>>,
    }

    struct RecorderRef<T>(Arc<Recorder<T>>);

    impl<T: Send + Sync> Subscriber<T> for RecorderRef<T> {
        fn on_subscribe(&self, s: Arc<dyn Subscription>) {
            s.request(UNBOUNDED);
        }
        fn on_next(&self, v: T) {
            self.0.values.lock().push(v);
        }
        fn on_error(&self, e: FluxionError) {
            *self.0.error.lock() = Some(e);
        }
        fn on_complete(&self) {
            self.0.completed.store(true, Ordering::SeqCst);
        }
    }

    impl<T: Send + Sync> CoreSubscriber<T> for RecorderRef<T> {
        fn current_context(&self) -> &Context {
            static EMPTY: std::sync::OnceLock<Context> = std::sync::OnceLock::new();
            EMPTY.get_or_init(Context::empty)
        }
    }

    fn collect<T: Clone + Send + Sync + 'static>(
        flux: &Flux<T>,
    ) -> (Vec<T>, bool, Option<FluxionError>) {
        let recorder = Arc::new(Recorder {
            values: Mutex::new(Vec::new()),
            completed: AtomicBool::new(false),
            error: Mutex::new(None),
        });
        flux.subscribe_arc(Arc::new(RecorderRef(Arc::clone(&recorder))));
        (
            recorder.values.lock().clone(),
            recorder.completed.load(Ordering::SeqCst),
            recorder.error.lock().clone(),
        )
    }

    #[test]
    fn completes_once_failures_are_exhausted() {
        let producer = FlakyProducer::new(vec![1, 2, 3], 0);
        let flux = producer.into_flux();
        let (values, completed, error) = collect(&flux);
        assert_eq!(values, vec![1, 2, 3]);
        assert!(completed);
        assert!(error.is_none());
    }

    #[test]
    fn fails_on_the_configured_attempt() {
        let producer = FlakyProducer::new(vec![1, 2], 1);
        let flux = producer.into_flux();
        let (values, completed, error) = collect(&flux);
        assert_eq!(values, vec![1, 2]);
        assert!(!completed);
        assert!(error.is_some());
    }

    #[test]
    fn second_attempt_succeeds_after_first_fails() {
        let producer = Arc::new(FlakyProducer::new(vec![1], 1));
        let flux1 = Flux::from_publisher(ProducerRef(Arc::clone(&producer)));
        let (_, _, error) = collect(&flux1);
        assert!(error.is_some());

        let flux2 = Flux::from_publisher(ProducerRef(Arc::clone(&producer)));
        let (values, completed, error) = collect(&flux2);
        assert_eq!(values, vec![1]);
        assert!(completed);
        assert!(error.is_none());
        assert_eq!(producer.attempts(), 2);
    }

    struct ProducerRef<T>(Arc<FlakyProducer<T>>);

    impl<T: Clone + Send + Sync + 'static> Publisher<T> for ProducerRef<T> {
        fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
            self.0.subscribe(subscriber);
        }
    }
}
