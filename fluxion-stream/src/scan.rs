// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `scan(seed, accumulator)`: a single-source stateful transform
//! that emits the running fold of everything seen so far, one `onNext` in,
//! one `onNext` out — unlike [`crate::buffer`]/[`crate::window`], it never
//! changes cardinality, so no demand bookkeeping beyond a pass-through
//! subscription is needed.

use alloc::sync::Arc;
use core::panic::AssertUnwindSafe;

use fluxion_core::context::Context;
use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::operators::{guard_user_fn, on_operator_error};
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_core::subscription::Subscription;
use fluxion_error::FluxionError;
use fluxion_stream_core::Flux;

struct ScanSubscriber<T, R: Clone + Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<R>>,
    accumulator: Arc<dyn Fn(R, T) -> R + Send + Sync>,
    acc: Mutex<Option<R>>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
}

impl<T: Send + Sync + 'static, R: Clone + Send + Sync + 'static> Subscriber<T> for ScanSubscriber<T, R> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.subscription.lock() = Some(Arc::clone(&subscription));
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&self, value: T) {
        let accumulator = Arc::clone(&self.accumulator);
        let current = self.acc.lock().clone().expect("scan: seed set at construction");
        match guard_user_fn("scan", AssertUnwindSafe(move || accumulator(current, value))) {
            Ok(next) => {
                *self.acc.lock() = Some(next.clone());
                self.downstream.on_next(next);
            }
            Err(e) => {
                let sub = self.subscription.lock().clone();
                let err = on_operator_error::<()>(sub.as_deref(), e, None, self.downstream.current_context());
                self.downstream.on_error(err);
            }
        }
    }

    fn on_error(&self, error: FluxionError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static, R: Clone + Send + Sync + 'static> CoreSubscriber<T> for ScanSubscriber<T, R> {
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

struct ScanPublisher<T, R: Clone + Send + Sync + 'static> {
    upstream: Flux<T>,
    seed: R,
    accumulator: Arc<dyn Fn(R, T) -> R + Send + Sync>,
}

impl<T: Send + Sync + 'static, R: Clone + Send + Sync + 'static> Publisher<R> for ScanPublisher<T, R> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
        let inner = Arc::new(ScanSubscriber {
            downstream: subscriber,
            accumulator: Arc::clone(&self.accumulator),
            acc: Mutex::new(Some(self.seed.clone())),
            subscription: Mutex::new(None),
        });
        self.upstream.subscribe_arc(inner);
    }
}

/// `scan(upstream, seed, accumulator)`: emits `accumulator(seed, v0)`,
/// `accumulator(accumulator(seed, v0), v1)`, ... — one output per input,
/// never the seed itself (matching the design's fold-without-initial-echo
/// reading of `scan`).
pub fn scan<T, R>(upstream: Flux<T>, seed: R, accumulator: impl Fn(R, T) -> R + Send + Sync + 'static) -> Flux<R>
where
    T: Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    Flux::from_publisher(ScanPublisher {
        upstream,
        seed,
        accumulator: Arc::new(accumulator),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use fluxion_core::subscription::UNBOUNDED;
    use fluxion_stream_multi::from_array;
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn scan_emits_running_total() {
        let flux = scan(from_array(alloc::vec![1, 2, 3, 4]), 0, |acc, v| acc + v);
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(4, Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec![1, 3, 6, 10]);
        assert!(subscriber.is_terminated());
    }

    #[test]
    fn scan_routes_accumulator_panics_through_operator_error() {
        let flux = scan(from_array(alloc::vec![1, 2]), 0, |_acc, v: i32| {
            if v == 2 {
                panic!("boom");
            }
            v
        });
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(2, Duration::from_secs(1)));
        assert!(matches!(
            subscriber.error(),
            Some(FluxionError::CallbackPanic { .. })
        ));
    }
}
