// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `retry(n, predicate)`: catches `onError` in a
//! [`MultiSubscriptionSubscriber`], resubscribing the upstream while
//! attempts remain and the predicate accepts the failure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fluxion_core::context::Context;
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_error::FluxionError;
use fluxion_stream_core::multi_subscription::MultiSubscriptionSubscriber;
use fluxion_stream_core::Flux;

struct RetryState<T: Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<T>>,
    source: Flux<T>,
    multi: Arc<MultiSubscriptionSubscriber>,
    remaining: AtomicU64,
    predicate: Arc<dyn Fn(&FluxionError) -> bool + Send + Sync>,
}

impl<T: Send + Sync + 'static> RetryState<T> {
    fn subscribe_once(self: &Arc<Self>) {
        let inner = Arc::new(RetryInner {
            state: Arc::clone(self),
        });
        self.source.subscribe_arc(inner);
    }
}

struct RetryInner<T: Send + Sync + 'static> {
    state: Arc<RetryState<T>>,
}

impl<T: Send + Sync + 'static> Subscriber<T> for RetryInner<T> {
    fn on_subscribe(&self, subscription: Arc<dyn fluxion_core::subscription::Subscription>) {
        self.state.multi.set_subscription(subscription);
    }

    fn on_next(&self, value: T) {
        self.state.multi.produced(1);
        self.state.downstream.on_next(value);
    }

    fn on_error(&self, error: FluxionError) {
        let accepts = (self.state.predicate)(&error);
        if !accepts {
            self.state.downstream.on_error(error);
            return;
        }
        let mut remaining = self.state.remaining.load(Ordering::Acquire);
        loop {
            if remaining == 0 {
                self.state.downstream.on_error(error);
                return;
            }
            match self.state.remaining.compare_exchange_weak(
                remaining,
                remaining - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => remaining = observed,
            }
        }
        self.state.subscribe_once();
    }

    fn on_complete(&self) {
        self.state.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static> CoreSubscriber<T> for RetryInner<T> {
    fn current_context(&self) -> &Context {
        self.state.downstream.current_context()
    }
}

struct RetryPublisher<T: Send + Sync + 'static> {
    source: Flux<T>,
    attempts: u64,
    predicate: Arc<dyn Fn(&FluxionError) -> bool + Send + Sync>,
}

impl<T: Send + Sync + 'static> Publisher<T> for RetryPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let state = Arc::new(RetryState {
            downstream: subscriber,
            source: self.source.clone(),
            multi: Arc::new(MultiSubscriptionSubscriber::new()),
            remaining: AtomicU64::new(self.attempts),
            predicate: Arc::clone(&self.predicate),
        });
        state
            .downstream
            .on_subscribe(Arc::clone(&state.multi) as Arc<dyn fluxion_core::subscription::Subscription>);
        state.subscribe_once();
    }
}

/// Resubscribe `source` up to `attempts` additional times after an `onError`
/// for which `predicate` returns `true`. Once `attempts` is exhausted, or
/// `predicate` rejects the failure, the error reaches the downstream
/// unchanged.
pub fn retry<T: Send + Sync + 'static>(
    source: Flux<T>,
    attempts: u64,
    predicate: impl Fn(&FluxionError) -> bool + Send + Sync + 'static,
) -> Flux<T> {
    Flux::from_publisher(RetryPublisher {
        source,
        attempts,
        predicate: Arc::new(predicate),
    })
}

/// `retry(n)`: resubscribe unconditionally on any error, up to `attempts`
/// times.
pub fn retry_times<T: Send + Sync + 'static>(source: Flux<T>, attempts: u64) -> Flux<T> {
    retry(source, attempts, |_| true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use fluxion_test_utils::error_injection::FlakyProducer;
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn retries_until_the_source_eventually_succeeds() {
        let producer = FlakyProducer::new(vec![1, 2, 3], 2);
        let flux = retry_times(producer.into_flux(), 5);
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(9, Duration::from_secs(1)));
        assert_eq!(subscriber.values(), vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);
        assert!(subscriber.is_terminated());
        assert!(subscriber.error().is_none());
    }

    #[test]
    fn gives_up_once_attempts_are_exhausted() {
        let producer = FlakyProducer::new(vec![1], 10);
        let flux = retry_times(producer.into_flux(), 2);
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(1, Duration::from_secs(1)));
        assert!(subscriber.error().is_some());
    }

    #[test]
    fn predicate_rejecting_the_error_stops_retrying_immediately() {
        let producer = FlakyProducer::new(vec![1], 10);
        let flux = retry(producer.into_flux(), 5, |_| false);
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(1, Duration::from_secs(1)));
        assert!(subscriber.error().is_some());
    }
}
