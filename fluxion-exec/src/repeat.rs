// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `repeat(times)`: mirrors [`crate::retry`] but resubscribes on
//! `onComplete` instead of `onError`, via the same
//! [`MultiSubscriptionSubscriber`] mixin.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fluxion_core::context::Context;
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_error::FluxionError;
use fluxion_stream_core::multi_subscription::MultiSubscriptionSubscriber;
use fluxion_stream_core::Flux;

struct RepeatState<T: Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<T>>,
    source: Flux<T>,
    multi: Arc<MultiSubscriptionSubscriber>,
    remaining: AtomicU64,
}

impl<T: Send + Sync + 'static> RepeatState<T> {
    fn subscribe_once(self: &Arc<Self>) {
        let inner = Arc::new(RepeatInner {
            state: Arc::clone(self),
        });
        self.source.subscribe_arc(inner);
    }
}

struct RepeatInner<T: Send + Sync + 'static> {
    state: Arc<RepeatState<T>>,
}

impl<T: Send + Sync + 'static> Subscriber<T> for RepeatInner<T> {
    fn on_subscribe(&self, subscription: Arc<dyn fluxion_core::subscription::Subscription>) {
        self.state.multi.set_subscription(subscription);
    }

    fn on_next(&self, value: T) {
        self.state.multi.produced(1);
        self.state.downstream.on_next(value);
    }

    fn on_error(&self, error: FluxionError) {
        self.state.downstream.on_error(error);
    }

    fn on_complete(&self) {
        let mut remaining = self.state.remaining.load(Ordering::Acquire);
        loop {
            if remaining == 0 {
                self.state.downstream.on_complete();
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
}

impl<T: Send + Sync + 'static> CoreSubscriber<T> for RepeatInner<T> {
    fn current_context(&self) -> &Context {
        self.state.downstream.current_context()
    }
}

struct RepeatPublisher<T: Send + Sync + 'static> {
    source: Flux<T>,
    times: u64,
}

impl<T: Send + Sync + 'static> Publisher<T> for RepeatPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let state = Arc::new(RepeatState {
            downstream: subscriber,
            source: self.source.clone(),
            multi: Arc::new(MultiSubscriptionSubscriber::new()),
            remaining: AtomicU64::new(self.times),
        });
        state
            .downstream
            .on_subscribe(Arc::clone(&state.multi) as Arc<dyn fluxion_core::subscription::Subscription>);
        state.subscribe_once();
    }
}

/// Resubscribe `source` up to `times` additional times after each
/// `onComplete`. An `onError` from any attempt propagates immediately.
pub fn repeat<T: Send + Sync + 'static>(source: Flux<T>, times: u64) -> Flux<T> {
    Flux::from_publisher(RepeatPublisher { source, times })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use fluxion_stream_multi::from_array;
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn repeats_the_source_the_requested_number_of_times() {
        let flux = repeat(from_array(vec![1, 2]), 2);
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(6, Duration::from_secs(1)));
        assert_eq!(subscriber.values(), vec![1, 2, 1, 2, 1, 2]);
        assert!(subscriber.is_terminated());
    }

    #[test]
    fn zero_times_behaves_like_the_plain_source() {
        let flux = repeat(from_array(vec![1, 2, 3]), 0);
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(3, Duration::from_secs(1)));
        assert_eq!(subscriber.values(), vec![1, 2, 3]);
        assert!(subscriber.is_terminated());
    }

    #[test]
    fn an_error_from_any_attempt_propagates_immediately() {
        let flux = repeat(
            fluxion_test_utils::error_injection::FlakyProducer::new(vec![1], 1).into_flux(),
            5,
        );
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(1, Duration::from_secs(1)));
        assert!(subscriber.error().is_some());
    }
}
