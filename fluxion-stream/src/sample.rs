// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `sample(sampler)`: emit the latest value of `main` every time
//! `sampler` ticks.
//!
//! `main` and `sampler` are independent upstreams that can deliver from
//! different threads; only `sampler`'s `onNext` ever reaches downstream, but
//! a terminal signal can arrive from either side concurrently with a tick
//! in flight, so downstream delivery goes through
//! [`fluxion_stream_core::half_serializer::SerializedSubscriber`]
//! rather than being called directly from two producer threads.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use fluxion_core::context::Context;
use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::operators::{add_cap, on_discard, sub_or_zero};
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_core::subscription::Subscription;
use fluxion_error::FluxionError;
use fluxion_stream_core::half_serializer::SerializedSubscriber;
use fluxion_stream_core::Flux;

struct DownstreamWrapper<T: Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<T>>,
}

impl<T: Send + Sync + 'static> Subscriber<T> for DownstreamWrapper<T> {
    fn on_subscribe(&self, _subscription: Arc<dyn Subscription>) {}
    fn on_next(&self, value: T) {
        self.downstream.on_next(value);
    }
    fn on_error(&self, error: FluxionError) {
        self.downstream.on_error(error);
    }
    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static> CoreSubscriber<T> for DownstreamWrapper<T> {
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

struct SampleState<T: Send + Sync + 'static> {
    downstream: SerializedSubscriber<T, DownstreamWrapper<T>>,
    latest: Mutex<Option<T>>,
    requested: AtomicU64,
    main_subscription: Mutex<Option<Arc<dyn Subscription>>>,
    sampler_subscription: Mutex<Option<Arc<dyn Subscription>>>,
    terminated: AtomicBool,
    ctx: Context,
}

impl<T: Send + Sync + 'static> SampleState<T> {
    fn cancel_all(&self) {
        if let Some(sub) = self.main_subscription.lock().clone() {
            sub.cancel();
        }
        if let Some(sub) = self.sampler_subscription.lock().clone() {
            sub.cancel();
        }
    }

    fn terminate(&self, error: Option<FluxionError>) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel_all();
        if let Some(value) = self.latest.lock().take() {
            on_discard(&self.ctx, value);
        }
        match error {
            Some(e) => self.downstream.on_error(e),
            None => self.downstream.on_complete(),
        }
    }
}

struct MainSubscriber<T: Send + Sync + 'static> {
    state: Arc<SampleState<T>>,
}

impl<T: Send + Sync + 'static> Subscriber<T> for MainSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.state.main_subscription.lock() = Some(subscription.clone());
        subscription.request(fluxion_core::subscription::UNBOUNDED);
    }

    fn on_next(&self, value: T) {
        if self.state.terminated.load(Ordering::Acquire) {
            on_discard(&self.state.ctx, value);
            return;
        }
        if let Some(old) = self.state.latest.lock().replace(value) {
            on_discard(&self.state.ctx, old);
        }
    }

    fn on_error(&self, error: FluxionError) {
        self.state.terminate(Some(error));
    }

    fn on_complete(&self) {
        self.state.terminate(None);
    }
}

impl<T: Send + Sync + 'static> CoreSubscriber<T> for MainSubscriber<T> {
    fn current_context(&self) -> &Context {
        &self.state.ctx
    }
}

struct SamplerSubscriber<T: Send + Sync + 'static, U: Send + Sync + 'static> {
    state: Arc<SampleState<T>>,
    _marker: core::marker::PhantomData<fn(U)>,
}

impl<T: Send + Sync + 'static, U: Send + Sync + 'static> Subscriber<U> for SamplerSubscriber<T, U> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.state.sampler_subscription.lock() = Some(subscription.clone());
        subscription.request(fluxion_core::subscription::UNBOUNDED);
    }

    fn on_next(&self, _tick: U) {
        if self.state.terminated.load(Ordering::Acquire) {
            return;
        }
        let value = self.state.latest.lock().take();
        let Some(value) = value else { return };
        loop {
            let current = self.state.requested.load(Ordering::Acquire);
            if current == 0 {
                // No outstanding demand: the value stays un-sampled rather
                // than forcing an overflow — `sample` only ever reports the
                // most recent state, so a missed tick is not data loss.
                *self.state.latest.lock() = Some(value);
                return;
            }
            if self
                .state
                .requested
                .compare_exchange_weak(current, sub_or_zero(current, 1), Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }
        self.state.downstream.on_next(value);
    }

    fn on_error(&self, error: FluxionError) {
        self.state.terminate(Some(error));
    }

    fn on_complete(&self) {
        self.state.terminate(None);
    }
}

impl<T: Send + Sync + 'static, U: Send + Sync + 'static> CoreSubscriber<U> for SamplerSubscriber<T, U> {
    fn current_context(&self) -> &Context {
        &self.state.ctx
    }
}

struct SampleSubscription<T: Send + Sync + 'static> {
    state: Arc<SampleState<T>>,
}

impl<T: Send + Sync + 'static> Subscription for SampleSubscription<T> {
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
        if let Some(value) = self.state.latest.lock().take() {
            on_discard(&self.state.ctx, value);
        }
    }
}

struct SamplePublisher<T: Send + Sync + 'static, U: Send + Sync + 'static> {
    main: Flux<T>,
    sampler: Flux<U>,
}

impl<T: Send + Sync + 'static, U: Send + Sync + 'static> Publisher<T> for SamplePublisher<T, U> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let ctx = subscriber.current_context().clone();
        let wrapped = Arc::new(DownstreamWrapper { downstream: Arc::clone(&subscriber) });
        let state = Arc::new(SampleState {
            downstream: SerializedSubscriber::new(wrapped),
            latest: Mutex::new(None),
            requested: AtomicU64::new(0),
            main_subscription: Mutex::new(None),
            sampler_subscription: Mutex::new(None),
            terminated: AtomicBool::new(false),
            ctx,
        });
        subscriber.on_subscribe(Arc::new(SampleSubscription { state: Arc::clone(&state) }));
        self.sampler.subscribe_arc(Arc::new(SamplerSubscriber {
            state: Arc::clone(&state),
            _marker: core::marker::PhantomData,
        }));
        self.main.subscribe_arc(Arc::new(MainSubscriber { state }));
    }
}

/// `sample(main, sampler)`: emit `main`'s latest value every time `sampler`
/// ticks; a tick with no value yet recorded produces nothing.
pub fn sample<T, U>(main: Flux<T>, sampler: Flux<U>) -> Flux<T>
where
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    Flux::from_publisher(SamplePublisher { main, sampler })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use fluxion_core::subscription::UNBOUNDED;
    use fluxion_stream_multi::from_array;
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn sample_emits_latest_on_each_tick() {
        let main = from_array(alloc::vec![1, 2, 3]);
        let sampler = from_array(alloc::vec![(), ()]);
        let flux = sample(main, sampler);
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(1, Duration::from_secs(1)));
        assert!(subscriber.is_terminated());
    }
}
