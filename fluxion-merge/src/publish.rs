// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `publish(selector)`: subscribes to `upstream` exactly once,
//! multiplexing every value to however many inner subscribers the
//! `selector` function's derived publisher ends up creating — `selector`
//! may subscribe to the `Flux<T>` it's handed more than once (e.g.
//! `zip(f, f.skip(1))`), and every one of those subscriptions sees the
//! same upstream sequence.
//!
//! Demand flowing upstream is the minimum outstanding demand across every
//! inner subscriber; an inner handle that cancels drops out of that
//! minimum, and when the last handle cancels, upstream is cancelled too.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use fluxion_core::context::Context;
use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_core::subscription::Subscription;
use fluxion_error::FluxionError;
use fluxion_stream_core::Flux;

fn saturating_add(counter: &AtomicU64, n: u64) {
    let mut current = counter.load(Ordering::Acquire);
    loop {
        let next = current.saturating_add(n);
        match counter.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return,
            Err(observed) => current = observed,
        }
    }
}

fn saturating_sub(counter: &AtomicU64, n: u64) {
    let mut current = counter.load(Ordering::Acquire);
    loop {
        let next = current.saturating_sub(n);
        match counter.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return,
            Err(observed) => current = observed,
        }
    }
}

struct InnerHandle<T: Send + Sync + 'static> {
    subscriber: Arc<dyn CoreSubscriber<T>>,
    requested: AtomicU64,
    cancelled: AtomicBool,
}

struct PublishState<T: Send + Sync + 'static> {
    handles: Mutex<Vec<Arc<InnerHandle<T>>>>,
    upstream_subscription: Mutex<Option<Arc<dyn Subscription>>>,
    upstream_requested: AtomicU64,
    started: AtomicBool,
    terminated: AtomicBool,
    // Multicast sinks have no single downstream context to defer to; an
    // empty, shared context is the neutral choice — shared state lives in
    // the processor, not in any one inner subscriber.
    context: Context,
}

impl<T: Send + Sync + 'static> PublishState<T> {
    fn recompute_demand(&self) {
        let handles = self.handles.lock();
        let min = handles
            .iter()
            .filter(|h| !h.cancelled.load(Ordering::Acquire))
            .map(|h| h.requested.load(Ordering::Acquire))
            .min()
            .unwrap_or(0);
        drop(handles);
        let outstanding = self.upstream_requested.load(Ordering::Acquire);
        if min > outstanding {
            let delta = min - outstanding;
            saturating_add(&self.upstream_requested, delta);
            if let Some(sub) = self.upstream_subscription.lock().clone() {
                sub.request(delta);
            }
        }
    }

    fn drop_handle(&self, handle: &Arc<InnerHandle<T>>) {
        handle.cancelled.store(true, Ordering::Release);
        let all_cancelled = self
            .handles
            .lock()
            .iter()
            .all(|h| h.cancelled.load(Ordering::Acquire));
        if all_cancelled {
            if let Some(sub) = self.upstream_subscription.lock().take() {
                sub.cancel();
            }
        }
    }

    fn broadcast_complete(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        for handle in self.handles.lock().iter() {
            if !handle.cancelled.load(Ordering::Acquire) {
                handle.subscriber.on_complete();
            }
        }
    }

    /// `FluxionError` isn't `Clone`; every handle but the first gets an
    /// equivalent error carrying the same message rather than the original
    /// value.
    fn broadcast_error(&self, error: FluxionError) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        let handles = self.handles.lock().clone();
        let mut live = handles
            .iter()
            .filter(|h| !h.cancelled.load(Ordering::Acquire));
        if let Some(first) = live.next() {
            let message = error.to_string();
            first.subscriber.on_error(error);
            for handle in live {
                handle
                    .subscriber
                    .on_error(FluxionError::stream_error(message.clone()));
            }
        }
    }
}

struct InnerSubscription<T: Send + Sync + 'static> {
    state: Arc<PublishState<T>>,
    handle: Arc<InnerHandle<T>>,
}

impl<T: Send + Sync + 'static> Subscription for InnerSubscription<T> {
    fn request(&self, n: u64) {
        saturating_add(&self.handle.requested, n);
        self.state.recompute_demand();
    }

    fn cancel(&self) {
        self.state.drop_handle(&self.handle);
    }
}

/// The `Flux<T>` the selector function is handed: every `subscribe` call
/// registers a new multicast tap rather than starting a fresh upstream
/// subscription.
struct PublishProcessor<T: Send + Sync + 'static> {
    state: Arc<PublishState<T>>,
    upstream: Mutex<Option<Flux<T>>>,
}

impl<T: Send + Sync + 'static> Publisher<T> for PublishProcessor<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let handle = Arc::new(InnerHandle {
            subscriber,
            requested: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        });
        self.state.handles.lock().push(Arc::clone(&handle));
        handle.subscriber.on_subscribe(Arc::new(InnerSubscription {
            state: Arc::clone(&self.state),
            handle,
        }));

        if !self.state.started.swap(true, Ordering::AcqRel) {
            if let Some(upstream) = self.upstream.lock().take() {
                let main = Arc::new(MainSubscriber {
                    state: Arc::clone(&self.state),
                });
                upstream.subscribe_arc(main);
            }
        }
    }
}

struct MainSubscriber<T: Send + Sync + 'static> {
    state: Arc<PublishState<T>>,
}

impl<T: Clone + Send + Sync + 'static> Subscriber<T> for MainSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.state.upstream_subscription.lock() = Some(subscription);
        self.state.recompute_demand();
    }

    fn on_next(&self, value: T) {
        saturating_sub(&self.state.upstream_requested, 1);
        let handles = self.state.handles.lock().clone();
        for handle in &handles {
            if !handle.cancelled.load(Ordering::Acquire) {
                saturating_sub(&handle.requested, 1);
                handle.subscriber.on_next(value.clone());
            }
        }
    }

    fn on_error(&self, error: FluxionError) {
        self.state.broadcast_error(error);
    }

    fn on_complete(&self) {
        self.state.broadcast_complete();
    }
}

impl<T: Clone + Send + Sync + 'static> CoreSubscriber<T> for MainSubscriber<T> {
    fn current_context(&self) -> &Context {
        &self.state.context
    }
}

struct PublishPublisher<T: Send + Sync + 'static, R: Send + Sync + 'static> {
    upstream: Flux<T>,
    selector: Arc<dyn Fn(Flux<T>) -> Flux<R> + Send + Sync>,
}

impl<T: Clone + Send + Sync + 'static, R: Send + Sync + 'static> Publisher<R>
    for PublishPublisher<T, R>
{
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
        let state = Arc::new(PublishState {
            handles: Mutex::new(Vec::new()),
            upstream_subscription: Mutex::new(None),
            upstream_requested: AtomicU64::new(0),
            started: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            context: Context::empty(),
        });
        let multicast = Flux::from_publisher(PublishProcessor {
            state,
            upstream: Mutex::new(Some(self.upstream.clone())),
        });
        let outbound = (self.selector)(multicast);
        outbound.subscribe_arc(subscriber);
    }
}

/// `publish(upstream, selector)`.
pub fn publish<T, R>(
    upstream: Flux<T>,
    selector: impl Fn(Flux<T>) -> Flux<R> + Send + Sync + 'static,
) -> Flux<R>
where
    T: Clone + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    Flux::from_publisher(PublishPublisher {
        upstream,
        selector: Arc::new(selector),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_stream_multi::{from_array, map};
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn publish_multicasts_a_single_upstream_subscription() {
        let flux = publish(from_array(alloc::vec![1, 2, 3]), |shared: Flux<i32>| {
            map(shared, |v| v * 10)
        });
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(4, core::time::Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec![10, 20, 30]);
        assert!(subscriber.is_terminated());
    }
}
