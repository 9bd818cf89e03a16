// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `combineLatest(N)`: re-emits a combination of the most
//! recent value from every source whenever any one of them produces a new
//! value, once every source has produced at least one. Delivery is
//! serialized through [`SerializedSubscriber`] the same way `merge` is.
//!
//! Demand only gates the combined *output*: every source is still asked for
//! [`UNBOUNDED`] input, since conflating down to one slot — not a per-value
//! queue — is what keeps this operator "latest value", the same way a
//! `BehaviorSubject`-backed combinator never needs to track each source's
//! interior backlog. When downstream demand is exhausted, a newer
//! combination simply overwrites the one still waiting to be requested.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use fluxion_core::context::Context;
use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::operators::{add_cap, on_discard};
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_core::subscription::{Subscription, UNBOUNDED};
use fluxion_error::FluxionError;
use fluxion_stream_core::half_serializer::SerializedSubscriber;
use fluxion_stream_core::Flux;

fn add_demand(counter: &AtomicU64, n: u64) {
    let mut current = counter.load(Ordering::Acquire);
    loop {
        let next = add_cap(current, n);
        match counter.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return,
            Err(observed) => current = observed,
        }
    }
}

fn try_consume_demand(counter: &AtomicU64) -> bool {
    let mut current = counter.load(Ordering::Acquire);
    loop {
        if current == 0 {
            return false;
        }
        let next = if current == UNBOUNDED { UNBOUNDED } else { current - 1 };
        match counter.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return true,
            Err(observed) => current = observed,
        }
    }
}

struct DownstreamWrapper<T: Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<Vec<T>>>,
}

impl<T: Send + Sync + 'static> Subscriber<Vec<T>> for DownstreamWrapper<T> {
    fn on_subscribe(&self, _subscription: Arc<dyn Subscription>) {}
    fn on_next(&self, value: Vec<T>) {
        self.downstream.on_next(value);
    }
    fn on_error(&self, error: FluxionError) {
        self.downstream.on_error(error);
    }
    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static> CoreSubscriber<Vec<T>> for DownstreamWrapper<T> {
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

struct CombineLatestState<T: Clone + Send + Sync + 'static> {
    serialized: SerializedSubscriber<Vec<T>, DownstreamWrapper<T>>,
    latest: Vec<Mutex<Option<T>>>,
    active: AtomicUsize,
    upstreams: Mutex<Vec<Arc<dyn Subscription>>>,
    requested: AtomicU64,
    pending: Mutex<Option<Vec<T>>>,
    completing: AtomicBool,
    terminated: AtomicBool,
}

impl<T: Clone + Send + Sync + 'static> CombineLatestState<T> {
    fn emit_if_ready(&self) {
        let mut combined = Vec::with_capacity(self.latest.len());
        for slot in &self.latest {
            match slot.lock().clone() {
                Some(v) => combined.push(v),
                None => return,
            }
        }
        let mut pending = self.pending.lock();
        if let Some(stale) = pending.replace(combined) {
            on_discard(self.serialized.inner().current_context(), stale);
        }
        drop(pending);
        self.flush_pending();
    }

    fn flush_pending(&self) {
        loop {
            let mut pending = self.pending.lock();
            let Some(value) = pending.take() else {
                drop(pending);
                self.maybe_complete();
                return;
            };
            if try_consume_demand(&self.requested) {
                drop(pending);
                self.serialized.on_next(value);
            } else {
                *pending = Some(value);
                return;
            }
        }
    }

    fn maybe_complete(&self) {
        if self.completing.load(Ordering::Acquire)
            && self.pending.lock().is_none()
            && !self.terminated.swap(true, Ordering::AcqRel)
        {
            self.serialized.on_complete();
        }
    }

    fn abort(&self, error: FluxionError) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        for sub in self.upstreams.lock().drain(..) {
            sub.cancel();
        }
        if let Some(pending) = self.pending.lock().take() {
            on_discard(self.serialized.inner().current_context(), pending);
        }
        self.serialized.on_error(error);
    }
}

struct CombineLatestSubscription<T: Clone + Send + Sync + 'static> {
    state: Arc<CombineLatestState<T>>,
}

impl<T: Clone + Send + Sync + 'static> Subscription for CombineLatestSubscription<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        add_demand(&self.state.requested, n);
        self.state.flush_pending();
    }

    fn cancel(&self) {
        if self.state.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        for sub in self.state.upstreams.lock().drain(..) {
            sub.cancel();
        }
        if let Some(pending) = self.state.pending.lock().take() {
            on_discard(self.state.serialized.inner().current_context(), pending);
        }
    }
}

struct CombineLatestInner<T: Clone + Send + Sync + 'static> {
    state: Arc<CombineLatestState<T>>,
    index: usize,
}

impl<T: Clone + Send + Sync + 'static> Subscriber<T> for CombineLatestInner<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        subscription.request(UNBOUNDED);
        self.state.upstreams.lock().push(subscription);
    }

    fn on_next(&self, value: T) {
        *self.state.latest[self.index].lock() = Some(value);
        self.state.emit_if_ready();
    }

    fn on_error(&self, error: FluxionError) {
        self.state.abort(error);
    }

    fn on_complete(&self) {
        if self.state.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.state.completing.store(true, Ordering::Release);
            self.state.maybe_complete();
        }
    }
}

impl<T: Clone + Send + Sync + 'static> CoreSubscriber<T> for CombineLatestInner<T> {
    fn current_context(&self) -> &Context {
        self.state.serialized.inner().current_context()
    }
}

struct CombineLatestPublisher<T: Clone + Send + Sync + 'static> {
    sources: Mutex<Option<Vec<Flux<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> Publisher<Vec<T>> for CombineLatestPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<Vec<T>>>) {
        let sources = self.sources.lock().take().unwrap_or_default();
        let n = sources.len();
        let wrapper = Arc::new(DownstreamWrapper {
            downstream: Arc::clone(&subscriber),
        });
        let state = Arc::new(CombineLatestState {
            serialized: SerializedSubscriber::new(wrapper),
            latest: (0..n).map(|_| Mutex::new(None)).collect(),
            active: AtomicUsize::new(n),
            upstreams: Mutex::new(Vec::new()),
            requested: AtomicU64::new(0),
            pending: Mutex::new(None),
            completing: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        });

        subscriber.on_subscribe(Arc::new(CombineLatestSubscription {
            state: Arc::clone(&state),
        }) as Arc<dyn Subscription>);

        if n == 0 {
            state.completing.store(true, Ordering::Release);
            state.maybe_complete();
            return;
        }

        for (index, source) in sources.into_iter().enumerate() {
            let inner = Arc::new(CombineLatestInner {
                state: Arc::clone(&state),
                index,
            });
            source.subscribe_arc(inner);
        }
    }
}

/// `combine_latest(sources)`: once every source has emitted at least once,
/// re-emits the full `Vec` of latest values whenever any source emits
/// again.
pub fn combine_latest<T: Clone + Send + Sync + 'static>(sources: Vec<Flux<T>>) -> Flux<Vec<T>> {
    Flux::from_publisher(CombineLatestPublisher {
        sources: Mutex::new(Some(sources)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_stream_multi::from_array;
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn combine_latest_waits_for_every_source_then_re_emits() {
        let combined = combine_latest(alloc::vec![
            from_array(alloc::vec![1, 2]),
            from_array(alloc::vec![10]),
        ]);
        let subscriber = TestSubscriber::new();
        combined.subscribe(subscriber.clone());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(1, core::time::Duration::from_secs(1)));
        let values = subscriber.values();
        assert!(values.contains(&alloc::vec![2, 10]));
        assert!(subscriber.is_terminated());
    }

    #[test]
    fn combine_latest_conflates_while_demand_is_exhausted() {
        // Both sources finish synchronously before any demand is requested,
        // so every intermediate combination but the last is overwritten —
        // only the final snapshot is ever delivered.
        let combined = combine_latest(alloc::vec![
            from_array(alloc::vec![1, 2, 3]),
            from_array(alloc::vec![10]),
        ]);
        let subscriber = TestSubscriber::new();
        combined.subscribe(subscriber.clone());
        subscriber.request(1);
        assert!(subscriber.wait_for(1, core::time::Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec![alloc::vec![3, 10]]);
        assert!(subscriber.is_terminated());
    }
}
