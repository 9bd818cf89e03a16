// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `zip(N)`: a per-source bounded queue of `prefetch` size;
//! a drain loop emits a tuple only once every queue has a head AND
//! downstream demand allows it, refilling each source's demand by
//! `prefetch` once it has consumed that many.
//!
//! Tuples are emitted as `Vec<T>` (homogeneous arity) rather than a fixed
//! tuple type: the sources this zip combines are already-homogeneous
//! `Flux<T>`s, and the positional-pairing behaviour is identical either way.

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
use fluxion_queues::{new_queue, AnyQueue, Spsc};
use fluxion_stream_core::Flux;

const PREFETCH: usize = 128;

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

fn consume_one_demand(counter: &AtomicU64) {
    let mut current = counter.load(Ordering::Acquire);
    loop {
        if current == UNBOUNDED {
            return;
        }
        let next = current.saturating_sub(1);
        match counter.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return,
            Err(observed) => current = observed,
        }
    }
}

struct ZipState<T: Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<Vec<T>>>,
    queues: Vec<AnyQueue<T>>,
    upstreams: Mutex<Vec<Option<Arc<dyn Subscription>>>>,
    consumed: Vec<AtomicUsize>,
    requested: AtomicU64,
    wip: AtomicUsize,
    terminated: AtomicBool,
    upstreams_done: Vec<AtomicBool>,
}

impl<T: Send + Sync + 'static> ZipState<T> {
    fn drain(self: &Arc<Self>) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        loop {
            loop {
                if self.terminated.load(Ordering::Acquire) {
                    break;
                }
                let ready = self.requested.load(Ordering::Acquire) > 0
                    && !self.queues.iter().any(Spsc::is_empty);
                if !ready {
                    // Either downstream demand is exhausted or some queue is
                    // dry. Completion isn't gated by demand, so check it
                    // unconditionally before giving up on this round.
                    if self
                        .upstreams_done
                        .iter()
                        .enumerate()
                        .any(|(i, done)| done.load(Ordering::Acquire) && self.queues[i].is_empty())
                    {
                        self.finish(|d| d.on_complete());
                    }
                    break;
                }
                consume_one_demand(&self.requested);
                let tuple: Vec<T> = self.queues.iter().map(|q| q.pop().unwrap()).collect();
                self.downstream.on_next(tuple);
                for (i, counter) in self.consumed.iter().enumerate() {
                    let c = counter.fetch_add(1, Ordering::AcqRel) + 1;
                    if c == PREFETCH {
                        counter.store(0, Ordering::Release);
                        if let Some(sub) = self.upstreams.lock()[i].clone() {
                            sub.request(PREFETCH as u64);
                        }
                    }
                }
            }
            if self.wip.fetch_sub(1, Ordering::AcqRel) == 1 {
                break;
            }
        }
    }

    fn finish(self: &Arc<Self>, f: impl FnOnce(&Arc<dyn CoreSubscriber<Vec<T>>>)) {
        if !self.terminated.swap(true, Ordering::AcqRel) {
            for sub in self.upstreams.lock().iter().flatten() {
                sub.cancel();
            }
            let ctx = self.downstream.current_context();
            for queue in &self.queues {
                queue.clear(|v| on_discard(ctx, v));
            }
            f(&self.downstream);
        }
    }

    fn error(self: &Arc<Self>, error: FluxionError) {
        self.finish(|d| d.on_error(error));
    }
}

struct ZipSubscription<T: Send + Sync + 'static> {
    state: Arc<ZipState<T>>,
}

impl<T: Send + Sync + 'static> Subscription for ZipSubscription<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        add_demand(&self.state.requested, n);
        self.state.drain();
    }

    fn cancel(&self) {
        if self.state.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        let ctx = self.state.downstream.current_context();
        for queue in &self.state.queues {
            queue.clear(|v| on_discard(ctx, v));
        }
        for sub in self.state.upstreams.lock().iter().flatten() {
            sub.cancel();
        }
    }
}

struct ZipInner<T: Send + Sync + 'static> {
    state: Arc<ZipState<T>>,
    index: usize,
}

impl<T: Send + Sync + 'static> Subscriber<T> for ZipInner<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        subscription.request(PREFETCH as u64);
        self.state.upstreams.lock()[self.index] = Some(subscription);
    }

    fn on_next(&self, value: T) {
        match self.state.queues[self.index].push(value) {
            Ok(()) => self.state.drain(),
            Err(value) => {
                let ctx = self.state.downstream.current_context();
                on_discard(ctx, value);
                self.state
                    .error(FluxionError::resource_limit("zip", PREFETCH));
            }
        }
    }

    fn on_error(&self, error: FluxionError) {
        self.state.error(error);
    }

    fn on_complete(&self) {
        self.state.upstreams_done[self.index].store(true, Ordering::Release);
        self.state.drain();
    }
}

impl<T: Send + Sync + 'static> CoreSubscriber<T> for ZipInner<T> {
    fn current_context(&self) -> &Context {
        self.state.downstream.current_context()
    }
}

struct ZipPublisher<T: Send + Sync + 'static> {
    sources: Mutex<Option<Vec<Flux<T>>>>,
}

impl<T: Send + Sync + 'static> Publisher<Vec<T>> for ZipPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<Vec<T>>>) {
        let sources = self.sources.lock().take().unwrap_or_default();
        let n = sources.len();
        let state = Arc::new(ZipState {
            downstream: subscriber,
            queues: (0..n).map(|_| new_queue(PREFETCH)).collect(),
            upstreams: Mutex::new((0..n).map(|_| None).collect()),
            consumed: (0..n).map(|_| AtomicUsize::new(0)).collect(),
            requested: AtomicU64::new(0),
            wip: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
            upstreams_done: (0..n).map(|_| AtomicBool::new(false)).collect(),
        });

        state.downstream.on_subscribe(Arc::new(ZipSubscription {
            state: Arc::clone(&state),
        }) as Arc<dyn Subscription>);

        if n == 0 {
            if !state.terminated.swap(true, Ordering::AcqRel) {
                state.downstream.on_complete();
            }
            return;
        }

        for (index, source) in sources.into_iter().enumerate() {
            let inner = Arc::new(ZipInner {
                state: Arc::clone(&state),
                index,
            });
            source.subscribe_arc(inner);
        }
    }
}

/// `zip(sources)`: emits `Vec<T>` tuples, one per position, once every
/// source has produced an element at that index. Terminates (completes or
/// errors) as soon as any source can no longer contribute another tuple.
pub fn zip<T: Send + Sync + 'static>(sources: Vec<Flux<T>>) -> Flux<Vec<T>> {
    Flux::from_publisher(ZipPublisher {
        sources: Mutex::new(Some(sources)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_stream_multi::from_array;
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn zip_pairs_values_by_position() {
        let zipped = zip(alloc::vec![
            from_array(alloc::vec![1, 2, 3]),
            from_array(alloc::vec![10, 20]),
        ]);
        let subscriber = TestSubscriber::new();
        zipped.subscribe(subscriber.clone());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(3, core::time::Duration::from_secs(1)));
        let values = subscriber.values();
        assert_eq!(values, alloc::vec![alloc::vec![1, 10], alloc::vec![2, 20]]);
        assert!(subscriber.is_terminated());
    }

    #[test]
    fn zip_honours_partial_downstream_demand() {
        let zipped = zip(alloc::vec![
            from_array(alloc::vec![1, 2, 3]),
            from_array(alloc::vec![10, 20, 30]),
        ]);
        let subscriber = TestSubscriber::new();
        zipped.subscribe(subscriber.clone());
        subscriber.request(1);
        assert!(subscriber.wait_for(1, core::time::Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec![alloc::vec![1, 10]]);
        assert!(!subscriber.is_terminated());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(3, core::time::Duration::from_secs(1)));
        assert!(subscriber.is_terminated());
    }
}
