// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `merge(N)`: subscribes to every source concurrently, buffers each one's
//! values in its own prefetch-sized queue, and a single WIP-guarded drain
//! loop emits them round-robin as downstream demand allows — the same
//! queue-per-source-plus-drain-loop shape [`crate::zip`] uses, minus the
//! all-queues-must-have-a-head requirement.

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

/// Subtracts one from `counter` unless it already holds [`UNBOUNDED`], in
/// which case the sentinel is sticky and no bookkeeping is needed.
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

struct MergeState<T: Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<T>>,
    queues: Vec<AnyQueue<T>>,
    upstreams: Mutex<Vec<Option<Arc<dyn Subscription>>>>,
    consumed: Vec<AtomicUsize>,
    upstreams_done: Vec<AtomicBool>,
    requested: AtomicU64,
    wip: AtomicUsize,
    next: AtomicUsize,
    terminated: AtomicBool,
    delay_error: bool,
    errors: Mutex<Vec<FluxionError>>,
}

impl<T: Send + Sync + 'static> MergeState<T> {
    fn drain(self: &Arc<Self>) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        loop {
            loop {
                if self.terminated.load(Ordering::Acquire) {
                    break;
                }
                let n = self.queues.len();
                let found = if self.requested.load(Ordering::Acquire) > 0 {
                    let start = self.next.load(Ordering::Relaxed);
                    (0..n)
                        .map(|offset| (start + offset) % n)
                        .find_map(|i| self.queues[i].pop().map(|v| (i, v)))
                } else {
                    None
                };

                match found {
                    Some((i, value)) => {
                        self.next.store((i + 1) % n, Ordering::Relaxed);
                        consume_one_demand(&self.requested);
                        self.downstream.on_next(value);

                        let consumed = self.consumed[i].fetch_add(1, Ordering::AcqRel) + 1;
                        if consumed == PREFETCH {
                            self.consumed[i].store(0, Ordering::Release);
                            if let Some(sub) = self.upstreams.lock()[i].clone() {
                                sub.request(PREFETCH as u64);
                            }
                        }
                    }
                    None => {
                        // No value was available to emit this round — either
                        // every queue is dry or downstream demand is
                        // exhausted. Completion isn't gated by demand, so
                        // check it unconditionally before giving up.
                        let all_done = (0..n).all(|i| {
                            self.upstreams_done[i].load(Ordering::Acquire)
                                && self.queues[i].is_empty()
                        });
                        if all_done {
                            self.finish_complete();
                        }
                        break;
                    }
                }
            }
            if self.wip.fetch_sub(1, Ordering::AcqRel) == 1 {
                break;
            }
        }
    }

    fn finish_complete(self: &Arc<Self>) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        let errors = core::mem::take(&mut *self.errors.lock());
        if errors.is_empty() {
            self.downstream.on_complete();
        } else if errors.len() == 1 {
            self.downstream.on_error(errors.into_iter().next().unwrap());
        } else {
            self.downstream.on_error(FluxionError::MultipleErrors {
                count: errors.len(),
                errors,
            });
        }
    }

    fn finish_error(self: &Arc<Self>, error: FluxionError) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        let ctx = self.downstream.current_context();
        for queue in &self.queues {
            queue.clear(|v| on_discard(ctx, v));
        }
        for sub in self.upstreams.lock().iter().flatten() {
            sub.cancel();
        }
        self.downstream.on_error(error);
    }
}

struct MergeSubscription<T: Send + Sync + 'static> {
    state: Arc<MergeState<T>>,
}

impl<T: Send + Sync + 'static> Subscription for MergeSubscription<T> {
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

struct MergeInner<T: Send + Sync + 'static> {
    state: Arc<MergeState<T>>,
    index: usize,
}

impl<T: Send + Sync + 'static> Subscriber<T> for MergeInner<T> {
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
                    .finish_error(FluxionError::resource_limit("merge", PREFETCH));
            }
        }
    }

    fn on_error(&self, error: FluxionError) {
        if self.state.delay_error {
            self.state.errors.lock().push(error);
            self.state.upstreams_done[self.index].store(true, Ordering::Release);
            self.state.drain();
        } else {
            self.state.finish_error(error);
        }
    }

    fn on_complete(&self) {
        self.state.upstreams_done[self.index].store(true, Ordering::Release);
        self.state.drain();
    }
}

impl<T: Send + Sync + 'static> CoreSubscriber<T> for MergeInner<T> {
    fn current_context(&self) -> &Context {
        self.state.downstream.current_context()
    }
}

struct MergePublisher<T: Send + Sync + 'static> {
    sources: Mutex<Option<Vec<Flux<T>>>>,
    delay_error: bool,
}

impl<T: Send + Sync + 'static> Publisher<T> for MergePublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let sources = self.sources.lock().take().unwrap_or_default();
        let n = sources.len();
        let state = Arc::new(MergeState {
            downstream: subscriber,
            queues: (0..n).map(|_| new_queue(PREFETCH)).collect(),
            upstreams: Mutex::new((0..n).map(|_| None).collect()),
            consumed: (0..n).map(|_| AtomicUsize::new(0)).collect(),
            upstreams_done: (0..n).map(|_| AtomicBool::new(false)).collect(),
            requested: AtomicU64::new(0),
            wip: AtomicUsize::new(0),
            next: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
            delay_error: self.delay_error,
            errors: Mutex::new(Vec::new()),
        });

        state.downstream.on_subscribe(Arc::new(MergeSubscription {
            state: Arc::clone(&state),
        }) as Arc<dyn Subscription>);

        if n == 0 {
            state.finish_complete();
            return;
        }

        for (index, source) in sources.into_iter().enumerate() {
            let inner = Arc::new(MergeInner {
                state: Arc::clone(&state),
                index,
            });
            source.subscribe_arc(inner);
        }
    }
}

/// `merge(sources)`: subscribes to every source at once, forwarding values
/// as they arrive with no ordering guarantee across sources. Completes once
/// every source has completed; the first error (fail-fast) cancels the
/// rest.
pub fn merge<T: Send + Sync + 'static>(sources: Vec<Flux<T>>) -> Flux<T> {
    Flux::from_publisher(MergePublisher {
        sources: Mutex::new(Some(sources)),
        delay_error: false,
    })
}

/// `merge` with delayed error: every source runs to completion before any
/// accumulated errors are delivered.
pub fn merge_delay_error<T: Send + Sync + 'static>(sources: Vec<Flux<T>>) -> Flux<T> {
    Flux::from_publisher(MergePublisher {
        sources: Mutex::new(Some(sources)),
        delay_error: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_stream_multi::from_array;
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn merge_emits_every_source_value() {
        let merged = merge(alloc::vec![
            from_array(alloc::vec![1, 2]),
            from_array(alloc::vec![3, 4]),
        ]);
        let subscriber = TestSubscriber::new();
        merged.subscribe(subscriber.clone());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(4, core::time::Duration::from_secs(1)));
        let mut values = subscriber.values();
        values.sort_unstable();
        assert_eq!(values, alloc::vec![1, 2, 3, 4]);
        assert!(subscriber.is_terminated());
    }

    #[test]
    fn merge_of_no_sources_completes_immediately() {
        let merged: Flux<i32> = merge(Vec::new());
        let subscriber = TestSubscriber::new();
        merged.subscribe(subscriber.clone());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(1, core::time::Duration::from_secs(1)));
        assert!(subscriber.is_terminated());
        assert!(subscriber.values().is_empty());
    }

    #[test]
    fn merge_honours_partial_downstream_demand() {
        let merged = merge(alloc::vec![from_array(alloc::vec![1, 2, 3, 4])]);
        let subscriber = TestSubscriber::new();
        merged.subscribe(subscriber.clone());
        subscriber.request(2);
        assert!(subscriber.wait_for(2, core::time::Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec![1, 2]);
        assert!(!subscriber.is_terminated());
        subscriber.request(2);
        assert!(subscriber.wait_for(4, core::time::Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec![1, 2, 3, 4]);
        assert!(subscriber.is_terminated());
    }
}
