// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `amb(sources)`: subscribes to every source, lets the first one
//! to emit *any* signal (`onNext`, `onError`, or `onComplete`) win the
//! race, and cancels the rest. Only the winner's signals reach downstream
//! from that point on.
//!
//! Demand from downstream is broadcast to every still-live candidate until
//! a winner is decided (a candidate needs *some* demand to have a chance
//! at producing the race-deciding signal in the first place); once a
//! winner exists, further requests go to it alone.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use fluxion_core::context::Context;
use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_core::subscription::Subscription;
use fluxion_error::FluxionError;
use fluxion_stream_core::Flux;

const NONE: usize = usize::MAX;

struct AmbState<T: Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<T>>,
    winner: AtomicUsize,
    subscriptions: Mutex<Vec<Option<Arc<dyn Subscription>>>>,
    pending_request: AtomicU64,
}

impl<T: Send + Sync + 'static> AmbState<T> {
    fn claim(&self, index: usize) -> bool {
        self.winner
            .compare_exchange(NONE, index, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn is_winner(&self, index: usize) -> bool {
        self.winner.load(Ordering::Acquire) == index
    }

    fn cancel_losers(&self, winner: usize) {
        for (index, sub) in self.subscriptions.lock().iter().enumerate() {
            if index != winner {
                if let Some(sub) = sub {
                    sub.cancel();
                }
            }
        }
    }
}

struct AmbSubscription<T: Send + Sync + 'static> {
    state: Arc<AmbState<T>>,
}

impl<T: Send + Sync + 'static> Subscription for AmbSubscription<T> {
    fn request(&self, n: u64) {
        let mut current = self.state.pending_request.load(Ordering::Acquire);
        loop {
            let next = current.saturating_add(n);
            match self.state.pending_request.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        let winner = self.state.winner.load(Ordering::Acquire);
        let subscriptions = self.state.subscriptions.lock();
        if winner == NONE {
            for sub in subscriptions.iter().flatten() {
                sub.request(n);
            }
        } else if let Some(Some(sub)) = subscriptions.get(winner) {
            sub.request(n);
        }
    }

    fn cancel(&self) {
        let winner = self.state.winner.load(Ordering::Acquire);
        let subscriptions = self.state.subscriptions.lock();
        if winner == NONE {
            for sub in subscriptions.iter().flatten() {
                sub.cancel();
            }
        } else if let Some(Some(sub)) = subscriptions.get(winner) {
            sub.cancel();
        }
    }
}

struct AmbInner<T: Send + Sync + 'static> {
    state: Arc<AmbState<T>>,
    index: usize,
}

impl<T: Send + Sync + 'static> Subscriber<T> for AmbInner<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.state.subscriptions.lock()[self.index] = Some(Arc::clone(&subscription));
        let winner = self.state.winner.load(Ordering::Acquire);
        if winner != NONE && winner != self.index {
            subscription.cancel();
            return;
        }
        let pending = self.state.pending_request.load(Ordering::Acquire);
        if pending > 0 {
            subscription.request(pending);
        }
    }

    fn on_next(&self, value: T) {
        if self.state.claim(self.index) {
            self.state.cancel_losers(self.index);
        }
        if self.state.is_winner(self.index) {
            self.state.downstream.on_next(value);
        }
    }

    fn on_error(&self, error: FluxionError) {
        if self.state.claim(self.index) {
            self.state.cancel_losers(self.index);
        }
        if self.state.is_winner(self.index) {
            self.state.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if self.state.claim(self.index) {
            self.state.cancel_losers(self.index);
        }
        if self.state.is_winner(self.index) {
            self.state.downstream.on_complete();
        }
    }
}

impl<T: Send + Sync + 'static> CoreSubscriber<T> for AmbInner<T> {
    fn current_context(&self) -> &Context {
        self.state.downstream.current_context()
    }
}

struct AmbPublisher<T: Send + Sync + 'static> {
    sources: Mutex<Option<Vec<Flux<T>>>>,
}

impl<T: Send + Sync + 'static> Publisher<T> for AmbPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let sources = self.sources.lock().take().unwrap_or_default();
        let n = sources.len();

        if n == 0 {
            subscriber.on_subscribe(Arc::new(fluxion_core::subscription::NoopSubscription));
            subscriber.on_complete();
            return;
        }

        let state = Arc::new(AmbState {
            downstream: subscriber,
            winner: AtomicUsize::new(NONE),
            subscriptions: Mutex::new((0..n).map(|_| None).collect()),
            pending_request: AtomicU64::new(0),
        });

        state
            .downstream
            .on_subscribe(Arc::new(AmbSubscription { state: Arc::clone(&state) }));

        for (index, source) in sources.into_iter().enumerate() {
            let inner = Arc::new(AmbInner {
                state: Arc::clone(&state),
                index,
            });
            source.subscribe_arc(inner);
        }
    }
}

/// `amb(sources)`: the first source to produce any signal wins; every
/// other source is cancelled immediately. An empty `sources` completes
/// immediately.
pub fn amb<T: Send + Sync + 'static>(sources: Vec<Flux<T>>) -> Flux<T> {
    Flux::from_publisher(AmbPublisher {
        sources: Mutex::new(Some(sources)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_stream_multi::from_array;
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn amb_lets_the_first_source_to_emit_win() {
        let raced = amb(alloc::vec![
            from_array(alloc::vec![1, 2, 3]),
            from_array(alloc::vec![100]),
        ]);
        let subscriber = TestSubscriber::new();
        raced.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(1, core::time::Duration::from_secs(1)));
        assert!(!subscriber.values().is_empty());
    }

    #[test]
    fn amb_of_no_sources_completes_immediately() {
        let raced: Flux<i32> = amb(Vec::new());
        let subscriber = TestSubscriber::new();
        raced.subscribe(subscriber.clone());
        assert!(subscriber.wait_for(0, core::time::Duration::from_millis(200)));
        assert!(subscriber.is_terminated());
    }
}
