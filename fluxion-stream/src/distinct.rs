// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `distinct`/`distinctBy`: suppress elements already seen, keyed by
//! the element itself or by a user-supplied key function.
//!
//! A value the predicate rejects is a value the *downstream* never asked
//! to see again, not one the operator failed to deliver — matching .F's
//! "filter ... do not decrement effective demand" rule for conditional
//! rejection, `distinct` forwards every upstream `request(n)` unchanged: it
//! never knows in advance how many of the next `n` upstream elements will
//! be duplicates, so it can only ask upstream for at least as much as
//! downstream asked for and let extra demand accumulate if repeats show up.

use alloc::sync::Arc;
use core::hash::Hash;
use std::collections::HashSet;

use fluxion_core::context::Context;
use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_core::subscription::Subscription;
use fluxion_error::FluxionError;
use fluxion_stream_core::Flux;

struct DistinctSubscriber<T, K: Eq + Hash + Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<T>>,
    key_fn: Arc<dyn Fn(&T) -> K + Send + Sync>,
    seen: Mutex<HashSet<K>>,
}

impl<T: Send + Sync + 'static, K: Eq + Hash + Send + Sync + 'static> Subscriber<T> for DistinctSubscriber<T, K> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&self, value: T) {
        let key = (self.key_fn)(&value);
        let is_new = self.seen.lock().insert(key);
        if is_new {
            self.downstream.on_next(value);
        } else {
            fluxion_core::operators::on_discard(self.downstream.current_context(), value);
        }
    }

    fn on_error(&self, error: FluxionError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static, K: Eq + Hash + Send + Sync + 'static> CoreSubscriber<T> for DistinctSubscriber<T, K> {
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

struct DistinctPublisher<T, K: Eq + Hash + Send + Sync + 'static> {
    upstream: Flux<T>,
    key_fn: Arc<dyn Fn(&T) -> K + Send + Sync>,
}

impl<T: Send + Sync + 'static, K: Eq + Hash + Send + Sync + 'static> Publisher<T> for DistinctPublisher<T, K> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let inner = Arc::new(DistinctSubscriber {
            downstream: subscriber,
            key_fn: Arc::clone(&self.key_fn),
            seen: Mutex::new(HashSet::new()),
        });
        self.upstream.subscribe_arc(inner);
    }
}

/// `distinctBy(upstream, key_fn)`: suppress elements whose key (as computed
/// by `key_fn`) has already been seen on this subscription.
pub fn distinct_by<T, K>(upstream: Flux<T>, key_fn: impl Fn(&T) -> K + Send + Sync + 'static) -> Flux<T>
where
    T: Send + Sync + 'static,
    K: Eq + Hash + Send + Sync + 'static,
{
    Flux::from_publisher(DistinctPublisher {
        upstream,
        key_fn: Arc::new(key_fn),
    })
}

/// `distinct(upstream)`: suppress elements equal to one already seen on
/// this subscription, keyed by the element's own `Clone`.
pub fn distinct<T>(upstream: Flux<T>) -> Flux<T>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
{
    distinct_by(upstream, Clone::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use fluxion_core::subscription::UNBOUNDED;
    use fluxion_stream_multi::from_array;
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn distinct_suppresses_repeats() {
        let flux = distinct(from_array(alloc::vec![1, 2, 2, 3, 1, 4]));
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(4, Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec![1, 2, 3, 4]);
        assert!(subscriber.is_terminated());
    }

    #[test]
    fn distinct_by_keys_on_a_projection() {
        let flux = distinct_by(from_array(alloc::vec!["aa", "b", "cc", "d"]), |s: &&str| s.len());
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(UNBOUNDED);
        assert!(subscriber.wait_for(2, Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec!["aa", "b"]);
    }
}
