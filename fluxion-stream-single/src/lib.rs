// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![cfg_attr(not(feature = "std"), no_std)]
//! `Mono<T>`: at-most-one-value sources and the stateless transforms that
//! apply to it (the `Mono` half of component E/F).
//!
//! A `Mono` is not a separate protocol: it is a `Flux` a caller has
//! promised will never emit more than one value, so every constructor here
//! reduces to the same [`fluxion_stream_core::queue_subscription::ScalarSubscription`]
//! fast path `fluxion-stream-multi` uses for its scalar sources.

extern crate alloc;

pub mod sources;
pub mod transforms;

pub use sources::{defer, empty, error, from_callable, just};
pub use transforms::{do_on_next, filter, map};

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use fluxion_test_utils::step_verifier;

    #[test]
    fn just_emits_one_value_then_completes() {
        let mono = just(42);
        let subscriber = step_verifier::TestSubscriber::new();
        mono.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(2, Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec![42]);
        assert!(subscriber.is_terminated());
    }

    #[test]
    fn empty_completes_without_a_value() {
        let mono: fluxion_stream_core::Mono<i32> = empty();
        let subscriber = step_verifier::TestSubscriber::new();
        mono.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(1, Duration::from_secs(1)));
        assert!(subscriber.values().is_empty());
        assert!(subscriber.is_terminated());
        assert!(subscriber.error().is_none());
    }

    #[test]
    fn map_transforms_the_single_value() {
        let mono = map(just(2), |v: i32| v * 10);
        let subscriber = step_verifier::TestSubscriber::new();
        mono.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(2, Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec![20]);
    }

    #[test]
    fn filter_rejecting_the_value_completes_empty() {
        let mono = filter(just(3), |v: &i32| *v % 2 == 0);
        let subscriber = step_verifier::TestSubscriber::new();
        mono.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(1, Duration::from_secs(1)));
        assert!(subscriber.values().is_empty());
        assert!(subscriber.is_terminated());
    }

    #[test]
    fn filter_accepting_the_value_passes_it_through() {
        let mono = filter(just(4), |v: &i32| *v % 2 == 0);
        let subscriber = step_verifier::TestSubscriber::new();
        mono.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(2, Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec![4]);
    }
}
