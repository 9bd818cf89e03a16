// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! End-to-end pipelines exercising each operator family together, the way
//! a reader composing real `Flux`/`Mono` chains would use this crate.

use fluxion::flux;
use fluxion::prelude::*;
use fluxion_test_utils::step_verifier::TestSubscriber;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn map_filter_over_a_range() {
    let pipeline = flux::filter(flux::map(flux::range(1, 5), |x| x * 2), |x| *x > 4);
    let subscriber = TestSubscriber::new();
    pipeline.subscribe(subscriber.clone());
    subscriber.request(UNBOUNDED);
    assert!(subscriber.wait_for(3, Duration::from_secs(1)));
    assert_eq!(subscriber.values(), vec![6, 8, 10]);
    assert!(subscriber.is_terminated());
}

#[test]
fn concat_honours_staged_demand_across_both_sources() {
    let pipeline = flux::concat(vec![
        flux::from_array(vec![1, 2, 3]),
        flux::from_array(vec![4, 5]),
    ]);
    let subscriber = TestSubscriber::new();
    pipeline.subscribe(subscriber.clone());

    subscriber.request(3);
    assert!(subscriber.wait_for(3, Duration::from_secs(1)));
    assert_eq!(subscriber.values(), vec![1, 2, 3]);
    assert!(!subscriber.is_terminated());

    subscriber.request(2);
    assert!(subscriber.wait_for(5, Duration::from_secs(1)));
    assert_eq!(subscriber.values(), vec![1, 2, 3, 4, 5]);
    assert!(subscriber.is_terminated());
}

#[test]
fn switch_on_first_prepends_the_transformed_head_to_the_transformed_tail() {
    let upstream = flux::from_array(vec!["A", "B", "C"]);
    let pipeline = flux::switch_on_first(
        upstream,
        |sig, tail: Flux<&'static str>| {
            let first = match sig {
                Signal::Next(v) => v,
                _ => "",
            };
            flux::concat(vec![flux::just(first), flux::map(tail, |s| s)])
        },
        false,
    );
    let subscriber = TestSubscriber::new();
    pipeline.subscribe(subscriber.clone());
    subscriber.request(UNBOUNDED);
    assert!(subscriber.wait_for(4, Duration::from_secs(1)));
    assert_eq!(subscriber.values(), vec!["A", "B", "C"]);
    assert!(subscriber.is_terminated());
}

/// A source driven entirely by the test: `subscribe` just stashes the
/// downstream, and `emit`/`complete` push signals on demand. Used where a
/// seed scenario needs two sources interleaved in a specific order that two
/// synchronous `from_array` sources (each of which drains to completion the
/// instant it is subscribed) can't reproduce.
#[derive(Clone)]
struct ManualSource<T> {
    downstream: Arc<std::sync::Mutex<Option<Arc<dyn CoreSubscriber<T>>>>>,
}

impl<T: Send + Sync + 'static> ManualSource<T> {
    fn new() -> Self {
        Self { downstream: Arc::new(std::sync::Mutex::new(None)) }
    }

    fn emit(&self, value: T) {
        if let Some(d) = self.downstream.lock().unwrap().clone() {
            d.on_next(value);
        }
    }

    fn complete(&self) {
        if let Some(d) = self.downstream.lock().unwrap().clone() {
            d.on_complete();
        }
    }
}

impl<T: Send + Sync + 'static> Publisher<T> for ManualSource<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        subscriber.on_subscribe(Arc::new(fluxion_core::NoopSubscription));
        *self.downstream.lock().unwrap() = Some(subscriber);
    }
}

#[test]
fn buffer_boundary_splits_the_source_on_every_boundary_tick() {
    let main = ManualSource::<i32>::new();
    let boundary = ManualSource::<()>::new();
    let pipeline = flux::buffer_boundary(Flux::from_publisher(main.clone()), Flux::from_publisher(boundary.clone()));
    let subscriber = TestSubscriber::new();
    pipeline.subscribe(subscriber.clone());
    subscriber.request(UNBOUNDED);

    main.emit(1);
    main.emit(2);
    boundary.emit(());
    main.emit(3);
    main.emit(4);
    boundary.emit(());
    main.emit(5);
    main.complete();

    assert_eq!(subscriber.values(), vec![vec![1, 2], vec![3, 4], vec![5]]);
    assert!(subscriber.is_terminated());
}

#[test]
fn zip_pairs_a_stream_with_its_own_tail() {
    let source = flux::range(1, 5);
    let shifted = flux::skip(flux::range(1, 5), 1);
    let pipeline = flux::map(flux::zip(vec![source, shifted]), |pair: Vec<i64>| pair[0] + pair[1]);
    let subscriber = TestSubscriber::new();
    pipeline.subscribe(subscriber.clone());
    subscriber.request(UNBOUNDED);
    assert!(subscriber.wait_for(4, Duration::from_secs(1)));
    assert_eq!(subscriber.values(), vec![3, 5, 7, 9]);
    assert!(subscriber.is_terminated());
}

#[test]
fn publish_multicasts_one_upstream_subscription_to_a_mapped_selector() {
    let pipeline = flux::publish(flux::from_array(vec![1, 2, 3]), |shared| {
        flux::map(shared, |v| v * 10)
    });
    let subscriber = TestSubscriber::new();
    pipeline.subscribe(subscriber.clone());
    subscriber.request(UNBOUNDED);
    assert!(subscriber.wait_for(3, Duration::from_secs(1)));
    assert_eq!(subscriber.values(), vec![10, 20, 30]);
    assert!(subscriber.is_terminated());
}

/// A source that accepts a subscription and then never emits anything,
/// used to exercise a watchdog operator's firing path without a real clock
/// dependency on the producer side.
struct NeverPublisher;

impl Publisher<i32> for NeverPublisher {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<i32>>) {
        subscriber.on_subscribe(Arc::new(fluxion_core::NoopSubscription));
    }
}

#[tokio::test]
async fn timeout_with_fallback_switches_to_the_fallback_when_upstream_stalls() {
    use fluxion_runtime::impls::tokio::TokioScheduler;

    let never = Flux::from_publisher(NeverPublisher);
    let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler::new());
    let pipeline = flux::timeout_with_fallback(
        never,
        Duration::from_millis(20),
        flux::just(99),
        scheduler,
    );
    let subscriber = TestSubscriber::new();
    pipeline.subscribe(subscriber.clone());
    subscriber.request(UNBOUNDED);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(subscriber.wait_for(1, Duration::from_millis(500)));
    assert_eq!(subscriber.values(), vec![99]);
    assert!(subscriber.is_terminated());
}
