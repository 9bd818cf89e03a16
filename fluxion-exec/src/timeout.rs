// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `timeout(duration, fallback)`: a scheduled watchdog task is reset
//! on every `onNext`; if it fires before the next value arrives, upstream is
//! cancelled and either an error or a fallback source takes over.
//!
//! The race between a firing watchdog and a concurrent `onNext` is resolved
//! with an "indexed epoch" CAS: every `onNext` bumps an epoch counter and
//! reschedules a task that captures the epoch it expects to still be
//! current when it fires. A task whose expected epoch no longer matches
//! lost the race and is a no-op.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fluxion_core::context::Context;
use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_core::subscription::Subscription;
use fluxion_error::FluxionError;
use fluxion_runtime::scheduler::{CancelHandle, Scheduler};
use fluxion_stream_core::multi_subscription::MultiSubscriptionSubscriber;
use fluxion_stream_core::Flux;

enum OnExpire<T: Send + Sync + 'static> {
    Fallback(Flux<T>),
    Error,
}

struct TimeoutState<T: Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<T>>,
    scheduler: Arc<dyn Scheduler>,
    duration: Duration,
    on_expire: OnExpire<T>,
    multi: Arc<MultiSubscriptionSubscriber>,
    epoch: AtomicU64,
    task: Mutex<Option<Arc<dyn CancelHandle>>>,
    switched: std::sync::atomic::AtomicBool,
}

impl<T: Send + Sync + 'static> TimeoutState<T> {
    fn schedule_watchdog(self: &Arc<Self>, expected_epoch: u64) {
        let state = Arc::clone(self);
        let handle = self.scheduler.schedule_after(
            self.duration,
            Box::new(move || state.fire(expected_epoch)),
        );
        match handle {
            Ok(handle) => {
                if let Some(old) = self.task.lock().replace(handle) {
                    old.cancel();
                }
            }
            Err(error) => self.terminate_with_error(error),
        }
    }

    fn fire(self: &Arc<Self>, expected_epoch: u64) {
        if self
            .epoch
            .compare_exchange(
                expected_epoch,
                expected_epoch,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return;
        }
        if self.switched.swap(true, Ordering::AcqRel) {
            return;
        }
        self.multi.cancel();
        match &self.on_expire {
            OnExpire::Error => {
                self.downstream.on_error(FluxionError::timeout(
                    "timeout operator",
                    self.duration,
                ));
            }
            OnExpire::Fallback(fallback) => {
                let inner = Arc::new(TimeoutInner {
                    state: Arc::clone(self),
                });
                fallback.subscribe_arc(inner);
            }
        }
    }

    fn terminate_with_error(self: &Arc<Self>, error: FluxionError) {
        if self.switched.swap(true, Ordering::AcqRel) {
            return;
        }
        self.multi.cancel();
        self.downstream.on_error(error);
    }
}

struct TimeoutInner<T: Send + Sync + 'static> {
    state: Arc<TimeoutState<T>>,
}

impl<T: Send + Sync + 'static> Subscriber<T> for TimeoutInner<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.state.multi.set_subscription(subscription);
    }

    fn on_next(&self, value: T) {
        self.state.multi.produced(1);
        let epoch = self.state.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.downstream.on_next(value);
        if !self.state.switched.load(Ordering::Acquire) {
            self.state.schedule_watchdog(epoch);
        }
    }

    fn on_error(&self, error: FluxionError) {
        if let Some(task) = self.state.task.lock().take() {
            task.cancel();
        }
        self.state.downstream.on_error(error);
    }

    fn on_complete(&self) {
        if let Some(task) = self.state.task.lock().take() {
            task.cancel();
        }
        self.state.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static> CoreSubscriber<T> for TimeoutInner<T> {
    fn current_context(&self) -> &Context {
        self.state.downstream.current_context()
    }
}

struct TimeoutPublisher<T: Send + Sync + 'static> {
    source: Flux<T>,
    duration: Duration,
    scheduler: Arc<dyn Scheduler>,
    fallback: Option<Flux<T>>,
}

impl<T: Send + Sync + 'static> Publisher<T> for TimeoutPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let state = Arc::new(TimeoutState {
            downstream: subscriber,
            scheduler: Arc::clone(&self.scheduler),
            duration: self.duration,
            on_expire: match &self.fallback {
                Some(fallback) => OnExpire::Fallback(fallback.clone()),
                None => OnExpire::Error,
            },
            multi: Arc::new(MultiSubscriptionSubscriber::new()),
            epoch: AtomicU64::new(0),
            task: Mutex::new(None),
            switched: std::sync::atomic::AtomicBool::new(false),
        });
        state
            .downstream
            .on_subscribe(Arc::clone(&state.multi) as Arc<dyn Subscription>);
        state.schedule_watchdog(0);
        let inner = Arc::new(TimeoutInner {
            state: Arc::clone(&state),
        });
        self.source.subscribe_arc(inner);
    }
}

/// Deliver `FluxionError::Timeout` if no value arrives within `duration` of
/// subscribe or the previous `onNext`.
pub fn timeout<T: Send + Sync + 'static>(
    source: Flux<T>,
    duration: Duration,
    scheduler: Arc<dyn Scheduler>,
) -> Flux<T> {
    Flux::from_publisher(TimeoutPublisher {
        source,
        duration,
        scheduler,
        fallback: None,
    })
}

/// Switch to `fallback` if no value arrives within `duration` of subscribe
/// or the previous `onNext`; cancels the timed-out upstream first.
pub fn timeout_with_fallback<T: Send + Sync + 'static>(
    source: Flux<T>,
    duration: Duration,
    fallback: Flux<T>,
    scheduler: Arc<dyn Scheduler>,
) -> Flux<T> {
    Flux::from_publisher(TimeoutPublisher {
        source,
        duration,
        scheduler,
        fallback: Some(fallback),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_runtime::impls::tokio::TokioScheduler;
    use fluxion_stream_multi::just;
    use fluxion_test_utils::step_verifier::TestSubscriber;

    struct NeverPublisher;

    impl Publisher<i32> for NeverPublisher {
        fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<i32>>) {
            subscriber.on_subscribe(Arc::new(fluxion_core::subscription::NoopSubscription));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn timeout_errors_out_when_upstream_never_emits() {
        let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler::new());
        let flux = timeout(
            Flux::from_publisher(NeverPublisher),
            Duration::from_millis(20),
            scheduler,
        );
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(subscriber.is_terminated());
        assert!(subscriber.error().is_some());
        assert!(subscriber.values().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn timeout_with_fallback_switches_over_once_the_watchdog_fires() {
        let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler::new());
        let flux = timeout_with_fallback(
            Flux::from_publisher(NeverPublisher),
            Duration::from_millis(20),
            just(99),
            scheduler,
        );
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(subscriber.is_terminated());
        assert!(subscriber.error().is_none());
        assert_eq!(subscriber.values(), vec![99]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn a_value_arriving_before_the_deadline_resets_the_watchdog() {
        let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler::new());
        let flux = timeout(just(7), Duration::from_millis(200), scheduler);
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);

        assert!(subscriber.wait_for(1, Duration::from_secs(1)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(subscriber.values(), vec![7]);
        assert!(subscriber.is_terminated());
        assert!(subscriber.error().is_none());
    }
}
