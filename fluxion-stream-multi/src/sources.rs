// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Component E: source operators. Each has a simple, well-defined state
//! machine and integrates with fusion where .E calls for it.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use fluxion_core::fuseable::{mode, FuseableSubscription};
use core::panic::AssertUnwindSafe;
use fluxion_core::operators::{self, add_cap, guard_user_fn};
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::CoreSubscriber;
use fluxion_core::subscription::Subscription;
use fluxion_error::FluxionError;
use fluxion_stream_core::queue_subscription::{ScalarSubscription, SliceSubscription};
use fluxion_stream_core::Flux;

/// `just(v)`: a scalar, fuseable source. Also usable as a `Callable`
/// analogue via [`JustFlux::value`] so assembly-time fusions (`just(v)
/// .flat_map(f)` collapsing to `f(v)`) are possible for operators that want
/// to special-case it; this crate does not perform that fusion itself since
/// `flatMap` lives outside this crate's scope.
pub struct JustPublisher<T> {
    value: T,
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for JustPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let sub = ScalarSubscription::new(self.value.clone(), subscriber.clone());
        subscriber.on_subscribe(sub);
    }
}

/// `just(v)`.
pub fn just<T: Clone + Send + Sync + 'static>(value: T) -> Flux<T> {
    Flux::from_publisher(JustPublisher { value })
}

/// `empty()`: completes synchronously after `onSubscribe`, no request
/// needed.
pub struct EmptyPublisher<T> {
    _marker: core::marker::PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Publisher<T> for EmptyPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        operators::complete(&*subscriber);
    }
}

/// `empty()`.
pub fn empty<T: Send + Sync + 'static>() -> Flux<T> {
    Flux::from_publisher(EmptyPublisher {
        _marker: core::marker::PhantomData,
    })
}

/// `error(throwable)` / `error(supplier)`: delivers a single terminal error.
/// The supplier form materializes the error lazily, once per subscribe.
pub struct ErrorPublisher<T> {
    supplier: Box<dyn Fn() -> FluxionError + Send + Sync>,
    _marker: core::marker::PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Publisher<T> for ErrorPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let err = (self.supplier)();
        operators::error(&*subscriber, err);
    }
}

/// `error(throwable)`.
pub fn error<T: Send + Sync + 'static>(err: FluxionError) -> Flux<T>
where
    FluxionError: Clone,
{
    error_with(move || err.clone())
}

/// `error(supplier)`.
pub fn error_with<T: Send + Sync + 'static>(
    supplier: impl Fn() -> FluxionError + Send + Sync + 'static,
) -> Flux<T> {
    Flux::from_publisher(ErrorPublisher {
        supplier: Box::new(supplier),
        _marker: core::marker::PhantomData,
    })
}

/// `defer(supplier)`: invokes `supplier` once per subscribe, then forwards
/// to the publisher it returns. Supplier failure maps to downstream
/// `onError`.
pub struct DeferPublisher<T> {
    supplier: Box<dyn Fn() -> Flux<T> + Send + Sync>,
}

impl<T: Send + Sync + 'static> Publisher<T> for DeferPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        match guard_user_fn("defer", AssertUnwindSafe(|| (self.supplier)())) {
            Ok(inner) => inner.subscribe_arc(subscriber),
            Err(e) => operators::error(&*subscriber, e),
        }
    }
}

/// `defer(supplier)`.
pub fn defer<T: Send + Sync + 'static>(
    supplier: impl Fn() -> Flux<T> + Send + Sync + 'static,
) -> Flux<T> {
    Flux::from_publisher(DeferPublisher {
        supplier: Box::new(supplier),
    })
}

/// `fromArray(values)`: sync-fusion producer over a pre-materialized slice.
pub struct FromArrayPublisher<T> {
    values: Vec<T>,
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for FromArrayPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        if self.values.is_empty() {
            operators::complete(&*subscriber);
            return;
        }
        let sub = SliceSubscription::new(self.values.clone(), subscriber.clone());
        subscriber.on_subscribe(sub);
    }
}

/// `fromArray(values)`.
pub fn from_array<T: Clone + Send + Sync + 'static>(values: Vec<T>) -> Flux<T> {
    Flux::from_publisher(FromArrayPublisher { values })
}

/// `fromIterable(iterable)`: like `fromArray` but driven by `hasNext`/`next`
/// calls rather than index access, discarding the remaining iterator state
/// on cancel instead of leaving it for a GC to reclaim.
pub struct FromIterablePublisher<T> {
    factory: Box<dyn Fn() -> Box<dyn Iterator<Item = T> + Send> + Send + Sync>,
}

struct IterableSubscription<T, S: CoreSubscriber<T>> {
    iter: fluxion_core::fluxion_mutex::Mutex<Box<dyn Iterator<Item = T> + Send>>,
    requested: AtomicU64,
    draining: AtomicBool,
    cancelled: AtomicBool,
    subscriber: Arc<S>,
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static> IterableSubscription<T, S> {
    fn drain(&self) {
        if self.draining.swap(true, Ordering::AcqRel) {
            return;
        }
        loop {
            let mut emitted = 0u64;
            loop {
                if self.cancelled.load(Ordering::Acquire) {
                    self.draining.store(false, Ordering::Release);
                    return;
                }
                if emitted >= self.requested.load(Ordering::Acquire) {
                    break;
                }
                let next = self.iter.lock().next();
                match next {
                    Some(v) => {
                        self.subscriber.on_next(v);
                        emitted += 1;
                    }
                    None => {
                        self.subscriber.on_complete();
                        self.draining.store(false, Ordering::Release);
                        return;
                    }
                }
            }
            self.requested.fetch_sub(emitted, Ordering::AcqRel);
            self.draining.store(false, Ordering::Release);
            if self.requested.load(Ordering::Acquire) == 0
                || self.cancelled.load(Ordering::Acquire)
                || self.draining.swap(true, Ordering::AcqRel)
            {
                return;
            }
        }
    }
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static> Subscription
    for IterableSubscription<T, S>
{
    fn request(&self, n: u64) {
        if n == 0 || self.cancelled.load(Ordering::Acquire) {
            return;
        }
        let mut current = self.requested.load(Ordering::Acquire);
        loop {
            let next = add_cap(current, n);
            match self.requested.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.drain();
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl<T: Send + Sync + 'static> Publisher<T> for FromIterablePublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let mut iter = (self.factory)();
        let Some(first) = iter.next() else {
            operators::complete(&*subscriber);
            return;
        };
        // Re-chain the already-taken first element back onto the iterator.
        let iter: Box<dyn Iterator<Item = T> + Send> =
            Box::new(core::iter::once(first).chain(iter));
        let sub = Arc::new(IterableSubscription {
            iter: fluxion_core::fluxion_mutex::Mutex::new(iter),
            requested: AtomicU64::new(0),
            draining: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            subscriber: subscriber.clone(),
        });
        subscriber.on_subscribe(sub);
    }
}

/// `fromIterable(factory)`: `factory` is called once per subscribe so the
/// same `Flux` can be re-subscribed.
pub fn from_iterable<T, I>(factory: impl Fn() -> I + Send + Sync + 'static) -> Flux<T>
where
    T: Send + Sync + 'static,
    I: IntoIterator<Item = T> + 'static,
    I::IntoIter: Send,
{
    Flux::from_publisher(FromIterablePublisher {
        factory: Box::new(move || Box::new(factory().into_iter())),
    })
}

/// `fromCallable`/`fromSupplier`: at most one value, `SYNC` fuseable
///. A panicking supplier is routed through `onOperatorError`.
pub struct FromCallablePublisher<T> {
    supplier: Box<dyn Fn() -> Result<Option<T>, FluxionError> + Send + Sync>,
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for FromCallablePublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        match guard_user_fn("fromCallable", AssertUnwindSafe(|| (self.supplier)())) {
            Ok(Ok(Some(value))) => {
                let sub = ScalarSubscription::new(value, subscriber.clone());
                subscriber.on_subscribe(sub);
            }
            Ok(Ok(None)) => operators::complete(&*subscriber),
            Ok(Err(e)) => operators::error(&*subscriber, e),
            Err(e) => operators::error(&*subscriber, e),
        }
    }
}

/// `fromCallable(supplier)`. `supplier` returning `Ok(None)` completes
/// empty, matching the Java source's "callable returned null" convention.
pub fn from_callable<T: Clone + Send + Sync + 'static>(
    supplier: impl Fn() -> Result<Option<T>, FluxionError> + Send + Sync + 'static,
) -> Flux<T> {
    Flux::from_publisher(FromCallablePublisher {
        supplier: Box::new(supplier),
    })
}

/// `range(start, count)`: sync-fusion; the same slow/fast-path pattern as
/// `fromArray`.
pub struct RangePublisher {
    start: i64,
    count: u64,
}

struct RangeSubscription<S: CoreSubscriber<i64>> {
    start: i64,
    count: u64,
    index: AtomicU64,
    requested: AtomicU64,
    draining: AtomicBool,
    cancelled: AtomicBool,
    subscriber: Arc<S>,
}

impl<S: CoreSubscriber<i64> + 'static> RangeSubscription<S> {
    fn drain(&self) {
        if self.draining.swap(true, Ordering::AcqRel) {
            return;
        }
        loop {
            let mut emitted = 0u64;
            loop {
                if self.cancelled.load(Ordering::Acquire) {
                    self.draining.store(false, Ordering::Release);
                    return;
                }
                if emitted >= self.requested.load(Ordering::Acquire) {
                    break;
                }
                let idx = self.index.load(Ordering::Acquire);
                if idx >= self.count {
                    self.subscriber.on_complete();
                    self.draining.store(false, Ordering::Release);
                    return;
                }
                self.subscriber.on_next(self.start + idx as i64);
                self.index.store(idx + 1, Ordering::Release);
                emitted += 1;
            }
            self.requested.fetch_sub(emitted, Ordering::AcqRel);
            self.draining.store(false, Ordering::Release);
            if self.requested.load(Ordering::Acquire) == 0
                || self.cancelled.load(Ordering::Acquire)
                || self.draining.swap(true, Ordering::AcqRel)
            {
                return;
            }
        }
    }
}

impl<S: CoreSubscriber<i64> + 'static> Subscription for RangeSubscription<S> {
    fn request(&self, n: u64) {
        if n == 0 || self.cancelled.load(Ordering::Acquire) {
            return;
        }
        let mut current = self.requested.load(Ordering::Acquire);
        loop {
            let next = add_cap(current, n);
            match self.requested.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.drain();
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl<S: CoreSubscriber<i64> + 'static> FuseableSubscription<i64> for RangeSubscription<S> {
    fn request_fusion(&self, requested_mode: u8) -> u8 {
        if requested_mode & mode::SYNC != 0 {
            mode::SYNC
        } else {
            mode::NONE
        }
    }

    fn poll(&self) -> Result<Option<i64>, FluxionError> {
        let idx = self.index.load(Ordering::Acquire);
        if idx >= self.count {
            return Ok(None);
        }
        self.index.store(idx + 1, Ordering::Release);
        Ok(Some(self.start + idx as i64))
    }

    fn is_empty(&self) -> bool {
        self.index.load(Ordering::Acquire) >= self.count
    }

    fn clear(&self) {
        self.index.store(self.count, Ordering::Release);
    }

    fn size(&self) -> usize {
        (self.count - self.index.load(Ordering::Acquire).min(self.count)) as usize
    }
}

impl Publisher<i64> for RangePublisher {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<i64>>) {
        if self.count == 0 {
            operators::complete(&*subscriber);
            return;
        }
        let sub = Arc::new(RangeSubscription {
            start: self.start,
            count: self.count,
            index: AtomicU64::new(0),
            requested: AtomicU64::new(0),
            draining: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            subscriber: subscriber.clone(),
        });
        subscriber.on_subscribe(sub);
    }
}

/// `range(start, count)`.
#[must_use]
pub fn range(start: i64, count: u64) -> Flux<i64> {
    Flux::from_publisher(RangePublisher { start, count })
}

/// `interval(delay, period, scheduler)`: emits sequential `0, 1, 2, ...` on
/// `scheduler`'s periodic task, first after `delay` then every `period`.
/// Cancellation cancels the underlying scheduled task; a tick that arrives
/// with no outstanding demand delivers an overflow error rather than
/// dropping the tick silently.
struct IntervalSubscription<T: Send + Sync + 'static> {
    requested: AtomicU64,
    cancelled: AtomicBool,
    terminated: AtomicBool,
    task: fluxion_core::fluxion_mutex::Mutex<Option<Arc<dyn fluxion_runtime::scheduler::CancelHandle>>>,
    subscriber: Arc<dyn CoreSubscriber<T>>,
}

impl<T: Send + Sync + 'static> IntervalSubscription<T> {
    fn tick(self: &Arc<Self>, value: T) {
        if self.cancelled.load(Ordering::Acquire) || self.terminated.load(Ordering::Acquire) {
            return;
        }
        let mut current = self.requested.load(Ordering::Acquire);
        loop {
            if current == 0 {
                if self.terminated.swap(true, Ordering::AcqRel) {
                    return;
                }
                if let Some(task) = self.task.lock().take() {
                    task.cancel();
                }
                self.subscriber
                    .on_error(FluxionError::overflow("interval", "tick arrived with no outstanding demand"));
                return;
            }
            let next = if current == fluxion_core::subscription::UNBOUNDED {
                current
            } else {
                current - 1
            };
            match self.requested.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.subscriber.on_next(value);
    }
}

impl<T: Send + Sync + 'static> Subscription for IntervalSubscription<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        let mut current = self.requested.load(Ordering::Acquire);
        loop {
            let next = add_cap(current, n);
            match self.requested.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(task) = self.task.lock().take() {
            task.cancel();
        }
    }
}

struct IntervalPublisher {
    delay: core::time::Duration,
    period: core::time::Duration,
    scheduler: Arc<dyn fluxion_runtime::scheduler::Scheduler>,
}

impl Publisher<u64> for IntervalPublisher {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<u64>>) {
        let sub = Arc::new(IntervalSubscription {
            requested: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            task: fluxion_core::fluxion_mutex::Mutex::new(None),
            subscriber: subscriber.clone(),
        });
        subscriber.on_subscribe(sub.clone() as Arc<dyn Subscription>);
        let counter = Arc::new(AtomicU64::new(0));
        let ticking = Arc::clone(&sub);
        let task = self.scheduler.schedule_periodically(
            self.delay,
            self.period,
            Arc::new(move || {
                let tick = counter.fetch_add(1, Ordering::SeqCst);
                ticking.tick(tick);
            }),
        );
        match task {
            Ok(handle) => {
                if sub.cancelled.load(Ordering::Acquire) {
                    handle.cancel();
                } else {
                    *sub.task.lock() = Some(handle);
                }
            }
            Err(err) => {
                if !sub.terminated.swap(true, Ordering::AcqRel) {
                    subscriber.on_error(err);
                }
            }
        }
    }
}

/// `interval(delay, period, scheduler)`: emits `0, 1, 2, ...` every
/// `period`, starting after `delay`.
#[must_use]
pub fn interval(
    delay: core::time::Duration,
    period: core::time::Duration,
    scheduler: Arc<dyn fluxion_runtime::scheduler::Scheduler>,
) -> Flux<u64> {
    Flux::from_publisher(IntervalPublisher {
        delay,
        period,
        scheduler,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc as StdArc;
    use alloc::vec;
    use alloc::vec::Vec as StdVec;
    use fluxion_core::context::Context;
    use fluxion_core::subscriber::{ContextualSubscriber, Subscriber};
    use fluxion_core::subscription::UNBOUNDED;
    use fluxion_stream_core::Flux as CoreFlux;

    struct Recorder {
        values: fluxion_core::fluxion_mutex::Mutex<StdVec<i32>>,
        error: fluxion_core::fluxion_mutex::Mutex<Option<FluxionError>>,
        completed: AtomicBool,
    }

    impl Subscriber<i32> for Recorder {
        fn on_subscribe(&self, subscription: StdArc<dyn Subscription>) {
            subscription.request(UNBOUNDED);
        }
        fn on_next(&self, value: i32) {
            self.values.lock().push(value);
        }
        fn on_error(&self, error: FluxionError) {
            *self.error.lock() = Some(error);
        }
        fn on_complete(&self) {
            self.completed.store(true, Ordering::SeqCst);
        }
    }

    fn subscribe(flux: &Flux<i32>) -> StdArc<Recorder> {
        let recorder = StdArc::new(Recorder {
            values: fluxion_core::fluxion_mutex::Mutex::new(StdVec::new()),
            error: fluxion_core::fluxion_mutex::Mutex::new(None),
            completed: AtomicBool::new(false),
        });
        let wrapped = ContextualSubscriber::new(RecorderRef(StdArc::clone(&recorder)), Context::empty());
        flux.subscribe_arc(StdArc::new(wrapped));
        recorder
    }

    struct RecorderRef(StdArc<Recorder>);
    impl Subscriber<i32> for RecorderRef {
        fn on_subscribe(&self, subscription: StdArc<dyn Subscription>) {
            self.0.on_subscribe(subscription);
        }
        fn on_next(&self, value: i32) {
            self.0.on_next(value);
        }
        fn on_error(&self, error: FluxionError) {
            self.0.on_error(error);
        }
        fn on_complete(&self) {
            self.0.on_complete();
        }
    }

    #[test]
    fn just_emits_one_value_then_completes() {
        let recorder = subscribe(&just(7));
        assert_eq!(*recorder.values.lock(), vec![7]);
        assert!(recorder.completed.load(Ordering::SeqCst));
    }

    #[test]
    fn empty_completes_with_no_values() {
        let recorder = subscribe(&(empty() as CoreFlux<i32>));
        assert!(recorder.values.lock().is_empty());
        assert!(recorder.completed.load(Ordering::SeqCst));
    }

    #[test]
    fn error_delivers_the_supplied_error() {
        let recorder = subscribe(&error_with(|| FluxionError::invalid_state("boom")));
        assert!(recorder.error.lock().is_some());
        assert!(!recorder.completed.load(Ordering::SeqCst));
    }

    #[test]
    fn from_array_emits_values_in_order() {
        let recorder = subscribe(&from_array(vec![1, 2, 3]));
        assert_eq!(*recorder.values.lock(), vec![1, 2, 3]);
        assert!(recorder.completed.load(Ordering::SeqCst));
    }

    #[test]
    fn from_array_empty_completes_synchronously() {
        let recorder = subscribe(&from_array(Vec::new()));
        assert!(recorder.values.lock().is_empty());
        assert!(recorder.completed.load(Ordering::SeqCst));
    }

    #[test]
    fn from_iterable_emits_values_in_order() {
        let recorder = subscribe(&from_iterable(|| vec![4, 5, 6]));
        assert_eq!(*recorder.values.lock(), vec![4, 5, 6]);
        assert!(recorder.completed.load(Ordering::SeqCst));
    }

    #[test]
    fn range_emits_the_requested_count() {
        let recorder_values: StdArc<fluxion_core::fluxion_mutex::Mutex<StdVec<i64>>> =
            StdArc::new(fluxion_core::fluxion_mutex::Mutex::new(StdVec::new()));
        struct R(StdArc<fluxion_core::fluxion_mutex::Mutex<StdVec<i64>>>);
        impl Subscriber<i64> for R {
            fn on_subscribe(&self, s: StdArc<dyn Subscription>) {
                s.request(UNBOUNDED);
            }
            fn on_next(&self, v: i64) {
                self.0.lock().push(v);
            }
            fn on_error(&self, _e: FluxionError) {}
            fn on_complete(&self) {}
        }
        let flux = range(10, 3);
        let wrapped = ContextualSubscriber::new(R(StdArc::clone(&recorder_values)), Context::empty());
        flux.subscribe_arc(StdArc::new(wrapped));
        assert_eq!(*recorder_values.lock(), vec![10, 11, 12]);
    }

    #[test]
    fn from_callable_none_completes_empty() {
        let recorder = subscribe(&from_callable(|| Ok(None)));
        assert!(recorder.values.lock().is_empty());
        assert!(recorder.completed.load(Ordering::SeqCst));
    }

    #[test]
    fn defer_invokes_supplier_once_per_subscribe() {
        let calls = StdArc::new(core::sync::atomic::AtomicUsize::new(0));
        let calls2 = StdArc::clone(&calls);
        let flux = defer(move || {
            calls2.fetch_add(1, Ordering::SeqCst);
            just(1)
        });
        let _ = subscribe(&flux);
        let _ = subscribe(&flux);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn interval_emits_sequential_ticks_on_the_scheduler() {
        use fluxion_core::fluxion_mutex::Mutex;
        use fluxion_runtime::impls::tokio::TokioScheduler;

        let values: StdArc<Mutex<StdVec<u64>>> = StdArc::new(Mutex::new(StdVec::new()));
        let completed = StdArc::new(AtomicBool::new(false));

        struct Recorder64 {
            values: StdArc<Mutex<StdVec<u64>>>,
            completed: StdArc<AtomicBool>,
            subscription: Mutex<Option<StdArc<dyn Subscription>>>,
        }
        impl Subscriber<u64> for Recorder64 {
            fn on_subscribe(&self, subscription: StdArc<dyn Subscription>) {
                subscription.request(UNBOUNDED);
                *self.subscription.lock() = Some(subscription);
            }
            fn on_next(&self, value: u64) {
                self.values.lock().push(value);
            }
            fn on_error(&self, _error: FluxionError) {}
            fn on_complete(&self) {
                self.completed.store(true, Ordering::SeqCst);
            }
        }

        let scheduler: StdArc<dyn fluxion_runtime::scheduler::Scheduler> =
            StdArc::new(TokioScheduler::new());
        let flux = interval(
            core::time::Duration::from_millis(5),
            core::time::Duration::from_millis(10),
            scheduler,
        );
        let recorder = StdArc::new(Recorder64 {
            values: StdArc::clone(&values),
            completed: StdArc::clone(&completed),
            subscription: Mutex::new(None),
        });
        struct RecorderRef64(StdArc<Recorder64>);
        impl Subscriber<u64> for RecorderRef64 {
            fn on_subscribe(&self, subscription: StdArc<dyn Subscription>) {
                self.0.on_subscribe(subscription);
            }
            fn on_next(&self, value: u64) {
                self.0.on_next(value);
            }
            fn on_error(&self, error: FluxionError) {
                self.0.on_error(error);
            }
            fn on_complete(&self) {
                self.0.on_complete();
            }
        }
        let wrapped =
            ContextualSubscriber::new(RecorderRef64(StdArc::clone(&recorder)), Context::empty());
        flux.subscribe_arc(StdArc::new(wrapped));

        tokio::time::sleep(core::time::Duration::from_millis(55)).await;
        if let Some(sub) = recorder.subscription.lock().clone() {
            sub.cancel();
        }
        tokio::time::sleep(core::time::Duration::from_millis(20)).await;

        let ticks = values.lock().clone();
        assert!(ticks.len() >= 3, "expected several ticks, got {ticks:?}");
        assert_eq!(ticks, (0..ticks.len() as u64).collect::<StdVec<_>>());
        assert!(!completed.load(Ordering::SeqCst));
    }
}
