// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Component F: stateless per-element transforms over `Flux<T>`. Each
//! operator here holds no state beyond its construction-time parameters and
//!, where it needs one, a per-subscription counter — nothing is shared
//! across independently-subscribed chains.

use alloc::sync::Arc;

use fluxion_core::context::Context;
use fluxion_core::fluxion_mutex::Mutex;
use core::panic::AssertUnwindSafe;
use fluxion_core::operators::{guard_user_fn, on_discard, on_operator_error};
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::CoreSubscriber;
use fluxion_core::subscription::Subscription;
use fluxion_error::FluxionError;
use fluxion_stream_core::Flux;

/// `map(mapper)`. A panicking mapper is routed through
/// `onOperatorError`: the upstream subscription is cancelled and the
/// downstream receives `onError` instead of the value.
pub struct MapPublisher<T, R> {
    upstream: Flux<T>,
    mapper: Arc<dyn Fn(T) -> R + Send + Sync>,
}

struct MapSubscriber<T, R, S: CoreSubscriber<R>> {
    downstream: Arc<S>,
    mapper: Arc<dyn Fn(T) -> R + Send + Sync>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
}

impl<T: Send + Sync + 'static, R: Send + Sync + 'static, S: CoreSubscriber<R> + 'static>
    fluxion_core::subscriber::Subscriber<T> for MapSubscriber<T, R, S>
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.subscription.lock() = Some(Arc::clone(&subscription));
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&self, value: T) {
        let mapper = Arc::clone(&self.mapper);
        match guard_user_fn("map", AssertUnwindSafe(move || mapper(value))) {
            Ok(mapped) => self.downstream.on_next(mapped),
            Err(e) => {
                let sub = self.subscription.lock().clone();
                let err = on_operator_error::<()>(
                    sub.as_deref(),
                    e,
                    None,
                    self.downstream.current_context(),
                );
                self.downstream.on_error(err);
            }
        }
    }

    fn on_error(&self, error: FluxionError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static, R: Send + Sync + 'static, S: CoreSubscriber<R> + 'static>
    CoreSubscriber<T> for MapSubscriber<T, R, S>
{
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

impl<T: Send + Sync + 'static, R: Send + Sync + 'static> Publisher<R> for MapPublisher<T, R> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
        let mapped = Arc::new(MapSubscriber {
            downstream: subscriber,
            mapper: Arc::clone(&self.mapper),
            subscription: Mutex::new(None),
        });
        self.upstream.subscribe_arc(mapped);
    }
}

/// `map(mapper)`.
pub fn map<T, R>(
    upstream: Flux<T>,
    mapper: impl Fn(T) -> R + Send + Sync + 'static,
) -> Flux<R>
where
    T: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    Flux::from_publisher(MapPublisher {
        upstream,
        mapper: Arc::new(mapper),
    })
}

/// `filter(predicate)`. A value the predicate rejects is routed to
/// `onDiscard`; the one unit of demand it consumed is replayed upstream so
/// a filtered-heavy source doesn't stall a bounded downstream request.
pub struct FilterPublisher<T> {
    upstream: Flux<T>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

struct FilterSubscriber<T, S: CoreSubscriber<T>> {
    downstream: Arc<S>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static>
    fluxion_core::subscriber::Subscriber<T> for FilterSubscriber<T, S>
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.subscription.lock() = Some(Arc::clone(&subscription));
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&self, value: T) {
        let predicate = Arc::clone(&self.predicate);
        match guard_user_fn("filter", AssertUnwindSafe(|| predicate(&value))) {
            Ok(true) => self.downstream.on_next(value),
            Ok(false) => {
                on_discard(self.downstream.current_context(), value);
                if let Some(sub) = self.subscription.lock().clone() {
                    sub.request(1);
                }
            }
            Err(e) => {
                let sub = self.subscription.lock().clone();
                let err = on_operator_error(
                    sub.as_deref(),
                    e,
                    Some(value),
                    self.downstream.current_context(),
                );
                self.downstream.on_error(err);
            }
        }
    }

    fn on_error(&self, error: FluxionError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static> CoreSubscriber<T>
    for FilterSubscriber<T, S>
{
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

impl<T: Send + Sync + 'static> Publisher<T> for FilterPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let filtered = Arc::new(FilterSubscriber {
            downstream: subscriber,
            predicate: Arc::clone(&self.predicate),
            subscription: Mutex::new(None),
        });
        self.upstream.subscribe_arc(filtered);
    }
}

/// `filter(predicate)`.
pub fn filter<T: Send + Sync + 'static>(
    upstream: Flux<T>,
    predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
) -> Flux<T> {
    Flux::from_publisher(FilterPublisher {
        upstream,
        predicate: Arc::new(predicate),
    })
}

/// `skip(n)`: discards the first `n` elements, re-requesting
/// upstream for each one skipped exactly like [`filter`].
pub struct SkipPublisher<T> {
    upstream: Flux<T>,
    count: u64,
}

struct SkipSubscriber<T, S: CoreSubscriber<T>> {
    downstream: Arc<S>,
    remaining: core::sync::atomic::AtomicU64,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    _marker: core::marker::PhantomData<T>,
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static>
    fluxion_core::subscriber::Subscriber<T> for SkipSubscriber<T, S>
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.subscription.lock() = Some(Arc::clone(&subscription));
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&self, value: T) {
        use core::sync::atomic::Ordering;
        let mut current = self.remaining.load(Ordering::Acquire);
        loop {
            if current == 0 {
                self.downstream.on_next(value);
                return;
            }
            match self.remaining.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        on_discard(self.downstream.current_context(), value);
        if let Some(sub) = self.subscription.lock().clone() {
            sub.request(1);
        }
    }

    fn on_error(&self, error: FluxionError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static> CoreSubscriber<T>
    for SkipSubscriber<T, S>
{
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

impl<T: Send + Sync + 'static> Publisher<T> for SkipPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let skip = Arc::new(SkipSubscriber {
            downstream: subscriber,
            remaining: core::sync::atomic::AtomicU64::new(self.count),
            subscription: Mutex::new(None),
            _marker: core::marker::PhantomData,
        });
        self.upstream.subscribe_arc(skip);
    }
}

/// `skip(n)`.
pub fn skip<T: Send + Sync + 'static>(upstream: Flux<T>, count: u64) -> Flux<T> {
    Flux::from_publisher(SkipPublisher { upstream, count })
}

/// `take(n)`: cancels upstream and completes downstream once `n`
/// elements have been delivered. `n == 0` completes without subscribing
/// further upstream demand.
pub struct TakePublisher<T> {
    upstream: Flux<T>,
    count: u64,
}

struct TakeSubscriber<T, S: CoreSubscriber<T>> {
    downstream: Arc<S>,
    remaining: core::sync::atomic::AtomicU64,
    done: core::sync::atomic::AtomicBool,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    _marker: core::marker::PhantomData<T>,
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static>
    fluxion_core::subscriber::Subscriber<T> for TakeSubscriber<T, S>
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if self.remaining.load(core::sync::atomic::Ordering::Acquire) == 0 {
            subscription.cancel();
            fluxion_core::operators::complete(&*self.downstream);
            return;
        }
        *self.subscription.lock() = Some(Arc::clone(&subscription));
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&self, value: T) {
        use core::sync::atomic::Ordering;
        if self.done.load(Ordering::Acquire) {
            on_discard(self.downstream.current_context(), value);
            return;
        }
        let current = self.remaining.load(Ordering::Acquire);
        if current == 0 {
            on_discard(self.downstream.current_context(), value);
            return;
        }
        self.downstream.on_next(value);
        let left = current - 1;
        self.remaining.store(left, Ordering::Release);
        if left == 0 && !self.done.swap(true, Ordering::AcqRel) {
            if let Some(sub) = self.subscription.lock().clone() {
                sub.cancel();
            }
            self.downstream.on_complete();
        }
    }

    fn on_error(&self, error: FluxionError) {
        if !self.done.swap(true, core::sync::atomic::Ordering::AcqRel) {
            self.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, core::sync::atomic::Ordering::AcqRel) {
            self.downstream.on_complete();
        }
    }
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static> CoreSubscriber<T>
    for TakeSubscriber<T, S>
{
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

impl<T: Send + Sync + 'static> Publisher<T> for TakePublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let take = Arc::new(TakeSubscriber {
            downstream: subscriber,
            remaining: core::sync::atomic::AtomicU64::new(self.count),
            done: core::sync::atomic::AtomicBool::new(false),
            subscription: Mutex::new(None),
            _marker: core::marker::PhantomData,
        });
        self.upstream.subscribe_arc(take);
    }
}

/// `take(n)`.
pub fn take<T: Send + Sync + 'static>(upstream: Flux<T>, count: u64) -> Flux<T> {
    Flux::from_publisher(TakePublisher { upstream, count })
}

/// `hide()`: forwards every signal unchanged but wraps the upstream
/// `Subscription` so a downstream cannot discover or depend on the concrete
/// identity or fusion capability of whatever produced the values — the
/// same "erase assembly-time optimizations" role `hide` plays upstream.
pub struct HidePublisher<T> {
    upstream: Flux<T>,
}

struct HideSubscription {
    inner: Arc<dyn Subscription>,
}

impl Subscription for HideSubscription {
    fn request(&self, n: u64) {
        self.inner.request(n);
    }

    fn cancel(&self) {
        self.inner.cancel();
    }
}

struct HideSubscriber<T, S: CoreSubscriber<T>> {
    downstream: Arc<S>,
    _marker: core::marker::PhantomData<T>,
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static>
    fluxion_core::subscriber::Subscriber<T> for HideSubscriber<T, S>
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.downstream
            .on_subscribe(Arc::new(HideSubscription { inner: subscription }));
    }

    fn on_next(&self, value: T) {
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: FluxionError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static> CoreSubscriber<T>
    for HideSubscriber<T, S>
{
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

impl<T: Send + Sync + 'static> Publisher<T> for HidePublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let hidden = Arc::new(HideSubscriber {
            downstream: subscriber,
            _marker: core::marker::PhantomData,
        });
        self.upstream.subscribe_arc(hidden);
    }
}

/// `hide()`.
pub fn hide<T: Send + Sync + 'static>(upstream: Flux<T>) -> Flux<T> {
    Flux::from_publisher(HidePublisher { upstream })
}

/// `ignore()`: discards every element through the discard hook and
/// forwards only the terminal signal, requesting `UNBOUNDED` from upstream
/// unconditionally on subscribe — downstream demand is meaningless here
/// since no value is ever delivered. Downstream still gets a real
/// `Subscription` so `cancel()` reaches upstream.
pub struct IgnorePublisher<T> {
    upstream: Flux<T>,
}

struct IgnoreSubscription {
    inner: Arc<dyn Subscription>,
}

impl Subscription for IgnoreSubscription {
    fn request(&self, _n: u64) {}

    fn cancel(&self) {
        self.inner.cancel();
    }
}

struct IgnoreSubscriber<T, S: CoreSubscriber<T>> {
    downstream: Arc<S>,
    _marker: core::marker::PhantomData<T>,
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static>
    fluxion_core::subscriber::Subscriber<T> for IgnoreSubscriber<T, S>
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.downstream
            .on_subscribe(Arc::new(IgnoreSubscription { inner: Arc::clone(&subscription) }));
        subscription.request(fluxion_core::subscription::UNBOUNDED);
    }

    fn on_next(&self, value: T) {
        on_discard(self.downstream.current_context(), value);
    }

    fn on_error(&self, error: FluxionError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static> CoreSubscriber<T>
    for IgnoreSubscriber<T, S>
{
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

impl<T: Send + Sync + 'static> Publisher<T> for IgnorePublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let ignoring = Arc::new(IgnoreSubscriber {
            downstream: subscriber,
            _marker: core::marker::PhantomData,
        });
        self.upstream.subscribe_arc(ignoring);
    }
}

/// `ignore()`.
pub fn ignore<T: Send + Sync + 'static>(upstream: Flux<T>) -> Flux<T> {
    Flux::from_publisher(IgnorePublisher { upstream })
}

/// Side-effect hooks installed by the `doOnX` family. Exactly
/// one field is set per public constructor below; a single internal
/// `PeekSubscriber` executes whichever is present so `doOnNext().doOnError()`
/// chains are just nested `Flux`es, the same as every other operator here.
#[derive(Clone, Default)]
struct PeekHooks<T> {
    on_next: Option<Arc<dyn Fn(&T) + Send + Sync>>,
    on_error: Option<Arc<dyn Fn(&FluxionError) + Send + Sync>>,
    on_complete: Option<Arc<dyn Fn() + Send + Sync>>,
    on_subscribe: Option<Arc<dyn Fn() + Send + Sync>>,
    on_cancel: Option<Arc<dyn Fn() + Send + Sync>>,
    on_request: Option<Arc<dyn Fn(u64) + Send + Sync>>,
}

pub struct PeekPublisher<T> {
    upstream: Flux<T>,
    hooks: PeekHooks<T>,
}

struct PeekSubscription {
    inner: Arc<dyn Subscription>,
    hooks: PeekHooks<()>,
}

impl Subscription for PeekSubscription {
    fn request(&self, n: u64) {
        if let Some(hook) = &self.hooks.on_request {
            let _ = guard_user_fn("doOnRequest", AssertUnwindSafe(|| hook(n)));
        }
        self.inner.request(n);
    }

    fn cancel(&self) {
        if let Some(hook) = &self.hooks.on_cancel {
            let _ = guard_user_fn("doOnCancel", AssertUnwindSafe(|| hook()));
        }
        self.inner.cancel();
    }
}

struct PeekSubscriber<T, S: CoreSubscriber<T>> {
    downstream: Arc<S>,
    hooks: PeekHooks<T>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static>
    fluxion_core::subscriber::Subscriber<T> for PeekSubscriber<T, S>
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if let Some(hook) = &self.hooks.on_subscribe {
            let _ = guard_user_fn("doOnSubscribe", AssertUnwindSafe(|| hook()));
        }
        *self.subscription.lock() = Some(Arc::clone(&subscription));
        let wrapped = Arc::new(PeekSubscription {
            inner: subscription,
            hooks: PeekHooks {
                on_next: None,
                on_error: None,
                on_complete: None,
                on_subscribe: None,
                on_cancel: self.hooks.on_cancel.clone(),
                on_request: self.hooks.on_request.clone(),
            },
        });
        self.downstream.on_subscribe(wrapped);
    }

    fn on_next(&self, value: T) {
        if let Some(hook) = &self.hooks.on_next {
            let hook = Arc::clone(hook);
            let value_ref = &value;
            if let Err(e) = guard_user_fn("doOnNext", AssertUnwindSafe(move || hook(value_ref))) {
                let sub = self.subscription.lock().clone();
                let err = on_operator_error(
                    sub.as_deref(),
                    e,
                    Some(value),
                    self.downstream.current_context(),
                );
                self.downstream.on_error(err);
                return;
            }
        }
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: FluxionError) {
        if let Some(hook) = &self.hooks.on_error {
            let _ = guard_user_fn("doOnError", AssertUnwindSafe(|| hook(&error)));
        }
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        if let Some(hook) = &self.hooks.on_complete {
            let _ = guard_user_fn("doOnComplete", AssertUnwindSafe(|| hook()));
        }
        self.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static> CoreSubscriber<T>
    for PeekSubscriber<T, S>
{
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

impl<T: Send + Sync + 'static> Publisher<T> for PeekPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let peek = Arc::new(PeekSubscriber {
            downstream: subscriber,
            hooks: self.hooks.clone(),
            subscription: Mutex::new(None),
        });
        self.upstream.subscribe_arc(peek);
    }
}

/// `doOnNext(consumer)`.
pub fn do_on_next<T: Send + Sync + 'static>(
    upstream: Flux<T>,
    consumer: impl Fn(&T) + Send + Sync + 'static,
) -> Flux<T> {
    Flux::from_publisher(PeekPublisher {
        upstream,
        hooks: PeekHooks {
            on_next: Some(Arc::new(consumer)),
            ..Default::default()
        },
    })
}

/// `doOnError(consumer)`.
pub fn do_on_error<T: Send + Sync + 'static>(
    upstream: Flux<T>,
    consumer: impl Fn(&FluxionError) + Send + Sync + 'static,
) -> Flux<T> {
    Flux::from_publisher(PeekPublisher {
        upstream,
        hooks: PeekHooks {
            on_error: Some(Arc::new(consumer)),
            ..Default::default()
        },
    })
}

/// `doOnComplete(action)`.
pub fn do_on_complete<T: Send + Sync + 'static>(
    upstream: Flux<T>,
    action: impl Fn() + Send + Sync + 'static,
) -> Flux<T> {
    Flux::from_publisher(PeekPublisher {
        upstream,
        hooks: PeekHooks {
            on_complete: Some(Arc::new(action)),
            ..Default::default()
        },
    })
}

/// `doOnSubscribe(consumer)`.
pub fn do_on_subscribe<T: Send + Sync + 'static>(
    upstream: Flux<T>,
    action: impl Fn() + Send + Sync + 'static,
) -> Flux<T> {
    Flux::from_publisher(PeekPublisher {
        upstream,
        hooks: PeekHooks {
            on_subscribe: Some(Arc::new(action)),
            ..Default::default()
        },
    })
}

/// `doOnCancel(action)`.
pub fn do_on_cancel<T: Send + Sync + 'static>(
    upstream: Flux<T>,
    action: impl Fn() + Send + Sync + 'static,
) -> Flux<T> {
    Flux::from_publisher(PeekPublisher {
        upstream,
        hooks: PeekHooks {
            on_cancel: Some(Arc::new(action)),
            ..Default::default()
        },
    })
}

/// `doOnRequest(consumer)`.
pub fn do_on_request<T: Send + Sync + 'static>(
    upstream: Flux<T>,
    consumer: impl Fn(u64) + Send + Sync + 'static,
) -> Flux<T> {
    Flux::from_publisher(PeekPublisher {
        upstream,
        hooks: PeekHooks {
            on_request: Some(Arc::new(consumer)),
            ..Default::default()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::from_array;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use fluxion_core::subscriber::{ContextualSubscriber, Subscriber};
    use fluxion_core::subscription::UNBOUNDED;

    struct Recorder {
        values: Mutex<Vec<i32>>,
        completed: AtomicBool,
    }

    impl Subscriber<i32> for Recorder {
        fn on_subscribe(&self, s: Arc<dyn Subscription>) {
            s.request(UNBOUNDED);
        }
        fn on_next(&self, v: i32) {
            self.values.lock().push(v);
        }
        fn on_error(&self, _e: FluxionError) {}
        fn on_complete(&self) {
            self.completed.store(true, Ordering::SeqCst);
        }
    }

    struct RecorderRef(Arc<Recorder>);
    impl Subscriber<i32> for RecorderRef {
        fn on_subscribe(&self, s: Arc<dyn Subscription>) {
            self.0.on_subscribe(s);
        }
        fn on_next(&self, v: i32) {
            self.0.on_next(v);
        }
        fn on_error(&self, e: FluxionError) {
            self.0.on_error(e);
        }
        fn on_complete(&self) {
            self.0.on_complete();
        }
    }

    fn collect(flux: &Flux<i32>) -> (Vec<i32>, bool) {
        let recorder = Arc::new(Recorder {
            values: Mutex::new(Vec::new()),
            completed: AtomicBool::new(false),
        });
        let wrapped =
            ContextualSubscriber::new(RecorderRef(Arc::clone(&recorder)), Context::empty());
        flux.subscribe_arc(Arc::new(wrapped));
        (
            recorder.values.lock().clone(),
            recorder.completed.load(Ordering::SeqCst),
        )
    }

    #[test]
    fn map_transforms_each_value() {
        let flux = map(from_array(vec![1, 2, 3]), |v| v * 10);
        let (values, completed) = collect(&flux);
        assert_eq!(values, vec![10, 20, 30]);
        assert!(completed);
    }

    #[test]
    fn filter_keeps_only_matching_values() {
        let flux = filter(from_array(vec![1, 2, 3, 4, 5]), |v| v % 2 == 0);
        let (values, completed) = collect(&flux);
        assert_eq!(values, vec![2, 4]);
        assert!(completed);
    }

    #[test]
    fn skip_drops_the_first_n() {
        let flux = skip(from_array(vec![1, 2, 3, 4]), 2);
        let (values, _) = collect(&flux);
        assert_eq!(values, vec![3, 4]);
    }

    #[test]
    fn take_completes_after_n_elements() {
        let flux = take(from_array(vec![1, 2, 3, 4, 5]), 2);
        let (values, completed) = collect(&flux);
        assert_eq!(values, vec![1, 2]);
        assert!(completed);
    }

    #[test]
    fn take_zero_completes_without_upstream_demand() {
        let flux = take(from_array(vec![1, 2, 3]), 0);
        let (values, completed) = collect(&flux);
        assert!(values.is_empty());
        assert!(completed);
    }

    #[test]
    fn do_on_next_observes_every_value_without_altering_it() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);
        let flux = do_on_next(from_array(vec![1, 2, 3]), move |_| {
            seen2.fetch_add(1, Ordering::SeqCst);
        });
        let (values, _) = collect(&flux);
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn hide_forwards_signals_unchanged() {
        let flux = hide(from_array(vec![1, 2, 3]));
        let (values, completed) = collect(&flux);
        assert_eq!(values, vec![1, 2, 3]);
        assert!(completed);
    }

    #[test]
    fn ignore_discards_every_value_but_still_completes() {
        let flux = ignore(from_array(vec![1, 2, 3]));
        let (values, completed) = collect(&flux);
        assert!(values.is_empty());
        assert!(completed);
    }
}
