// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Stateless transforms over `Mono<T>` (component F, specialized to
//! at-most-one cardinality). `filter` differs from its `Flux` counterpart
//! in one respect: there is no "next element" to fall back to, so a
//! rejected value completes the `Mono` empty instead of re-requesting.

use alloc::sync::Arc;
use core::panic::AssertUnwindSafe;

use fluxion_core::context::Context;
use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::operators::{guard_user_fn, on_discard, on_operator_error};
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_core::subscription::Subscription;
use fluxion_error::FluxionError;
use fluxion_stream_core::Mono;

struct MapSubscriber<T, R, S: CoreSubscriber<R>> {
    downstream: Arc<S>,
    mapper: Arc<dyn Fn(T) -> R + Send + Sync>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
}

impl<T: Send + Sync + 'static, R: Send + Sync + 'static, S: CoreSubscriber<R> + 'static>
    Subscriber<T> for MapSubscriber<T, R, S>
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
                let err =
                    on_operator_error::<()>(sub.as_deref(), e, None, self.downstream.current_context());
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

struct MapPublisher<T, R> {
    upstream: Mono<T>,
    mapper: Arc<dyn Fn(T) -> R + Send + Sync>,
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

/// `map(mapper)`. A panicking mapper routes through
/// `onOperatorError`, exactly as the `Flux` transform does.
pub fn map<T, R>(upstream: Mono<T>, mapper: impl Fn(T) -> R + Send + Sync + 'static) -> Mono<R>
where
    T: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    Mono::from_publisher(MapPublisher {
        upstream,
        mapper: Arc::new(mapper),
    })
}

struct FilterSubscriber<T, S: CoreSubscriber<T>> {
    downstream: Arc<S>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static> Subscriber<T>
    for FilterSubscriber<T, S>
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
                // No further value can ever arrive on a Mono: a rejected
                // value terminates the sequence empty rather than
                // re-requesting, unlike `Flux`'s `filter`.
                on_discard(self.downstream.current_context(), value);
                self.downstream.on_complete();
            }
            Err(e) => {
                let sub = self.subscription.lock().clone();
                let err = on_operator_error(sub.as_deref(), e, Some(value), self.downstream.current_context());
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

struct FilterPublisher<T> {
    upstream: Mono<T>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
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

/// `filter(predicate)`, Mono-specialized: a rejected value completes
/// the sequence empty.
pub fn filter<T: Send + Sync + 'static>(
    upstream: Mono<T>,
    predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
) -> Mono<T> {
    Mono::from_publisher(FilterPublisher {
        upstream,
        predicate: Arc::new(predicate),
    })
}

struct DoOnNextSubscriber<T, S: CoreSubscriber<T>> {
    downstream: Arc<S>,
    action: Arc<dyn Fn(&T) + Send + Sync>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
}

impl<T: Send + Sync + 'static, S: CoreSubscriber<T> + 'static> Subscriber<T>
    for DoOnNextSubscriber<T, S>
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.subscription.lock() = Some(Arc::clone(&subscription));
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&self, value: T) {
        let action = Arc::clone(&self.action);
        match guard_user_fn("do_on_next", AssertUnwindSafe(|| action(&value))) {
            Ok(()) => self.downstream.on_next(value),
            Err(e) => {
                let sub = self.subscription.lock().clone();
                let err = on_operator_error(sub.as_deref(), e, Some(value), self.downstream.current_context());
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
    for DoOnNextSubscriber<T, S>
{
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

struct DoOnNextPublisher<T> {
    upstream: Mono<T>,
    action: Arc<dyn Fn(&T) + Send + Sync>,
}

impl<T: Send + Sync + 'static> Publisher<T> for DoOnNextPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let wrapped = Arc::new(DoOnNextSubscriber {
            downstream: subscriber,
            action: Arc::clone(&self.action),
            subscription: Mutex::new(None),
        });
        self.upstream.subscribe_arc(wrapped);
    }
}

/// `doOnNext(action)`. A panicking callback is
/// fatal-classified the same way `onOperatorError` treats any user
/// function: it cancels upstream and surfaces through `onError`.
pub fn do_on_next<T: Send + Sync + 'static>(
    upstream: Mono<T>,
    action: impl Fn(&T) + Send + Sync + 'static,
) -> Mono<T> {
    Mono::from_publisher(DoOnNextPublisher {
        upstream,
        action: Arc::new(action),
    })
}
