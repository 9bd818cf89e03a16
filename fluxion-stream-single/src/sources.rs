// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `Mono<T>` sources: at-most-one-value producers, specialized to the
//! single-value cardinality bound `Mono` carries.
//!
//! Each constructor mirrors its `Flux` counterpart in
//! `fluxion-stream-multi`, built on the same [`ScalarSubscription`] fuseable
//! fast path — a `Mono` is, structurally, a `Flux` that a caller has
//! promised will never emit more than one value, so the scalar case is
//! exactly the shape every `Mono` source reduces to once it has a value in
//! hand.

use alloc::sync::Arc;
use core::panic::AssertUnwindSafe;

use fluxion_core::operators::{self, guard_user_fn};
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::CoreSubscriber;
use fluxion_error::FluxionError;
use fluxion_stream_core::queue_subscription::ScalarSubscription;
use fluxion_stream_core::Mono;

/// `just(v)`: a scalar, fuseable `Mono`.
///
/// Requires `T: Clone` so the value can be replayed on every independent
/// subscribe; callers
/// with an expensive-to-clone value typically wrap it in an `Arc` first.
pub fn just<T: Clone + Send + Sync + 'static>(value: T) -> Mono<T> {
    struct JustPublisher<T>(T);
    impl<T: Clone + Send + Sync + 'static> Publisher<T> for JustPublisher<T> {
        fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
            let subscription = ScalarSubscription::new(self.0.clone(), subscriber.clone());
            subscriber.on_subscribe(subscription);
        }
    }
    Mono::from_publisher(JustPublisher(value))
}

/// `empty()`: completes immediately with no value, synchronously.
pub fn empty<T: Send + Sync + 'static>() -> Mono<T> {
    struct EmptyPublisher<T>(core::marker::PhantomData<fn() -> T>);
    impl<T: Send + Sync + 'static> Publisher<T> for EmptyPublisher<T> {
        fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
            operators::complete(&*subscriber);
        }
    }
    Mono::from_publisher(EmptyPublisher(core::marker::PhantomData))
}

/// `error(err)`: a lazily-materialized error, matching `just`'s
/// eagerness contract in reverse — the supplier runs once per subscribe.
pub fn error<T: Send + Sync + 'static>(
    supplier: impl Fn() -> FluxionError + Send + Sync + 'static,
) -> Mono<T> {
    struct ErrorPublisher<T> {
        supplier: Arc<dyn Fn() -> FluxionError + Send + Sync>,
        _marker: core::marker::PhantomData<fn() -> T>,
    }
    impl<T: Send + Sync + 'static> Publisher<T> for ErrorPublisher<T> {
        fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
            operators::error(&*subscriber, (self.supplier)());
        }
    }
    Mono::from_publisher(ErrorPublisher {
        supplier: Arc::new(supplier),
        _marker: core::marker::PhantomData,
    })
}

/// `defer(supplier)`: invokes `supplier` fresh on every subscribe and
/// forwards to the `Mono` it returns. A panicking supplier maps to
/// `on_error` rather than propagating.
pub fn defer<T: Send + Sync + 'static>(
    supplier: impl Fn() -> Mono<T> + Send + Sync + 'static,
) -> Mono<T> {
    struct DeferPublisher<T> {
        supplier: Arc<dyn Fn() -> Mono<T> + Send + Sync>,
    }
    impl<T: Send + Sync + 'static> Publisher<T> for DeferPublisher<T> {
        fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
            let supplier = Arc::clone(&self.supplier);
            match guard_user_fn("defer", AssertUnwindSafe(move || supplier())) {
                Ok(inner) => inner.subscribe_arc(subscriber),
                Err(e) => operators::error(&*subscriber, e),
            }
        }
    }
    Mono::from_publisher(DeferPublisher {
        supplier: Arc::new(supplier),
    })
}

/// `fromCallable`/`fromSupplier`: at most one value, computed lazily
/// on subscribe. Fusion mode `SYNC`, via [`ScalarSubscription`]. A
/// panicking callable maps to `on_error`; returning `None` completes empty.
pub fn from_callable<T: Send + Sync + 'static>(
    callable: impl Fn() -> Result<Option<T>, FluxionError> + Send + Sync + 'static,
) -> Mono<T> {
    struct CallablePublisher<T> {
        callable: Arc<dyn Fn() -> Result<Option<T>, FluxionError> + Send + Sync>,
    }
    impl<T: Send + Sync + 'static> Publisher<T> for CallablePublisher<T> {
        fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
            let callable = Arc::clone(&self.callable);
            match guard_user_fn("from_callable", AssertUnwindSafe(move || callable())) {
                Ok(Ok(Some(value))) => {
                    let subscription = ScalarSubscription::new(value, subscriber.clone());
                    subscriber.on_subscribe(subscription);
                }
                Ok(Ok(None)) => operators::complete(&*subscriber),
                Ok(Err(e)) => operators::error(&*subscriber, e),
                Err(e) => operators::error(&*subscriber, e),
            }
        }
    }
    Mono::from_publisher(CallablePublisher {
        callable: Arc::new(callable),
    })
}
