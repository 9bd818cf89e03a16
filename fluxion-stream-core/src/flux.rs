// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use alloc::sync::Arc;

use fluxion_core::context::Context;
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{ContextualSubscriber, CoreSubscriber, Subscriber};

/// The multi-value pipeline shape — the abstract `Flux<T>` base every
/// source and operator ultimately produces.
///
/// `Flux` is a thin, cheaply-cloneable handle around an `Arc<dyn
/// Publisher<T>>`: every operator combinator (`map`, `filter`, `take`, ...,
/// defined as extension traits in `fluxion-stream-multi`/`fluxion-stream`)
/// takes a `Flux<T>` by value and returns a new `Flux<R>` wrapping an
/// operator-specific [`Publisher`] that holds the original as its upstream.
/// Subscribing twice to the same `Flux` installs two independent subscriber
/// chains — nothing here is shared across subscriptions unless an operator
/// (`publish`, `share`) deliberately opts into it.
pub struct Flux<T> {
    inner: Arc<dyn Publisher<T>>,
}

impl<T> Clone for Flux<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> Flux<T> {
    /// Wrap a concrete [`Publisher`] as a `Flux`.
    pub fn from_publisher(publisher: impl Publisher<T> + 'static) -> Self {
        Self {
            inner: Arc::new(publisher),
        }
    }

    /// Wrap an already-boxed publisher, e.g. one returned from a
    /// transformer function that only knows it produces *a* `Publisher<T>`.
    #[must_use]
    pub fn from_arc(inner: Arc<dyn Publisher<T>>) -> Self {
        Self { inner }
    }

    /// The inner publisher, for operator crates that need to hand it
    /// directly to another subscribe call (e.g. `publish`'s selector).
    #[must_use]
    pub fn as_publisher(&self) -> &Arc<dyn Publisher<T>> {
        &self.inner
    }

    /// Subscribe with an empty [`Context`]. Most call sites reach for this;
    /// [`Self::subscribe_with_context`] is for operators that need to seed
    /// hooks (discard/dropped) or user context values before subscribing.
    pub fn subscribe(&self, subscriber: impl Subscriber<T> + 'static) {
        self.subscribe_with_context(subscriber, Context::empty());
    }

    /// Subscribe, propagating `context` upstream through every operator in
    /// the chain.
    pub fn subscribe_with_context(&self, subscriber: impl Subscriber<T> + 'static, context: Context) {
        let wrapped = ContextualSubscriber::new(subscriber, context);
        self.inner.subscribe(Arc::new(wrapped));
    }

    /// Subscribe an already core-wrapped, already-`Arc`'d subscriber
    /// directly — the shape operator publishers pass to their upstream.
    pub fn subscribe_arc(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        self.inner.subscribe(subscriber);
    }
}

impl<T: Send + Sync + 'static> Publisher<T> for Flux<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        self.inner.subscribe(subscriber);
    }
}
