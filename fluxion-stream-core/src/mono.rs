// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use alloc::sync::Arc;

use fluxion_core::context::Context;
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{ContextualSubscriber, CoreSubscriber, Subscriber};

/// The at-most-one-value pipeline shape.
///
/// Identical in shape to [`crate::Flux`] — the distinction between the two
/// is a contract operators are expected to honour (at most one `on_next`
/// before the terminal signal), not a different runtime representation.
/// Keeping it a distinct type still lets operator crates dispatch
/// differently where the cardinality bound matters (e.g. `usingWhen`'s
/// resource publisher is conventionally a `Mono`).
pub struct Mono<T> {
    inner: Arc<dyn Publisher<T>>,
}

impl<T> Clone for Mono<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> Mono<T> {
    pub fn from_publisher(publisher: impl Publisher<T> + 'static) -> Self {
        Self {
            inner: Arc::new(publisher),
        }
    }

    #[must_use]
    pub fn from_arc(inner: Arc<dyn Publisher<T>>) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn as_publisher(&self) -> &Arc<dyn Publisher<T>> {
        &self.inner
    }

    pub fn subscribe(&self, subscriber: impl Subscriber<T> + 'static) {
        self.subscribe_with_context(subscriber, Context::empty());
    }

    pub fn subscribe_with_context(&self, subscriber: impl Subscriber<T> + 'static, context: Context) {
        let wrapped = ContextualSubscriber::new(subscriber, context);
        self.inner.subscribe(Arc::new(wrapped));
    }

    pub fn subscribe_arc(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        self.inner.subscribe(subscriber);
    }
}

impl<T: Send + Sync + 'static> Publisher<T> for Mono<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        self.inner.subscribe(subscriber);
    }
}
