use alloc::sync::Arc;

use fluxion_error::FluxionError;

use crate::context::Context;
use crate::subscription::Subscription;

/// A consumer capability with the four Reactive Streams callbacks.
/// `onSubscribe` arrives exactly once before any other signal; then zero or
/// more `onNext`; then at most one of `onComplete` or `onError`.
///
/// Methods take `&self` rather than `&mut self`: operators that need mutable
/// state wrap it in atomics or a lock (the "WIP drain loop"/half-serializer
/// pattern throughout this workspace) so a `Subscriber` can be shared behind
/// an `Arc` and invoked from whichever thread the upstream happens to be
/// running on — exactly the parallel, non-cooperative model this workspace
/// targets.
pub trait Subscriber<T>: Send + Sync {
    /// Deliver the subscription. Must be the first signal; a subscriber that
    /// receives a second `onSubscribe` must cancel it, uniformly, rather
    /// than acting on it.
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);

    /// Deliver one value. Never called before `onSubscribe`, never called
    /// after a terminal signal.
    fn on_next(&self, value: T);

    /// Deliver the terminal error. Mutually exclusive with `on_complete`.
    fn on_error(&self, error: FluxionError);

    /// Deliver terminal completion. Mutually exclusive with `on_error`.
    fn on_complete(&self);
}

/// A [`Subscriber`] that also carries the [`Context`] propagated upstream at
/// subscribe time. This is the subscriber shape every
/// internal operator actually receives: the base `Flux`/`Mono` dispatch
/// (component D) wraps a plain external `Subscriber` into a `CoreSubscriber`
/// once, at the edge, the same way the distilled design describes.
pub trait CoreSubscriber<T>: Subscriber<T> {
    /// The context this subscriber (and everything downstream of it) was
    /// subscribed with.
    fn current_context(&self) -> &Context;
}

/// Wrap a plain [`Subscriber`] with a [`Context`], producing a
/// [`CoreSubscriber`]. This is the "wrapping non-core subscribers" step
/// component D assigns to the abstract `Flux`/`Mono` base.
pub struct ContextualSubscriber<T, S: Subscriber<T>> {
    inner: S,
    context: Context,
    _marker: core::marker::PhantomData<fn(T)>,
}

impl<T, S: Subscriber<T>> ContextualSubscriber<T, S> {
    pub fn new(inner: S, context: Context) -> Self {
        Self {
            inner,
            context,
            _marker: core::marker::PhantomData,
        }
    }
}

impl<T: Send + Sync, S: Subscriber<T>> Subscriber<T> for ContextualSubscriber<T, S> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.inner.on_subscribe(subscription);
    }

    fn on_next(&self, value: T) {
        self.inner.on_next(value);
    }

    fn on_error(&self, error: FluxionError) {
        self.inner.on_error(error);
    }

    fn on_complete(&self) {
        self.inner.on_complete();
    }
}

impl<T: Send + Sync, S: Subscriber<T>> CoreSubscriber<T> for ContextualSubscriber<T, S> {
    fn current_context(&self) -> &Context {
        &self.context
    }
}
