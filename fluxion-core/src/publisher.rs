use crate::subscriber::CoreSubscriber;

/// An immutable, freely-shared, re-subscribable factory whose sole operation
/// is "subscribe a [`crate::subscriber::Subscriber`]".
///
/// Publishers own only their construction-time parameters; every call to
/// `subscribe` installs a fresh, independent subscriber chain — subscribing
/// twice to the same `Publisher` must behave as if the underlying work were
/// started twice, never sharing state between the two subscriptions (that
/// sharing is exactly what the multicast operators in `fluxion-merge` exist
/// to opt into deliberately).
///
/// `subscribe` takes a [`CoreSubscriber`], not a plain `Subscriber`: every
/// operator in the chain needs the propagated [`crate::context::Context`] to
/// look up its discard/dropped hooks, so the base `Flux`/`Mono` wraps a
/// plain external subscriber into one exactly once, at the edge, the way
/// component D's "wrapping non-core subscribers" step describes.
pub trait Publisher<T>: Send + Sync {
    /// Subscribe `subscriber` to this publisher.
    fn subscribe(&self, subscriber: alloc::sync::Arc<dyn CoreSubscriber<T>>);
}
