use crate::subscriber::CoreSubscriber;

/// A [`CoreSubscriber`] extension exposing `tryOnNext`. When the downstream
/// refuses a value — `filter` or
/// `distinct` decided not to emit it — the producer can avoid counting that
/// value against outstanding demand, since no `onNext` actually reached the
/// terminal subscriber.
///
/// Operators that can reject a value without consuming demand (filter,
/// distinct, take-while) implement this directly; operators that merely
/// forward (map, peek) implement it by delegating to whatever the
/// downstream happens to be, upgrading to the conditional path only when the
/// downstream itself is conditional.
pub trait ConditionalSubscriber<T>: CoreSubscriber<T> {
    /// Attempt to deliver `value`. Returns `true` if it was accepted
    /// (equivalent to a plain `onNext`), `false` if the downstream rejected
    /// it — in which case the caller must not decrement its demand counter
    /// for this value.
    fn try_on_next(&self, value: T) -> bool;
}
