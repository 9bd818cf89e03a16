use fluxion_error::FluxionError;

use crate::subscription::Subscription;

/// Fusion mode bitmask.
///
/// `request_fusion` always returns either [`NONE`] or a subset of the
/// requested mask — never a mode the caller didn't ask for.
pub mod mode {
    /// No fusion: classical signal-based delivery.
    pub const NONE: u8 = 0;
    /// Values are produced on demand inside `poll`, driven by the
    /// downstream calling it; the upstream never calls `on_next`.
    pub const SYNC: u8 = 0b001;
    /// The upstream calls `on_next` with no payload as a wake-up; the
    /// downstream then drains via `poll` on its own thread.
    pub const ASYNC: u8 = 0b010;
    /// Either `SYNC` or `ASYNC` — the mask a downstream passes when it can
    /// take whichever the upstream prefers to grant.
    pub const ANY: u8 = SYNC | ASYNC;
    /// Forbids fusion across an executor/thread boundary. Not itself a
    /// grantable mode; operators that cross threads refuse fusion entirely
    /// when they see this flag set in the requested mask.
    pub const THREAD_BARRIER: u8 = 0b100;
}

/// A [`Subscription`] extension implementing a queue-like interface, used to
/// let adjacent operators in a chain bypass per-signal `onNext` dispatch
///.
///
/// - Under [`mode::SYNC`], the downstream polls directly; `on_next` is never
///   called, and the terminal state is `poll` returning `Ok(None)` while
///   `is_empty()` is `true`.
/// - Under [`mode::ASYNC`], the upstream calls `on_next` as a wake-up only;
///   the downstream still drains exclusively through `poll`.
pub trait FuseableSubscription<T>: Subscription {
    /// Negotiate a fusion mode. `requested_mode` is the mask of modes the
    /// downstream is willing to accept; the return value is either
    /// [`mode::NONE`] or a subset of `requested_mode`.
    fn request_fusion(&self, requested_mode: u8) -> u8;

    /// Pull the next queued value, if any. Under `SYNC` fusion this may run
    /// the operator's synchronous work (e.g. advancing an array index)
    /// directly; under `ASYNC` fusion this only drains an already-filled
    /// queue. Returns `Err` if the operator's pending state is itself an
    /// error (mirrors a `poll` that surfaces a `RuntimeException` in the
    /// design this is drawn from).
    fn poll(&self) -> Result<Option<T>, FluxionError>;

    /// True iff no further value is queued or (for `SYNC`) producible
    /// without more upstream work.
    fn is_empty(&self) -> bool;

    /// Discard every queued value without delivering it.
    fn clear(&self);

    /// Best-effort count of queued values.
    fn size(&self) -> usize;
}
