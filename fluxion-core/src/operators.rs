//! Signal primitives & operator helpers (component A).
//!
//! Every operator in this workspace is built out of these small, carefully
//! audited pieces rather than reimplementing validation/arithmetic/error
//! routing inline — the same way the protocol rules and the error taxonomy
//! are meant to be enforced identically everywhere.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::any::Any;
use core::panic::UnwindSafe;

use fluxion_error::FluxionError;

use crate::context::Context;
use crate::fluxion_mutex::Mutex;
use crate::hooks;
use crate::subscriber::Subscriber;
use crate::subscription::{NoopSubscription, Subscription, UNBOUNDED};

/// Validate a `request(n)` call.
///
/// Returns the validated demand as a `u64` when `n >= 1`; otherwise returns
/// the protocol error to deliver through the downstream's `onError` (the
/// caller, not this function, performs that delivery, since callers differ
/// in whether they have a live subscriber to deliver to yet).
pub fn validate_request(n: i64) -> Result<u64, FluxionError> {
    if n < 1 {
        Err(FluxionError::non_positive_request(n))
    } else {
        Ok(n as u64)
    }
}

/// Validate a single-subscription slot.
///
/// Returns `true` iff `slot` was empty and is now `new_subscription`;
/// otherwise cancels `new_subscription` and returns `false`. The second
/// subscription always loses uniformly.
pub fn validate_subscription(
    slot: &Mutex<Option<Arc<dyn Subscription>>>,
    new_subscription: Arc<dyn Subscription>,
) -> bool {
    let mut guard = slot.lock();
    if guard.is_some() {
        drop(guard);
        new_subscription.cancel();
        false
    } else {
        *guard = Some(new_subscription);
        true
    }
}

/// Saturating addition at [`UNBOUNDED`].
///
/// Once either operand is [`UNBOUNDED`], the sum stays [`UNBOUNDED`] — the
/// sticky-sentinel behavior invariant 2/5 requires.
#[must_use]
pub const fn add_cap(a: u64, b: u64) -> u64 {
    match a.checked_add(b) {
        Some(sum) if sum < UNBOUNDED => sum,
        _ => UNBOUNDED,
    }
}

/// Saturating subtraction at zero.
#[must_use]
pub const fn sub_or_zero(a: u64, b: u64) -> u64 {
    if a > b {
        a - b
    } else {
        0
    }
}

/// Route a value that could not be delivered to its discard hook: context
/// first, then the process-wide fallback, then a trace event. Never panics.
pub fn on_discard<T: Any + Send>(ctx: &Context, value: T) {
    let boxed: Box<dyn Any + Send> = Box::new(value);
    if let Some(hook) = ctx.discard_hook() {
        hook(boxed);
        return;
    }
    #[cfg(feature = "std")]
    if let Some(hook) = hooks::global_discard() {
        hook(boxed);
        return;
    }
    #[cfg(feature = "std")]
    hooks::trace_discard(&*boxed);
    #[cfg(not(feature = "std"))]
    drop(boxed);
}

/// Route an `onNext` that arrived after termination or on a cancelled
/// subscription to its dropped hook.
pub fn on_next_dropped<T: Any + Send>(ctx: &Context, value: T) {
    let boxed: Box<dyn Any + Send> = Box::new(value);
    if let Some(hook) = ctx.next_dropped_hook() {
        hook(boxed);
        return;
    }
    #[cfg(feature = "std")]
    if let Some(hook) = hooks::global_next_dropped() {
        hook(boxed);
        return;
    }
    #[cfg(feature = "std")]
    hooks::trace_next_dropped(&*boxed);
    #[cfg(not(feature = "std"))]
    drop(boxed);
}

/// Route an error that arrived after termination or on a cancelled
/// subscription to its dropped hook.
/// Never double-dispatched: exactly one of `onError`/`onErrorDropped` fires
/// per error, enforced by callers only reaching here once they've already
/// decided the normal `onError` path is closed.
pub fn on_error_dropped(ctx: &Context, error: &FluxionError) {
    if let Some(hook) = ctx.error_dropped_hook() {
        hook(error);
        return;
    }
    #[cfg(feature = "std")]
    if let Some(hook) = hooks::global_error_dropped() {
        hook(error);
        return;
    }
    #[cfg(feature = "std")]
    hooks::trace_error_dropped(error);
}

/// Classify and route an operator error.
///
/// Cancels `subscription` if one is supplied, discards `value` through
/// [`on_discard`] if one was in flight, and returns the error unchanged for
/// the caller to deliver through `onError`. Fatal errors never reach this
/// function in the first place: [`guard_user_fn`] rethrows them before an
/// operator gets a chance to call `on_operator_error`.
pub fn on_operator_error<T: Any + Send>(
    subscription: Option<&dyn Subscription>,
    error: FluxionError,
    value: Option<T>,
    ctx: &Context,
) -> FluxionError {
    if let Some(subscription) = subscription {
        subscription.cancel();
    }
    if let Some(value) = value {
        on_discard(ctx, value);
    }
    error
}

/// Run a user-supplied closure, converting a panic into
/// [`FluxionError::CallbackPanic`] instead of unwinding through the
/// operator's state machine.
///
/// A small, fixed set of fatal conditions (stack overflow, allocation
/// failure) can't be caught this way in Rust at all — they abort the
/// process, which is the closest analogue available to "rethrown
/// immediately, never wrapped".
///
/// # Errors
/// Returns `Err(FluxionError::CallbackPanic)` if `f` panics.
pub fn guard_user_fn<R>(
    operator: &str,
    f: impl FnOnce() -> R + UnwindSafe,
) -> Result<R, FluxionError> {
    std::panic::catch_unwind(f).map_err(|payload| {
        let message = panic_message(&payload);
        FluxionError::CallbackPanic {
            context: alloc::format!("{operator}: {message}"),
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> alloc::string::String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).into()
    } else if let Some(s) = payload.downcast_ref::<alloc::string::String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}

/// Deliver a single `onComplete` after a no-op `onSubscribe`.
pub fn complete<T>(subscriber: &dyn Subscriber<T>) {
    subscriber.on_subscribe(Arc::new(NoopSubscription));
    subscriber.on_complete();
}

/// Deliver a single `onError` after a no-op `onSubscribe`.
pub fn error<T>(subscriber: &dyn Subscriber<T>, err: FluxionError) {
    subscriber.on_subscribe(Arc::new(NoopSubscription));
    subscriber.on_error(err);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_cap_saturates() {
        assert_eq!(add_cap(UNBOUNDED, 5), UNBOUNDED);
        assert_eq!(add_cap(5, 3), 8);
        assert_eq!(add_cap(UNBOUNDED - 1, 5), UNBOUNDED);
    }

    #[test]
    fn sub_or_zero_saturates_at_zero() {
        assert_eq!(sub_or_zero(3, 10), 0);
        assert_eq!(sub_or_zero(10, 3), 7);
    }

    #[test]
    fn validate_request_rejects_non_positive() {
        assert!(validate_request(0).is_err());
        assert!(validate_request(-1).is_err());
        assert_eq!(validate_request(5).unwrap(), 5);
    }

    #[test]
    fn guard_user_fn_converts_panic_to_callback_panic() {
        let result = guard_user_fn("map", || -> i32 { panic!("boom") });
        assert!(matches!(result, Err(FluxionError::CallbackPanic { .. })));
    }

    #[test]
    fn guard_user_fn_passes_through_success() {
        let result = guard_user_fn("map", || 2 + 2);
        assert_eq!(result.unwrap(), 4);
    }
}
