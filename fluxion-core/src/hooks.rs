//! Process-wide fallback hooks.
//!
//! The design's recommendation is context-first lookup with a global
//! fallback and explicit reset entry points for test isolation; that's what
//! [`crate::context::Context`] and this module implement together. This
//! module only exists under `std`: a thread-safe global requires
//! [`std::sync::OnceLock`], which isn't available in `alloc`-only builds —
//! embedded/WASM callers simply get context-only hooks.

use std::sync::RwLock;

use fluxion_error::FluxionError;

use crate::context::{DropHook, ErrorDropHook};

static ON_DISCARD: RwLock<Option<DropHook>> = RwLock::new(None);
static ON_NEXT_DROPPED: RwLock<Option<DropHook>> = RwLock::new(None);
static ON_ERROR_DROPPED: RwLock<Option<ErrorDropHook>> = RwLock::new(None);

/// Install the process-wide fallback discard hook.
pub fn set_global_on_discard(hook: DropHook) {
    *ON_DISCARD.write().unwrap_or_else(|e| e.into_inner()) = Some(hook);
}

/// Install the process-wide fallback dropped-`onNext` hook.
pub fn set_global_on_next_dropped(hook: DropHook) {
    *ON_NEXT_DROPPED.write().unwrap_or_else(|e| e.into_inner()) = Some(hook);
}

/// Install the process-wide fallback dropped-error hook.
pub fn set_global_on_error_dropped(hook: ErrorDropHook) {
    *ON_ERROR_DROPPED.write().unwrap_or_else(|e| e.into_inner()) = Some(hook);
}

/// Clear every global fallback hook. Intended for test isolation between
/// cases that install their own hooks.
pub fn reset() {
    *ON_DISCARD.write().unwrap_or_else(|e| e.into_inner()) = None;
    *ON_NEXT_DROPPED.write().unwrap_or_else(|e| e.into_inner()) = None;
    *ON_ERROR_DROPPED.write().unwrap_or_else(|e| e.into_inner()) = None;
}

pub(crate) fn global_discard() -> Option<DropHook> {
    ON_DISCARD.read().unwrap_or_else(|e| e.into_inner()).clone()
}

pub(crate) fn global_next_dropped() -> Option<DropHook> {
    ON_NEXT_DROPPED
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

pub(crate) fn global_error_dropped() -> Option<ErrorDropHook> {
    ON_ERROR_DROPPED
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Default fallback used when neither the context nor the global table has a
/// discard/drop hook installed: a `tracing` event under the `tracing`
/// feature, otherwise nothing (never a panic — hooks must never throw).
pub(crate) fn trace_discard(_value: &(dyn core::any::Any + Send)) {
    #[cfg(feature = "tracing")]
    tracing::trace!("discarding value with no onDiscard hook installed");
}

pub(crate) fn trace_next_dropped(_value: &(dyn core::any::Any + Send)) {
    #[cfg(feature = "tracing")]
    tracing::trace!("dropping onNext with no onNextDropped hook installed");
}

pub(crate) fn trace_error_dropped(_err: &FluxionError) {
    #[cfg(feature = "tracing")]
    tracing::debug!(error = %_err, "dropping error with no onErrorDropped hook installed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn global_hook_is_invoked_and_reset_clears_it() {
        reset();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        set_global_on_discard(Arc::new(move |_v| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));
        global_discard().unwrap()(Box::new(1i32));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        reset();
        assert!(global_discard().is_none());
    }
}
