// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::operators::{add_cap, sub_or_zero};
use fluxion_core::subscription::{Subscription, UNBOUNDED};

/// Generalizes [`crate::DeferredSubscription`] across a *sequence* of
/// upstreams: `concat`, `retry`,
/// `repeat` all subscribe to one upstream at a time and need to switch to
/// the next without losing outstanding demand.
///
/// Tracks how many elements the current upstream has already produced so
/// that, on switch, the new upstream is asked for exactly
/// `requested - produced` rather than the full outstanding demand again
/// (otherwise a downstream that requested `N` once would receive `N` from
/// every subsequent upstream in the chain).
#[derive(Default)]
pub struct MultiSubscriptionSubscriber {
    current: Mutex<Option<Arc<dyn Subscription>>>,
    requested: AtomicU64,
    produced: AtomicU64,
    cancelled: AtomicBool,
}

impl MultiSubscriptionSubscriber {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            requested: AtomicU64::new(0),
            produced: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Record that `n` elements were produced by the current upstream since
    /// the last switch. Call this once per `on_next` the current upstream
    /// delivers, before the subscriber forwards the value downstream.
    pub fn produced(&self, n: u64) {
        self.produced.fetch_add(n, Ordering::Relaxed);
    }

    /// Switch to a new upstream: cancels whatever was previously installed
    /// (tolerating `None` the first time), resets the produced counter, and
    /// requests whatever demand remains outstanding from the new upstream.
    /// Idempotent with [`Self::cancel`]: if this subscriber was already
    /// cancelled, `new_upstream` is cancelled instead of being adopted.
    pub fn set_subscription(&self, new_upstream: Arc<dyn Subscription>) {
        if self.cancelled.load(Ordering::Acquire) {
            new_upstream.cancel();
            return;
        }
        let mut guard = self.current.lock();
        if let Some(previous) = guard.take() {
            previous.cancel();
        }
        *guard = Some(Arc::clone(&new_upstream));
        drop(guard);

        let produced = self.produced.swap(0, Ordering::AcqRel);
        let requested = self.requested.load(Ordering::Acquire);
        let remaining = sub_or_zero(requested, produced);
        if remaining > 0 {
            new_upstream.request(remaining);
        }

        // A concurrent cancel could have raced us between the check above
        // and installing the new subscription; make sure it doesn't survive.
        if self.cancelled.load(Ordering::Acquire) {
            if let Some(sub) = self.current.lock().take() {
                sub.cancel();
            }
        }
    }

    /// True once [`Self::cancel`] has been observed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Subscription for MultiSubscriptionSubscriber {
    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        let mut current = self.requested.load(Ordering::Acquire);
        loop {
            let next = add_cap(current, n);
            match self.requested.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        if let Some(sub) = self.current.lock().clone() {
            sub.request(n);
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(sub) = self.current.lock().take() {
            sub.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicU64 as Counter;

    struct Recording {
        requested: Arc<Counter>,
        cancelled: Arc<AtomicBool>,
    }

    impl Subscription for Recording {
        fn request(&self, n: u64) {
            self.requested.fetch_add(n, Ordering::SeqCst);
        }
        fn cancel(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    fn recording() -> (Arc<Recording>, Arc<Counter>, Arc<AtomicBool>) {
        let requested = Arc::new(Counter::new(0));
        let cancelled = Arc::new(AtomicBool::new(false));
        let sub = Arc::new(Recording {
            requested: Arc::clone(&requested),
            cancelled: Arc::clone(&cancelled),
        });
        (sub, requested, cancelled)
    }

    #[test]
    fn switch_requests_only_the_remaining_demand() {
        let multi = MultiSubscriptionSubscriber::new();
        multi.request(10);
        let (first, first_requested, _) = recording();
        multi.set_subscription(first);
        assert_eq!(first_requested.load(Ordering::SeqCst), 10);

        multi.produced(4);
        let (second, second_requested, _) = recording();
        multi.set_subscription(second);
        assert_eq!(second_requested.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn switching_cancels_the_previous_upstream() {
        let multi = MultiSubscriptionSubscriber::new();
        let (first, _, first_cancelled) = recording();
        multi.set_subscription(first);
        let (second, _, _) = recording();
        multi.set_subscription(second);
        assert!(first_cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn cancel_propagates_to_current_upstream() {
        let multi = MultiSubscriptionSubscriber::new();
        let (sub, _, cancelled) = recording();
        multi.set_subscription(sub);
        multi.cancel();
        assert!(cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn saturating_request_caps_at_unbounded() {
        let multi = MultiSubscriptionSubscriber::new();
        multi.request(UNBOUNDED);
        multi.request(3);
        let (sub, requested, _) = recording();
        multi.set_subscription(sub);
        assert_eq!(requested.load(Ordering::SeqCst), UNBOUNDED);
    }
}
