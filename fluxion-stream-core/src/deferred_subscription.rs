// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::operators::add_cap;
use fluxion_core::subscription::{Subscription, UNBOUNDED};

/// Holds a pending demand and a yet-to-arrive upstream [`Subscription`]
///.
///
/// Operators that must hand a `Subscription` to their downstream before
/// they have actually subscribed upstream — `defer`, `switchMap`'s outer,
/// any operator whose upstream subscribe happens lazily — install one of
/// these immediately in `on_subscribe`, then call [`Self::set_upstream`]
/// once the real subscription arrives. `request`s observed before that
/// point accumulate with saturation and are drained atomically into the
/// upstream the moment it's set.
#[derive(Default)]
pub struct DeferredSubscription {
    pending: AtomicU64,
    upstream: Mutex<Option<Arc<dyn Subscription>>>,
    cancelled: AtomicBool,
}

impl DeferredSubscription {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: AtomicU64::new(0),
            upstream: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Install the real upstream subscription. If this subscription was
    /// already cancelled, `new_upstream` is cancelled immediately instead of
    /// being stored. Otherwise any demand accumulated so far is drained into
    /// it atomically, and a second call after the first is rejected (the
    /// slot cancels whatever it's handed once occupied), matching the
    /// uniform "second subscription always loses" rule.
    pub fn set_upstream(&self, new_upstream: Arc<dyn Subscription>) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            new_upstream.cancel();
            return false;
        }
        let mut guard = self.upstream.lock();
        if guard.is_some() {
            drop(guard);
            new_upstream.cancel();
            return false;
        }
        let pending = self.pending.swap(0, Ordering::AcqRel);
        *guard = Some(Arc::clone(&new_upstream));
        drop(guard);
        if pending > 0 {
            new_upstream.request(pending);
        }
        true
    }

    /// True once [`Self::cancel`] has been observed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Subscription for DeferredSubscription {
    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        let upstream = self.upstream.lock().clone();
        if let Some(upstream) = upstream {
            upstream.request(n);
            return;
        }
        let mut current = self.pending.load(Ordering::Acquire);
        loop {
            let next = add_cap(current, n);
            match self.pending.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        // A real upstream may have arrived while we were accumulating; if so,
        // hand it the demand we just recorded instead of leaving it stranded.
        if let Some(upstream) = self.upstream.lock().clone() {
            let drained = self.pending.swap(0, Ordering::AcqRel);
            if drained > 0 {
                upstream.request(drained);
            }
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(upstream) = self.upstream.lock().take() {
            upstream.cancel();
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

    #[test]
    fn accumulates_demand_before_upstream_arrives_and_drains_it() {
        let deferred = DeferredSubscription::new();
        deferred.request(3);
        deferred.request(4);
        let requested = Arc::new(Counter::new(0));
        let cancelled = Arc::new(AtomicBool::new(false));
        let upstream = Arc::new(Recording {
            requested: Arc::clone(&requested),
            cancelled: Arc::clone(&cancelled),
        });
        assert!(deferred.set_upstream(upstream));
        assert_eq!(requested.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn request_after_upstream_set_forwards_directly() {
        let deferred = DeferredSubscription::new();
        let requested = Arc::new(Counter::new(0));
        let cancelled = Arc::new(AtomicBool::new(false));
        let upstream = Arc::new(Recording {
            requested: Arc::clone(&requested),
            cancelled,
        });
        deferred.set_upstream(upstream);
        deferred.request(2);
        assert_eq!(requested.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn saturates_at_unbounded() {
        let deferred = DeferredSubscription::new();
        deferred.request(UNBOUNDED);
        deferred.request(5);
        let requested = Arc::new(Counter::new(0));
        let upstream = Arc::new(Recording {
            requested: Arc::clone(&requested),
            cancelled: Arc::new(AtomicBool::new(false)),
        });
        deferred.set_upstream(upstream);
        assert_eq!(requested.load(Ordering::SeqCst), UNBOUNDED);
    }

    #[test]
    fn cancel_before_upstream_set_cancels_it_on_arrival() {
        let deferred = DeferredSubscription::new();
        deferred.cancel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let upstream = Arc::new(Recording {
            requested: Arc::new(Counter::new(0)),
            cancelled: Arc::clone(&cancelled),
        });
        assert!(!deferred.set_upstream(upstream));
        assert!(cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn second_set_upstream_cancels_the_second() {
        let deferred = DeferredSubscription::new();
        let first_cancelled = Arc::new(AtomicBool::new(false));
        let first = Arc::new(Recording {
            requested: Arc::new(Counter::new(0)),
            cancelled: Arc::clone(&first_cancelled),
        });
        assert!(deferred.set_upstream(first));

        let second_cancelled = Arc::new(AtomicBool::new(false));
        let second = Arc::new(Recording {
            requested: Arc::new(Counter::new(0)),
            cancelled: Arc::clone(&second_cancelled),
        });
        assert!(!deferred.set_upstream(second));
        assert!(second_cancelled.load(Ordering::SeqCst));
        assert!(!first_cancelled.load(Ordering::SeqCst));
    }
}
