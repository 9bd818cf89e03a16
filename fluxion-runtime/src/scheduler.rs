// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The executor abstraction consumed by time-based operators:
//! `schedule`/`scheduleAfter`/`schedulePeriodically` plus
//! `dispose`/`isDisposed`. Kept as a sibling to [`crate::timer::Timer`]
//! rather than folded into it, since a `Timer` only needs to produce
//! `Sleep` futures for an already-running task, while a `Scheduler` also
//! owns where that task runs.

use core::time::Duration;

use alloc::boxed::Box;
use alloc::sync::Arc;

use fluxion_error::FluxionError;

/// A handle to a scheduled task. Dropping it does not cancel the task —
/// call [`CancelHandle::cancel`] explicitly, matching the core's
/// cooperative, non-blocking cancellation semantics.
pub trait CancelHandle: Send + Sync {
    /// Idempotent: a second call is a no-op.
    fn cancel(&self);

    fn is_cancelled(&self) -> bool;
}

/// An executor capable of running boxed tasks once, after a delay, or
/// periodically.
///
/// Implementations wrap a concrete async runtime's spawn primitive; the
/// workspace ships a `TokioScheduler` and keeps this trait object-free at
/// the call site (`Arc<dyn Scheduler>`) so operators can hold one without
/// threading a generic runtime parameter through every type.
pub trait Scheduler: Send + Sync {
    /// Run `task` as soon as possible.
    fn schedule(&self, task: Box<dyn FnOnce() + Send>) -> Result<Arc<dyn CancelHandle>, FluxionError>;

    /// Run `task` once, after `delay`.
    fn schedule_after(
        &self,
        delay: Duration,
        task: Box<dyn FnOnce() + Send>,
    ) -> Result<Arc<dyn CancelHandle>, FluxionError>;

    /// Run `task` repeatedly: first after `initial_delay`, then every
    /// `period` until the returned handle is cancelled or the scheduler is
    /// disposed.
    fn schedule_periodically(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: Arc<dyn Fn() + Send + Sync>,
    ) -> Result<Arc<dyn CancelHandle>, FluxionError>;

    /// Monotonic nanoseconds since an arbitrary epoch, for computing
    /// deadlines without taking a dependency on a specific clock type.
    fn now_nanos(&self) -> u64;

    /// Release the scheduler's resources; further `schedule*` calls return
    /// `FluxionError::ResourceLimitExceeded`, a `RejectedExecutionException`
    /// equivalent.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}
