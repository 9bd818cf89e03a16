// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#[cfg(feature = "runtime-tokio")]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "runtime-tokio")]
use std::{sync::Arc, time::Duration};

#[cfg(feature = "runtime-tokio")]
use fluxion_error::FluxionError;

#[cfg(feature = "runtime-tokio")]
use crate::{
    runtime::Runtime,
    scheduler::{CancelHandle, Scheduler},
    timer::Timer,
};

#[cfg(feature = "runtime-tokio")]
pub struct TokioRuntime;

#[cfg(feature = "runtime-tokio")]
impl Runtime for TokioRuntime {
    type Mutex<T: ?Sized> = Arc<parking_lot::Mutex<T>>;
    type Timer = TokioTimer;
    type Instant = std::time::Instant;
}

#[cfg(feature = "runtime-tokio")]
#[derive(Clone, Debug)]
pub struct TokioTimer;

#[cfg(feature = "runtime-tokio")]
impl Timer for TokioTimer {
    type Sleep = tokio::time::Sleep;

    type Instant = std::time::Instant;

    fn sleep_future(&self, duration: Duration) -> Self::Sleep {
        tokio::time::sleep(duration)
    }

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }
}

#[cfg(feature = "runtime-tokio")]
struct TokioCancelHandle {
    cancelled: AtomicBool,
    task: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

#[cfg(feature = "runtime-tokio")]
impl CancelHandle for TokioCancelHandle {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// An executor backed by `tokio::spawn` and
/// `tokio::time`. Requires an active Tokio runtime at the call site, the
/// same assumption [`TokioTimer`] already makes.
#[cfg(feature = "runtime-tokio")]
#[derive(Clone, Debug, Default)]
pub struct TokioScheduler {
    disposed: Arc<AtomicBool>,
}

#[cfg(feature = "runtime-tokio")]
impl TokioScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_disposed(&self) -> Result<(), FluxionError> {
        if self.disposed.load(Ordering::Acquire) {
            Err(FluxionError::resource_limit("tokio-scheduler", 0))
        } else {
            Ok(())
        }
    }
}

#[cfg(feature = "runtime-tokio")]
impl Scheduler for TokioScheduler {
    fn schedule(
        &self,
        task: Box<dyn FnOnce() + Send>,
    ) -> Result<Arc<dyn CancelHandle>, FluxionError> {
        self.check_disposed()?;
        let handle = tokio::spawn(async move { task() });
        Ok(Arc::new(TokioCancelHandle {
            cancelled: AtomicBool::new(false),
            task: std::sync::Mutex::new(Some(handle)),
        }))
    }

    fn schedule_after(
        &self,
        delay: Duration,
        task: Box<dyn FnOnce() + Send>,
    ) -> Result<Arc<dyn CancelHandle>, FluxionError> {
        self.check_disposed()?;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        Ok(Arc::new(TokioCancelHandle {
            cancelled: AtomicBool::new(false),
            task: std::sync::Mutex::new(Some(handle)),
        }))
    }

    fn schedule_periodically(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: Arc<dyn Fn() + Send + Sync>,
    ) -> Result<Arc<dyn CancelHandle>, FluxionError> {
        self.check_disposed()?;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(initial_delay).await;
            let mut ticker = tokio::time::interval(period);
            // The initial tick fires immediately; we've already slept
            // `initial_delay`, so skip it to avoid a double-fire.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                task();
            }
        });
        Ok(Arc::new(TokioCancelHandle {
            cancelled: AtomicBool::new(false),
            task: std::sync::Mutex::new(Some(handle)),
        }))
    }

    fn now_nanos(&self) -> u64 {
        // tokio::time::Instant has no fixed epoch; the instant relative to
        // process start is sufficient since callers only use `now_nanos`
        // to difference two readings.
        static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
        let start = *START.get_or_init(std::time::Instant::now);
        std::time::Instant::now()
            .saturating_duration_since(start)
            .as_nanos() as u64
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
