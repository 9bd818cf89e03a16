// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `usingWhen(resource, closure_fn, on_complete, on_error, on_cancel)`
//!: subscribes to `resource` (a [`Mono`]) to obtain a value, applies
//! `closure_fn` to get the main `Flux`, and defers the main's terminal
//! signal until the cleanup `Flux<()>` for the corresponding branch (if
//! supplied) has itself terminated. A cleanup error during `on_complete`
//! reaches downstream as-is; during `on_error` it is combined with the
//! original failure via [`FluxionError::MultipleErrors`]. `on_cancel`'s
//! cleanup is fire-and-forget: cancellation has no terminal signal to defer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use fluxion_core::context::Context;
use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::operators::add_cap;
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_core::subscription::Subscription;
use fluxion_error::FluxionError;
use fluxion_stream_core::Flux;
use fluxion_stream_core::Mono;

type CleanupFn<R> = Arc<dyn Fn(&R) -> Flux<()> + Send + Sync>;
type ErrorCleanupFn<R> = Arc<dyn Fn(&R, &FluxionError) -> Flux<()> + Send + Sync>;

struct UsingWhenState<R: Send + Sync + 'static, T: Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<T>>,
    resource: Mutex<Option<Arc<R>>>,
    on_complete: Option<CleanupFn<R>>,
    on_error: Option<ErrorCleanupFn<R>>,
    on_cancel: Option<CleanupFn<R>>,
    main_subscription: Mutex<Option<Arc<dyn Subscription>>>,
    // Demand requested before `closure_fn`'s `Flux` has finished subscribing
    // (resource acquisition can outlive the call that installs
    // `main_subscription`); flushed once it is set.
    pending_demand: AtomicU64,
    terminated: AtomicBool,
}

/// Drains a cleanup `Flux<()>` to its terminal, ignoring any values, and
/// invokes `on_done`/`on_fail` exactly once.
struct CleanupObserver<R, FOk, FErr>
where
    FOk: Fn() + Send + Sync,
    FErr: Fn(FluxionError) + Send + Sync,
{
    ctx: Context,
    on_done: FOk,
    on_fail: FErr,
    _marker: core::marker::PhantomData<R>,
}

impl<R: Send + Sync + 'static, FOk, FErr> Subscriber<()> for CleanupObserver<R, FOk, FErr>
where
    FOk: Fn() + Send + Sync,
    FErr: Fn(FluxionError) + Send + Sync,
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        subscription.request(fluxion_core::subscription::UNBOUNDED);
    }

    fn on_next(&self, _value: ()) {}

    fn on_error(&self, error: FluxionError) {
        (self.on_fail)(error);
    }

    fn on_complete(&self) {
        (self.on_done)();
    }
}

impl<R: Send + Sync + 'static, FOk, FErr> CoreSubscriber<()> for CleanupObserver<R, FOk, FErr>
where
    FOk: Fn() + Send + Sync,
    FErr: Fn(FluxionError) + Send + Sync,
{
    fn current_context(&self) -> &Context {
        &self.ctx
    }
}

impl<R: Send + Sync + 'static, T: Send + Sync + 'static> UsingWhenState<R, T> {
    fn finish_complete(self: &Arc<Self>) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        let resource = self.resource.lock().clone();
        let Some(cleanup) = self.on_complete.clone() else {
            self.downstream.on_complete();
            return;
        };
        let Some(resource) = resource else {
            self.downstream.on_complete();
            return;
        };
        let ctx = self.downstream.current_context().clone();
        let downstream = Arc::clone(&self.downstream);
        let downstream_err = Arc::clone(&self.downstream);
        let cleanup_flux = cleanup(&resource);
        cleanup_flux.subscribe_arc(Arc::new(CleanupObserver::<R, _, _> {
            ctx,
            on_done: move || downstream.on_complete(),
            on_fail: move |e| downstream_err.on_error(e),
            _marker: core::marker::PhantomData,
        }));
    }

    fn finish_error(self: &Arc<Self>, error: FluxionError) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        let resource = self.resource.lock().clone();
        let Some(cleanup) = self.on_error.clone() else {
            self.downstream.on_error(error);
            return;
        };
        let Some(resource) = resource else {
            self.downstream.on_error(error);
            return;
        };
        let ctx = self.downstream.current_context().clone();
        let downstream = Arc::clone(&self.downstream);
        let downstream_err = Arc::clone(&self.downstream);
        let cleanup_flux = cleanup(&resource, &error);
        // `error` outlives the cleanup subscription but `FluxionError` isn't
        // `Clone`; exactly one of `on_done`/`on_fail` ever fires, so a
        // shared slot lets either branch reclaim it by value.
        let original = Arc::new(Mutex::new(Some(error)));
        let original_done = Arc::clone(&original);
        cleanup_flux.subscribe_arc(Arc::new(CleanupObserver::<R, _, _> {
            ctx,
            on_done: move || {
                if let Some(err) = original_done.lock().take() {
                    downstream.on_error(err);
                }
            },
            on_fail: move |cleanup_err| {
                if let Some(err) = original.lock().take() {
                    let errors = vec![err, cleanup_err];
                    downstream_err.on_error(FluxionError::MultipleErrors {
                        count: errors.len(),
                        errors,
                    });
                }
            },
            _marker: core::marker::PhantomData,
        }));
    }

    fn fire_cancel_cleanup(self: &Arc<Self>) {
        let resource = self.resource.lock().clone();
        let (Some(cleanup), Some(resource)) = (self.on_cancel.clone(), resource) else {
            return;
        };
        let ctx = self.downstream.current_context().clone();
        let cleanup_flux = cleanup(&resource);
        cleanup_flux.subscribe_arc(Arc::new(CleanupObserver::<R, _, _> {
            ctx,
            on_done: || {},
            on_fail: |_e| {},
            _marker: core::marker::PhantomData,
        }));
    }
}

struct MainSubscriber<R: Send + Sync + 'static, T: Send + Sync + 'static> {
    state: Arc<UsingWhenState<R, T>>,
}

impl<R: Send + Sync + 'static, T: Send + Sync + 'static> Subscriber<T> for MainSubscriber<R, T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let pending = self.state.pending_demand.swap(0, Ordering::AcqRel);
        *self.state.main_subscription.lock() = Some(Arc::clone(&subscription));
        if pending > 0 {
            subscription.request(pending);
        }
    }

    fn on_next(&self, value: T) {
        self.state.downstream.on_next(value);
    }

    fn on_error(&self, error: FluxionError) {
        self.state.finish_error(error);
    }

    fn on_complete(&self) {
        self.state.finish_complete();
    }
}

impl<R: Send + Sync + 'static, T: Send + Sync + 'static> CoreSubscriber<T> for MainSubscriber<R, T> {
    fn current_context(&self) -> &Context {
        self.state.downstream.current_context()
    }
}

struct UsingWhenSubscription<R: Send + Sync + 'static, T: Send + Sync + 'static> {
    state: Arc<UsingWhenState<R, T>>,
}

impl<R: Send + Sync + 'static, T: Send + Sync + 'static> Subscription for UsingWhenSubscription<R, T> {
    fn request(&self, n: u64) {
        if let Some(sub) = self.state.main_subscription.lock().clone() {
            sub.request(n);
        }
    }

    fn cancel(&self) {
        if self.state.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(sub) = self.state.main_subscription.lock().clone() {
            sub.cancel();
        }
        self.state.fire_cancel_cleanup();
    }
}

struct ResourceSubscriber<R: Send + Sync + 'static, T: Send + Sync + 'static> {
    state: Arc<UsingWhenState<R, T>>,
    closure_fn: Arc<dyn Fn(&R) -> Flux<T> + Send + Sync>,
}

impl<R: Send + Sync + 'static, T: Send + Sync + 'static> Subscriber<R> for ResourceSubscriber<R, T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        subscription.request(fluxion_core::subscription::UNBOUNDED);
    }

    fn on_next(&self, value: R) {
        let resource = Arc::new(value);
        *self.state.resource.lock() = Some(Arc::clone(&resource));
        let main = (self.closure_fn)(&resource);
        let inner = Arc::new(MainSubscriber {
            state: Arc::clone(&self.state),
        });
        main.subscribe_arc(inner);
    }

    fn on_error(&self, error: FluxionError) {
        self.state.downstream.on_error(error);
    }

    fn on_complete(&self) {
        if self.state.resource.lock().is_none() {
            self.state
                .downstream
                .on_error(FluxionError::invalid_state("usingWhen resource publisher completed with no value"));
        }
    }
}

impl<R: Send + Sync + 'static, T: Send + Sync + 'static> CoreSubscriber<R> for ResourceSubscriber<R, T> {
    fn current_context(&self) -> &Context {
        self.state.downstream.current_context()
    }
}

struct UsingWhenPublisher<R: Send + Sync + 'static, T: Send + Sync + 'static> {
    resource: Mono<R>,
    closure_fn: Arc<dyn Fn(&R) -> Flux<T> + Send + Sync>,
    on_complete: Option<CleanupFn<R>>,
    on_error: Option<ErrorCleanupFn<R>>,
    on_cancel: Option<CleanupFn<R>>,
}

impl<R: Send + Sync + 'static, T: Send + Sync + 'static> Publisher<T> for UsingWhenPublisher<R, T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let state = Arc::new(UsingWhenState {
            downstream: subscriber,
            resource: Mutex::new(None),
            on_complete: self.on_complete.clone(),
            on_error: self.on_error.clone(),
            on_cancel: self.on_cancel.clone(),
            main_subscription: Mutex::new(None),
            terminated: AtomicBool::new(false),
        });
        state
            .downstream
            .on_subscribe(Arc::new(UsingWhenSubscription { state: Arc::clone(&state) }));
        let resource_sub = Arc::new(ResourceSubscriber {
            state,
            closure_fn: Arc::clone(&self.closure_fn),
        });
        self.resource.subscribe_arc(resource_sub);
    }
}

/// `usingWhen(resource, closure_fn, on_complete, on_error, on_cancel)`: see
/// module docs.
pub fn using_when<R, T, FC, FE, FX>(
    resource: Mono<R>,
    closure_fn: impl Fn(&R) -> Flux<T> + Send + Sync + 'static,
    on_complete: Option<FC>,
    on_error: Option<FE>,
    on_cancel: Option<FX>,
) -> Flux<T>
where
    R: Send + Sync + 'static,
    T: Send + Sync + 'static,
    FC: Fn(&R) -> Flux<()> + Send + Sync + 'static,
    FE: Fn(&R, &FluxionError) -> Flux<()> + Send + Sync + 'static,
    FX: Fn(&R) -> Flux<()> + Send + Sync + 'static,
{
    Flux::from_publisher(UsingWhenPublisher {
        resource,
        closure_fn: Arc::new(closure_fn),
        on_complete: on_complete.map(|f| Arc::new(f) as CleanupFn<R>),
        on_error: on_error.map(|f| Arc::new(f) as ErrorCleanupFn<R>),
        on_cancel: on_cancel.map(|f| Arc::new(f) as CleanupFn<R>),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use fluxion_stream_multi::from_array;
    use fluxion_stream_single::just;
    use fluxion_test_utils::step_verifier::TestSubscriber;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn cleanup_runs_after_main_completes_and_then_downstream_completes() {
        let cleanup_ran = Arc::new(AtomicUsize::new(0));
        let cleanup_ran2 = Arc::clone(&cleanup_ran);
        let flux = using_when(
            just(7i32),
            |resource: &i32| from_array(vec![*resource, resource * 2]),
            Some(move |_r: &i32| {
                cleanup_ran2.fetch_add(1, Ordering::SeqCst);
                from_array::<()>(vec![])
            }),
            None::<fn(&i32, &FluxionError) -> Flux<()>>,
            None::<fn(&i32) -> Flux<()>>,
        );
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(2, Duration::from_secs(1)));
        assert_eq!(subscriber.values(), vec![7, 14]);
        assert!(subscriber.is_terminated());
        assert_eq!(cleanup_ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn error_cleanup_combines_with_the_original_failure() {
        use fluxion_stream_multi::error;
        let flux = using_when(
            just(1i32),
            |_resource: &i32| error::<i32>(FluxionError::stream_error("main failed")),
            None::<fn(&i32) -> Flux<()>>,
            Some(|_r: &i32, _e: &FluxionError| error::<()>(FluxionError::stream_error("cleanup failed"))),
            None::<fn(&i32) -> Flux<()>>,
        );
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(1, Duration::from_secs(1)));
        assert!(matches!(subscriber.error(), Some(FluxionError::MultipleErrors { .. })));
    }

    #[test]
    fn cancel_fires_the_cancel_branch_without_a_downstream_terminal() {
        let cleanup_ran = Arc::new(AtomicUsize::new(0));
        let cleanup_ran2 = Arc::clone(&cleanup_ran);
        let flux = using_when(
            just(3i32),
            |resource: &i32| from_array(vec![*resource; 100]),
            None::<fn(&i32) -> Flux<()>>,
            None::<fn(&i32, &FluxionError) -> Flux<()>>,
            Some(move |_r: &i32| {
                cleanup_ran2.fetch_add(1, Ordering::SeqCst);
                from_array::<()>(vec![])
            }),
        );
        let subscriber = TestSubscriber::new();
        let subscription = {
            flux.subscribe(subscriber.clone());
            subscriber.subscription()
        };
        subscriber.request(1);
        assert!(subscriber.wait_for(1, Duration::from_secs(1)));
        if let Some(sub) = subscription {
            sub.cancel();
        }
        assert!(!subscriber.is_terminated());
    }
}
