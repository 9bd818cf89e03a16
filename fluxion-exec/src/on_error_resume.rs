// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `onErrorResume(fallback_fn)`: a recovery operator — unlike most of
//! the pipeline, it is allowed to swallow an `onError` locally. On `source`'s
//! failure it builds a fallback `Flux` from the error and subscribes to that
//! instead, via the same [`MultiSubscriptionSubscriber`] sequencing
//! [`crate::retry`] uses; the fallback's own terminal reaches downstream
//! unchanged, so a fallback that itself errors does not resume again.

use std::sync::Arc;

use fluxion_core::context::Context;
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_error::FluxionError;
use fluxion_stream_core::multi_subscription::MultiSubscriptionSubscriber;
use fluxion_stream_core::Flux;

struct ResumeState<T: Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<T>>,
    multi: Arc<MultiSubscriptionSubscriber>,
    fallback_fn: Arc<dyn Fn(&FluxionError) -> Flux<T> + Send + Sync>,
}

struct ResumeInner<T: Send + Sync + 'static> {
    state: Arc<ResumeState<T>>,
    resumed: bool,
}

impl<T: Send + Sync + 'static> Subscriber<T> for ResumeInner<T> {
    fn on_subscribe(&self, subscription: Arc<dyn fluxion_core::subscription::Subscription>) {
        self.state.multi.set_subscription(subscription);
    }

    fn on_next(&self, value: T) {
        self.state.multi.produced(1);
        self.state.downstream.on_next(value);
    }

    fn on_error(&self, error: FluxionError) {
        if self.resumed {
            self.state.downstream.on_error(error);
            return;
        }
        let fallback = (self.state.fallback_fn)(&error);
        let inner = Arc::new(ResumeInner {
            state: Arc::clone(&self.state),
            resumed: true,
        });
        fallback.subscribe_arc(inner);
    }

    fn on_complete(&self) {
        self.state.downstream.on_complete();
    }
}

impl<T: Send + Sync + 'static> CoreSubscriber<T> for ResumeInner<T> {
    fn current_context(&self) -> &Context {
        self.state.downstream.current_context()
    }
}

struct ResumePublisher<T: Send + Sync + 'static> {
    source: Flux<T>,
    fallback_fn: Arc<dyn Fn(&FluxionError) -> Flux<T> + Send + Sync>,
}

impl<T: Send + Sync + 'static> Publisher<T> for ResumePublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let state = Arc::new(ResumeState {
            downstream: subscriber,
            multi: Arc::new(MultiSubscriptionSubscriber::new()),
            fallback_fn: Arc::clone(&self.fallback_fn),
        });
        state
            .downstream
            .on_subscribe(Arc::clone(&state.multi) as Arc<dyn fluxion_core::subscription::Subscription>);
        let inner = Arc::new(ResumeInner {
            state: Arc::clone(&state),
            resumed: false,
        });
        self.source.subscribe_arc(inner);
    }
}

/// `onErrorResume(source, fallback_fn)`: on `source`'s `onError`, subscribe
/// to `fallback_fn(&error)` instead of propagating the failure. The
/// fallback's own terminal signal reaches downstream as-is.
pub fn on_error_resume<T: Send + Sync + 'static>(
    source: Flux<T>,
    fallback_fn: impl Fn(&FluxionError) -> Flux<T> + Send + Sync + 'static,
) -> Flux<T> {
    Flux::from_publisher(ResumePublisher {
        source,
        fallback_fn: Arc::new(fallback_fn),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use fluxion_stream_multi::{error, from_array};
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn falls_back_on_error_and_completes_via_the_fallback() {
        let source: Flux<i32> = error(FluxionError::stream_error("boom"));
        let flux = on_error_resume(source, |_e| from_array(vec![9, 10]));
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(2, Duration::from_secs(1)));
        assert_eq!(subscriber.values(), vec![9, 10]);
        assert!(subscriber.is_terminated());
        assert!(subscriber.error().is_none());
    }

    #[test]
    fn a_source_that_never_errors_never_touches_the_fallback() {
        let flux = on_error_resume(from_array(vec![1, 2, 3]), |_e| {
            from_array(vec![999])
        });
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(3, Duration::from_secs(1)));
        assert_eq!(subscriber.values(), vec![1, 2, 3]);
    }

    #[test]
    fn a_fallback_that_itself_errors_does_not_resume_again() {
        let source: Flux<i32> = error(FluxionError::stream_error("first"));
        let flux = on_error_resume(source, |_e| error(FluxionError::stream_error("second")));
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(1, Duration::from_secs(1)));
        assert!(subscriber.error().is_some());
    }
}
