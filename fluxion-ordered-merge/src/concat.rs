// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `concat(N)`: sequential composition over
//! [`MultiSubscriptionSubscriber`] — subscribe to sources one at a time, in
//! order, advancing to the next on `onComplete`.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use fluxion_core::context::Context;
use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::publisher::Publisher;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_error::FluxionError;
use fluxion_stream_core::multi_subscription::MultiSubscriptionSubscriber;
use fluxion_stream_core::Flux;

struct ConcatState<T: Send + Sync + 'static> {
    downstream: Arc<dyn CoreSubscriber<T>>,
    remaining: Mutex<VecDeque<Flux<T>>>,
    multi: Arc<MultiSubscriptionSubscriber>,
    delay_error: bool,
    errors: Mutex<Vec<FluxionError>>,
    terminated: AtomicBool,
}

impl<T: Send + Sync + 'static> ConcatState<T> {
    fn advance(self: &Arc<Self>) {
        let next = self.remaining.lock().pop_front();
        match next {
            Some(source) => {
                let inner = Arc::new(ConcatInner {
                    state: Arc::clone(self),
                });
                source.subscribe_arc(inner);
            }
            None => {
                if self.terminated.swap(true, Ordering::AcqRel) {
                    return;
                }
                let errors = core::mem::take(&mut *self.errors.lock());
                if errors.is_empty() {
                    self.downstream.on_complete();
                } else if errors.len() == 1 {
                    self.downstream.on_error(errors.into_iter().next().unwrap());
                } else {
                    self.downstream.on_error(FluxionError::MultipleErrors {
                        count: errors.len(),
                        errors,
                    });
                }
            }
        }
    }
}

struct ConcatInner<T: Send + Sync + 'static> {
    state: Arc<ConcatState<T>>,
}

impl<T: Send + Sync + 'static> Subscriber<T> for ConcatInner<T> {
    fn on_subscribe(&self, subscription: Arc<dyn fluxion_core::subscription::Subscription>) {
        self.state.multi.set_subscription(subscription);
    }

    fn on_next(&self, value: T) {
        self.state.multi.produced(1);
        self.state.downstream.on_next(value);
    }

    fn on_error(&self, error: FluxionError) {
        if self.state.delay_error {
            self.state.errors.lock().push(error);
            self.state.advance();
        } else {
            if self.state.terminated.swap(true, Ordering::AcqRel) {
                return;
            }
            self.state.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        self.state.advance();
    }
}

impl<T: Send + Sync + 'static> CoreSubscriber<T> for ConcatInner<T> {
    fn current_context(&self) -> &Context {
        self.state.downstream.current_context()
    }
}

struct ConcatPublisher<T: Send + Sync + 'static> {
    sources: Mutex<Option<Vec<Flux<T>>>>,
    delay_error: bool,
}

impl<T: Send + Sync + 'static> Publisher<T> for ConcatPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let sources = self.sources.lock().take().unwrap_or_default();
        let state = Arc::new(ConcatState {
            downstream: subscriber,
            remaining: Mutex::new(sources.into_iter().collect()),
            multi: Arc::new(MultiSubscriptionSubscriber::new()),
            delay_error: self.delay_error,
            errors: Mutex::new(Vec::new()),
            terminated: AtomicBool::new(false),
        });
        state.downstream.on_subscribe(Arc::clone(&state.multi) as Arc<dyn fluxion_core::subscription::Subscription>);
        state.advance();
    }
}

/// `concat(sources)`: subscribe to each `Flux` in order, forwarding its
/// values, advancing to the next on `onComplete`. The first error terminates
/// the whole sequence immediately.
pub fn concat<T: Send + Sync + 'static>(sources: Vec<Flux<T>>) -> Flux<T> {
    Flux::from_publisher(ConcatPublisher {
        sources: Mutex::new(Some(sources)),
        delay_error: false,
    })
}

/// `concat` with delayed error: every source still runs to completion (or
/// error) before the accumulated errors (if any) are delivered as one
/// combined [`FluxionError::MultipleErrors`] (or the single error, if only
/// one source failed).
pub fn concat_delay_error<T: Send + Sync + 'static>(sources: Vec<Flux<T>>) -> Flux<T> {
    Flux::from_publisher(ConcatPublisher {
        sources: Mutex::new(Some(sources)),
        delay_error: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_stream_multi::from_array;
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn concat_emits_each_source_in_order() {
        let merged = concat(alloc::vec![
            from_array(alloc::vec![1, 2, 3]),
            from_array(alloc::vec![4, 5]),
        ]);
        let subscriber = TestSubscriber::new();
        merged.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(6, core::time::Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec![1, 2, 3, 4, 5]);
        assert!(subscriber.is_terminated());
    }

    #[test]
    fn concat_honours_partial_demand_across_sources() {
        let merged = concat(alloc::vec![
            from_array(alloc::vec![1, 2, 3]),
            from_array(alloc::vec![4, 5]),
        ]);
        let subscriber = TestSubscriber::new();
        merged.subscribe(subscriber.clone());
        subscriber.request(3);
        assert!(subscriber.wait_for(3, core::time::Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec![1, 2, 3]);
        assert!(!subscriber.is_terminated());
        subscriber.request(2);
        assert!(subscriber.wait_for(5, core::time::Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec![1, 2, 3, 4, 5]);
        assert!(subscriber.is_terminated());
    }
}
