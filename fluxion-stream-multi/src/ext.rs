// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Fluent combinator methods on [`Flux`], so operator chains read left to
//! right (`source.map(f).filter(p).take(10)`) instead of nested free
//! function calls.

use fluxion_error::FluxionError;
use fluxion_stream_core::Flux;

use crate::transforms;

pub trait FluxExt<T: Send + Sync + 'static>: Sized {
    fn map<R: Send + Sync + 'static>(self, mapper: impl Fn(T) -> R + Send + Sync + 'static) -> Flux<R>;
    fn filter(self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Flux<T>;
    fn skip(self, count: u64) -> Flux<T>;
    fn take(self, count: u64) -> Flux<T>;
    fn hide(self) -> Flux<T>;
    fn do_on_next(self, consumer: impl Fn(&T) + Send + Sync + 'static) -> Flux<T>;
    fn do_on_error(self, consumer: impl Fn(&FluxionError) + Send + Sync + 'static) -> Flux<T>;
    fn do_on_complete(self, action: impl Fn() + Send + Sync + 'static) -> Flux<T>;
    fn do_on_subscribe(self, action: impl Fn() + Send + Sync + 'static) -> Flux<T>;
    fn do_on_cancel(self, action: impl Fn() + Send + Sync + 'static) -> Flux<T>;
    fn do_on_request(self, consumer: impl Fn(u64) + Send + Sync + 'static) -> Flux<T>;
}

impl<T: Send + Sync + 'static> FluxExt<T> for Flux<T> {
    fn map<R: Send + Sync + 'static>(self, mapper: impl Fn(T) -> R + Send + Sync + 'static) -> Flux<R> {
        transforms::map(self, mapper)
    }

    fn filter(self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Flux<T> {
        transforms::filter(self, predicate)
    }

    fn skip(self, count: u64) -> Flux<T> {
        transforms::skip(self, count)
    }

    fn take(self, count: u64) -> Flux<T> {
        transforms::take(self, count)
    }

    fn hide(self) -> Flux<T> {
        transforms::hide(self)
    }

    fn do_on_next(self, consumer: impl Fn(&T) + Send + Sync + 'static) -> Flux<T> {
        transforms::do_on_next(self, consumer)
    }

    fn do_on_error(self, consumer: impl Fn(&FluxionError) + Send + Sync + 'static) -> Flux<T> {
        transforms::do_on_error(self, consumer)
    }

    fn do_on_complete(self, action: impl Fn() + Send + Sync + 'static) -> Flux<T> {
        transforms::do_on_complete(self, action)
    }

    fn do_on_subscribe(self, action: impl Fn() + Send + Sync + 'static) -> Flux<T> {
        transforms::do_on_subscribe(self, action)
    }

    fn do_on_cancel(self, action: impl Fn() + Send + Sync + 'static) -> Flux<T> {
        transforms::do_on_cancel(self, action)
    }

    fn do_on_request(self, consumer: impl Fn(u64) + Send + Sync + 'static) -> Flux<T> {
        transforms::do_on_request(self, consumer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::from_array;
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicBool, Ordering};
    use fluxion_core::context::Context;
    use fluxion_core::fluxion_mutex::Mutex;
    use fluxion_core::subscriber::{ContextualSubscriber, Subscriber};
    use fluxion_core::subscription::{Subscription, UNBOUNDED};

    struct Recorder {
        values: Mutex<Vec<i32>>,
        completed: AtomicBool,
    }

    impl Subscriber<i32> for Recorder {
        fn on_subscribe(&self, s: Arc<dyn Subscription>) {
            s.request(UNBOUNDED);
        }
        fn on_next(&self, v: i32) {
            self.values.lock().push(v);
        }
        fn on_error(&self, _e: FluxionError) {}
        fn on_complete(&self) {
            self.completed.store(true, Ordering::SeqCst);
        }
    }

    struct RecorderRef(Arc<Recorder>);
    impl Subscriber<i32> for RecorderRef {
        fn on_subscribe(&self, s: Arc<dyn Subscription>) {
            self.0.on_subscribe(s);
        }
        fn on_next(&self, v: i32) {
            self.0.on_next(v);
        }
        fn on_error(&self, e: FluxionError) {
            self.0.on_error(e);
        }
        fn on_complete(&self) {
            self.0.on_complete();
        }
    }

    #[test]
    fn chained_combinators_compose_left_to_right() {
        let flux = from_array(vec![1, 2, 3, 4, 5, 6])
            .filter(|v| v % 2 == 0)
            .map(|v| v * 10)
            .take(2);
        let recorder = Arc::new(Recorder {
            values: Mutex::new(Vec::new()),
            completed: AtomicBool::new(false),
        });
        let wrapped =
            ContextualSubscriber::new(RecorderRef(Arc::clone(&recorder)), Context::empty());
        flux.subscribe_arc(Arc::new(wrapped));
        assert_eq!(*recorder.values.lock(), vec![20, 40]);
        assert!(recorder.completed.load(Ordering::SeqCst));
    }
}
