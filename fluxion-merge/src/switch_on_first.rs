// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `switchOnFirst`: the user's transformer sees the
//! upstream's first signal eagerly, then gets a re-exposed `Flux` of
//! everything after it to subscribe to (at most once).
//!
//! The bit vector below matches the design's state table field-for-field;
//! every transition is a monotonic-OR CAS on a single `AtomicU32` so the
//! pre-state a transition observed is always available to decide which
//! side effects to run, without a lock around the whole state machine.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

use fluxion_core::context::Context;
use fluxion_core::fluxion_mutex::Mutex;
use fluxion_core::publisher::Publisher;
use fluxion_core::signal::Signal;
use fluxion_core::subscriber::{CoreSubscriber, Subscriber};
use fluxion_core::subscription::Subscription;
use fluxion_error::FluxionError;
use fluxion_stream_core::Flux;

mod bits {
    pub const FIRST_RECEIVED: u32 = 1 << 0;
    pub const INBOUND_SUBSCRIBED_ONCE: u32 = 1 << 1;
    pub const INBOUND_SUBSCRIBER_SET: u32 = 1 << 2;
    pub const INBOUND_REQUESTED_ONCE: u32 = 1 << 3;
    /// Set once the transformer has been invoked with the first signal.
    /// Informational only — the buffered clone's own `Option::take` is
    /// what guards against a double discard, not this bit.
    pub const FIRST_VALUE_SENT: u32 = 1 << 4;
    pub const INBOUND_CANCELLED: u32 = 1 << 5;
    pub const INBOUND_TERMINATED: u32 = 1 << 6;
    pub const OUTBOUND_SUBSCRIBED: u32 = 1 << 7;
    pub const OUTBOUND_CANCELLED: u32 = 1 << 8;
    pub const OUTBOUND_TERMINATED: u32 = 1 << 9;
}

struct State<T: Clone + Send + Sync + 'static> {
    vector: AtomicU32,
    main_subscription: Mutex<Option<Arc<dyn Subscription>>>,
    first_signal: Mutex<Option<Signal<T>>>,
    inbound_subscriber: Mutex<Option<Arc<dyn CoreSubscriber<T>>>>,
    pending_terminal: Mutex<Option<Signal<T>>>,
    cancel_source_on_complete: bool,
}

impl<T: Clone + Send + Sync + 'static> State<T> {
    /// Sets `bit` if not already set. Returns the pre-state.
    fn try_set(&self, bit: u32) -> u32 {
        let mut current = self.vector.load(Ordering::Acquire);
        loop {
            if current & bit != 0 {
                return current;
            }
            match self.vector.compare_exchange_weak(
                current,
                current | bit,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(pre) => return pre,
                Err(observed) => current = observed,
            }
        }
    }

    fn has(&self, bit: u32) -> bool {
        self.vector.load(Ordering::Acquire) & bit != 0
    }
}

/// The re-exposed "everything after the first signal" `Flux<T>` handed to
/// the transformer function.
struct InboundPublisher<T: Clone + Send + Sync + 'static> {
    state: Arc<State<T>>,
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for InboundPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
        let pre = self.state.try_set(bits::INBOUND_SUBSCRIBED_ONCE);
        if pre & bits::INBOUND_SUBSCRIBED_ONCE != 0 {
            // Exactly one inner subscriber is allowed.
            subscriber.on_subscribe(Arc::new(fluxion_core::subscription::NoopSubscription));
            subscriber.on_error(FluxionError::invalid_state(
                "switchOnFirst: inner Flux already subscribed",
            ));
            return;
        }
        *self.state.inbound_subscriber.lock() = Some(Arc::clone(&subscriber));
        self.state.try_set(bits::INBOUND_SUBSCRIBER_SET);

        if let Some(terminal) = self.state.pending_terminal.lock().take() {
            self.state.try_set(bits::INBOUND_TERMINATED);
            deliver_terminal(&subscriber, terminal);
            return;
        }

        let subscription = Arc::new(InboundSubscription {
            state: Arc::clone(&self.state),
        });
        subscriber.on_subscribe(subscription);
    }
}

fn deliver_terminal<T>(subscriber: &Arc<dyn CoreSubscriber<T>>, signal: Signal<T>) {
    subscriber.on_subscribe(Arc::new(fluxion_core::subscription::NoopSubscription));
    match signal {
        Signal::Complete => subscriber.on_complete(),
        Signal::Error(e) => subscriber.on_error(e),
        Signal::Next(_) => unreachable!("only terminal signals are buffered"),
    }
}

struct InboundSubscription<T: Clone + Send + Sync + 'static> {
    state: Arc<State<T>>,
}

impl<T: Clone + Send + Sync + 'static> Subscription for InboundSubscription<T> {
    fn request(&self, n: u64) {
        self.state.try_set(bits::INBOUND_REQUESTED_ONCE);
        if let Some(main) = self.state.main_subscription.lock().clone() {
            main.request(n);
        }
    }

    fn cancel(&self) {
        let pre = self.state.try_set(bits::INBOUND_CANCELLED);
        if pre & bits::INBOUND_CANCELLED != 0 {
            return;
        }
        // The transformer is handed the first signal directly (by value);
        // `first_signal` only holds a backup clone for this path, in case
        // the inbound subscription is cancelled before anyone else claims
        // it. `take()` makes this idempotent on its own — a second cancel
        // finds `None` and does nothing.
        if let Some(Signal::Next(value)) = self.state.first_signal.lock().take() {
            let ctx = self
                .state
                .inbound_subscriber
                .lock()
                .as_ref()
                .map(|s| s.current_context().clone());
            if let Some(ctx) = ctx {
                fluxion_core::operators::on_discard(&ctx, value);
            }
        }
        if let Some(main) = self.state.main_subscription.lock().clone() {
            main.cancel();
        }
    }
}

/// The `Subscriber<T>` this operator presents to the real upstream.
struct MainSubscriber<T: Clone + Send + Sync + 'static, R: Send + Sync + 'static> {
    state: Arc<State<T>>,
    transformer: Arc<dyn Fn(Signal<T>, Flux<T>) -> Flux<R> + Send + Sync>,
    downstream: Arc<dyn CoreSubscriber<R>>,
}

impl<T: Clone + Send + Sync + 'static, R: Send + Sync + 'static> MainSubscriber<T, R> {
    fn dispatch_first(&self, signal: Signal<T>) {
        *self.state.first_signal.lock() = Some(signal.clone());
        let inbound = Flux::from_publisher(InboundPublisher {
            state: Arc::clone(&self.state),
        });
        self.state.try_set(bits::FIRST_VALUE_SENT);
        let outbound = (self.transformer)(signal, inbound);
        self.state.try_set(bits::OUTBOUND_SUBSCRIBED);
        let wrapped = Arc::new(OutboundSubscriber {
            state: Arc::clone(&self.state),
            downstream: Arc::clone(&self.downstream),
        });
        outbound.subscribe_arc(wrapped);
    }
}

impl<T: Clone + Send + Sync + 'static, R: Send + Sync + 'static> Subscriber<T> for MainSubscriber<T, R> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.state.main_subscription.lock() = Some(subscription.clone());
        subscription.request(1);
    }

    fn on_next(&self, value: T) {
        let pre = self.state.try_set(bits::FIRST_RECEIVED);
        if pre & bits::FIRST_RECEIVED == 0 {
            self.dispatch_first(Signal::Next(value));
            return;
        }
        if self.state.has(bits::INBOUND_TERMINATED) || self.state.has(bits::INBOUND_CANCELLED) {
            if let Some(sub) = self.state.inbound_subscriber.lock().as_ref() {
                fluxion_core::operators::on_next_dropped(sub.current_context(), value);
            }
            return;
        }
        match self.state.inbound_subscriber.lock().clone() {
            Some(sub) => sub.on_next(value),
            None => {
                // Backpressure makes this unreachable in practice: no
                // further request ever reaches main until the inner
                // subscriber has requested at least one item.
            }
        }
    }

    fn on_error(&self, error: FluxionError) {
        let pre = self.state.try_set(bits::FIRST_RECEIVED);
        if pre & bits::FIRST_RECEIVED == 0 {
            self.dispatch_first(Signal::Error(error));
            return;
        }
        self.state.try_set(bits::INBOUND_TERMINATED);
        match self.state.inbound_subscriber.lock().clone() {
            Some(sub) => sub.on_error(error),
            None => *self.state.pending_terminal.lock() = Some(Signal::Error(error)),
        }
    }

    fn on_complete(&self) {
        let pre = self.state.try_set(bits::FIRST_RECEIVED);
        if pre & bits::FIRST_RECEIVED == 0 {
            self.dispatch_first(Signal::Complete);
            return;
        }
        self.state.try_set(bits::INBOUND_TERMINATED);
        match self.state.inbound_subscriber.lock().clone() {
            Some(sub) => sub.on_complete(),
            None => *self.state.pending_terminal.lock() = Some(Signal::Complete),
        }
    }
}

impl<T: Clone + Send + Sync + 'static, R: Send + Sync + 'static> CoreSubscriber<T> for MainSubscriber<T, R> {
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

/// Wraps the downstream the transformer's outbound `Flux` is subscribed
/// with, so an outbound cancel before the inbound has terminated also
/// cancels the inbound,
/// and, when `cancel_source_on_complete` is set, an outbound completion
/// without the user ever subscribing to the inbound Flux still releases
/// the main upstream.
struct OutboundSubscriber<T: Clone + Send + Sync + 'static, R: Send + Sync + 'static> {
    state: Arc<State<T>>,
    downstream: Arc<dyn CoreSubscriber<R>>,
}

impl<T: Clone + Send + Sync + 'static, R: Send + Sync + 'static> Subscriber<R> for OutboundSubscriber<T, R> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let wrapped = Arc::new(OutboundSubscription {
            state: Arc::clone(&self.state),
            inner: subscription,
        });
        self.downstream.on_subscribe(wrapped);
    }

    fn on_next(&self, value: R) {
        self.downstream.on_next(value);
    }

    fn on_error(&self, error: FluxionError) {
        self.state.try_set(bits::OUTBOUND_TERMINATED);
        self.release_main_if_needed();
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.state.try_set(bits::OUTBOUND_TERMINATED);
        self.release_main_if_needed();
        self.downstream.on_complete();
    }
}

impl<T: Clone + Send + Sync + 'static, R: Send + Sync + 'static> OutboundSubscriber<T, R> {
    fn release_main_if_needed(&self) {
        if self.state.cancel_source_on_complete && !self.state.has(bits::INBOUND_SUBSCRIBED_ONCE) {
            if let Some(main) = self.state.main_subscription.lock().clone() {
                main.cancel();
            }
        }
    }
}

impl<T: Clone + Send + Sync + 'static, R: Send + Sync + 'static> CoreSubscriber<R> for OutboundSubscriber<T, R> {
    fn current_context(&self) -> &Context {
        self.downstream.current_context()
    }
}

struct OutboundSubscription<T: Clone + Send + Sync + 'static> {
    state: Arc<State<T>>,
    inner: Arc<dyn Subscription>,
}

impl<T: Clone + Send + Sync + 'static> Subscription for OutboundSubscription<T> {
    fn request(&self, n: u64) {
        self.inner.request(n);
    }

    fn cancel(&self) {
        let pre = self.state.try_set(bits::OUTBOUND_CANCELLED);
        if pre & bits::OUTBOUND_CANCELLED != 0 {
            return;
        }
        self.inner.cancel();
        if !self.state.has(bits::INBOUND_TERMINATED) {
            if let Some(main) = self.state.main_subscription.lock().clone() {
                main.cancel();
            }
            if let Some(sub) = self.state.inbound_subscriber.lock().clone() {
                sub.on_error(FluxionError::invalid_state(
                    "switchOnFirst: outbound cancelled before inbound terminated",
                ));
            }
        }
    }
}

struct SwitchOnFirstPublisher<T: Clone + Send + Sync + 'static, R: Send + Sync + 'static> {
    upstream: Flux<T>,
    transformer: Arc<dyn Fn(Signal<T>, Flux<T>) -> Flux<R> + Send + Sync>,
    cancel_source_on_complete: bool,
}

impl<T: Clone + Send + Sync + 'static, R: Send + Sync + 'static> Publisher<R> for SwitchOnFirstPublisher<T, R> {
    fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
        let state = Arc::new(State {
            vector: AtomicU32::new(0),
            main_subscription: Mutex::new(None),
            first_signal: Mutex::new(None),
            inbound_subscriber: Mutex::new(None),
            pending_terminal: Mutex::new(None),
            cancel_source_on_complete: self.cancel_source_on_complete,
        });
        let main = Arc::new(MainSubscriber {
            state,
            transformer: Arc::clone(&self.transformer),
            downstream: subscriber,
        });
        self.upstream.subscribe_arc(main);
    }
}

/// `switchOnFirst(upstream, transformer, cancelSourceOnComplete)`.
///
/// `transformer` receives the first signal of `upstream` (as a
/// [`Signal<T>`], so it can distinguish an empty or erroring source from a
/// genuine first value) plus a `Flux<T>` of everything after it, and
/// returns the `Flux<R>` actually delivered downstream.
pub fn switch_on_first<T, R>(
    upstream: Flux<T>,
    transformer: impl Fn(Signal<T>, Flux<T>) -> Flux<R> + Send + Sync + 'static,
    cancel_source_on_complete: bool,
) -> Flux<R>
where
    T: Clone + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    Flux::from_publisher(SwitchOnFirstPublisher {
        upstream,
        transformer: Arc::new(transformer),
        cancel_source_on_complete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_stream_multi::{from_array, map};
    use fluxion_test_utils::step_verifier::TestSubscriber;

    #[test]
    fn switch_on_first_transforms_tail_and_prepends_the_first() {
        let upstream = from_array(alloc::vec!["A", "B", "C"]);
        let flux = switch_on_first(
            upstream,
            |sig, inner: Flux<&'static str>| {
                let upper = map(inner, |s: &'static str| s);
                let first_lower = match sig {
                    Signal::Next(v) => v,
                    _ => "",
                };
                start_with(upper, first_lower)
            },
            false,
        );
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(4, core::time::Duration::from_secs(1)));
        assert_eq!(subscriber.values(), alloc::vec!["a", "B", "C"]);
        assert!(subscriber.is_terminated());
    }

    #[test]
    fn switch_on_first_discards_first_value_on_immediate_inbound_cancel() {
        use core::sync::atomic::{AtomicBool, Ordering};

        let discarded = Arc::new(AtomicBool::new(false));
        let discarded_for_hook = Arc::clone(&discarded);
        let ctx = Context::empty().with_on_discard(Arc::new(move |_| {
            discarded_for_hook.store(true, Ordering::SeqCst);
        }));

        let upstream = from_array(alloc::vec!["A", "B"]);
        let flux = switch_on_first(
            upstream,
            move |_sig, inner: Flux<&'static str>| {
                let inbound_subscriber = TestSubscriber::with_context(ctx.clone());
                inner.subscribe_arc(Arc::new(inbound_subscriber.clone()));
                inbound_subscriber.cancel();
                fluxion_stream_multi::just("done")
            },
            false,
        );
        let subscriber = TestSubscriber::new();
        flux.subscribe(subscriber.clone());
        subscriber.request(fluxion_core::subscription::UNBOUNDED);
        assert!(subscriber.wait_for(1, core::time::Duration::from_secs(1)));
        assert!(discarded.load(Ordering::SeqCst));
    }

    // A tiny local `startWith` so the test above doesn't need to pull in
    // `fluxion-stream`'s real operator (that crate depends on this one's
    // sibling, not the other way around).
    pub(crate) fn start_with<T: Send + Sync + Clone + 'static>(
        rest: Flux<T>,
        first: T,
    ) -> Flux<T> {
        fluxion_ordered_merge::concat(alloc::vec![
            fluxion_stream_multi::just(first),
            rest,
        ])
    }
}
