// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # Fluxion
//!
//! A reactive-streams runtime for composing asynchronous, back-pressured
//! data pipelines between producers and consumers, in the shape of the
//! [Reactive Streams](https://www.reactive-streams.org/) protocol:
//! `onSubscribe`/`onNext`/`onError`/`onComplete`, driven by `request`/
//! `cancel` demand from the downstream.
//!
//! Two pipeline shapes are provided:
//!
//! - [`Flux<T>`] — a multi-value sequence, built from [`flux`]'s sources
//!   (`just`, `from_array`, `range`, `interval`, ...) and transformed with
//!   its stateless (`map`, `filter`, `take`, ...), stateful (`buffer`,
//!   `window`, `scan`, `distinct`, `sample`), multi-source (`merge`,
//!   `concat`, `zip`, `combine_latest`, `switch_on_first`, `publish`,
//!   `amb`), and lifecycle (`retry`, `repeat`, `timeout`, `on_error_resume`,
//!   `using_when`) operators.
//! - [`Mono<T>`] — an at-most-one-value sequence, built from [`mono`]'s
//!   sources (`just`, `empty`, `error`, `from_callable`, `defer`) and its
//!   `map`/`filter`/`do_on_next`.
//!
//! This crate is the umbrella over the workspace's single-purpose crates:
//! it re-exports their public surface under two namespaces ([`flux`] and
//! [`mono`]) rather than re-implementing anything, since `Flux` and `Mono`
//! share most of their function names (`just`, `map`, `filter`, ...) and
//! would otherwise collide in a single flat namespace.
//!
//! ## Quick start
//!
//! ```
//! use fluxion::prelude::*;
//! use fluxion::flux;
//!
//! let pipeline = flux::filter(flux::map(flux::range(1, 5), |x| x * 2), |x| *x > 4);
//!
//! let subscriber = fluxion_test_utils::step_verifier::TestSubscriber::new();
//! pipeline.subscribe(subscriber.clone());
//! subscriber.request(UNBOUNDED);
//! assert!(subscriber.wait_for(3, core::time::Duration::from_secs(1)));
//! assert_eq!(subscriber.values(), vec![6, 8, 10]);
//! ```

#![allow(clippy::multiple_crate_versions)]

pub use fluxion_error::{FluxionError, Result};
pub use fluxion_stream_core::{Flux, Mono};

/// `Mono<T>`: at-most-one-value sources and the stateless transforms that
/// apply to them (component E/F's `Mono` half).
pub mod mono {
    pub use fluxion_stream_single::{defer, do_on_next, empty, error, filter, from_callable, just};
}

/// `Flux<T>`: multi-value sources, stateless transforms (components E/F),
/// single-source stateful operators (component G), multi-source
/// coordinators (component H), and lifecycle/recovery operators
/// (component I) — everything in this workspace that produces or
/// transforms a `Flux`.
pub mod flux {
    pub use fluxion_merge::{amb, publish, switch_on_first};
    pub use fluxion_ordered_merge::{combine_latest, concat, concat_delay_error, merge, merge_delay_error, zip};
    pub use fluxion_stream::{buffer_boundary, buffer_count, distinct, distinct_by, sample, scan, window_boundary, window_count};
    pub use fluxion_stream_multi::{
        defer, do_on_cancel, do_on_complete, do_on_error, do_on_next, do_on_request, do_on_subscribe,
        empty, error, error_with, filter, from_array, from_callable, from_iterable, hide, ignore,
        interval, just, map, range, skip, take, FluxExt,
    };
    pub use fluxion_exec::{on_error_resume, repeat, retry, retry_times, timeout, timeout_with_fallback, using_when};
}

/// Convenience re-exports for the protocol types every pipeline interacts
/// with regardless of `Flux` vs. `Mono`: the four-callback [`Subscriber`]
/// contract, [`Subscription`]/[`UNBOUNDED`] demand, [`Context`], [`Signal`],
/// and the executor abstraction a time-based or lifecycle operator needs.
pub mod prelude {
    pub use crate::{flux, mono, Flux, FluxionError, Mono};
    pub use fluxion_core::{
        ConditionalSubscriber, Context, CoreSubscriber, FuseableSubscription, Publisher, Signal,
        Subscriber, Subscription, UNBOUNDED,
    };
    pub use fluxion_runtime::scheduler::{CancelHandle, Scheduler};
}
