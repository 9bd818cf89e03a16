// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![cfg_attr(not(feature = "std"), no_std)]
//! Subscription state mixins (component C) and the abstract `Flux`/`Mono`
//! base types with subscribe dispatch (component D).
//!
//! Every concrete operator crate in this workspace (`fluxion-stream-single`,
//! `fluxion-stream-multi`, `fluxion-stream`, `fluxion-ordered-merge`,
//! `fluxion-merge`, `fluxion-exec`) builds its publishers on top of what's
//! here: [`Flux`]/[`Mono`] for the two pipeline shapes, and
//! [`DeferredSubscription`]/[`MultiSubscriptionSubscriber`]/
//! [`SerializedSubscriber`] for the recurring subscription-ownership
//! patterns the design calls out in .C.
//!
//! Rust has no base-class `subscribeOrReturn` hook to override: the
//! distilled design's "operator overrides `subscribeOrReturn`, base decides
//! whether to short-circuit" collapses here into each operator directly
//! implementing [`fluxion_core::Publisher::subscribe`] and deciding for
//! itself whether to subscribe upstream at all (`defer`'s supplier failing,
//! or a scalar source completing synchronously, are both just an operator
//! choosing not to call `upstream.subscribe`).

extern crate alloc;

pub mod deferred_subscription;
pub mod flux;
pub mod half_serializer;
pub mod mono;
pub mod multi_subscription;
pub mod queue_subscription;

pub use deferred_subscription::DeferredSubscription;
pub use flux::Flux;
pub use half_serializer::SerializedSubscriber;
pub use mono::Mono;
pub use multi_subscription::MultiSubscriptionSubscriber;
pub use queue_subscription::{ScalarSubscription, SliceSubscription};
