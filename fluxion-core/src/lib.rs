#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::multiple_crate_versions)]
//! Protocol core for Fluxion: the Reactive Streams contract every operator
//! in this workspace builds on (component A, component D of the design).
//!
//! This crate owns nothing executor- or source-specific. It defines the
//! four-callback [`Subscriber`] contract, the [`Subscription`] a subscribe
//! call installs, the [`Publisher`] factory shape, the [`Context`] that
//! carries hooks upstream, the [`Signal`] tagged variant a few operators
//! need first-class, and the small set of helpers ([`operators`]) every
//! operator uses instead of reimplementing validation/arithmetic/error
//! routing inline.

extern crate alloc;

pub mod cancellation_token;
pub mod conditional;
pub mod context;
pub mod fluxion_mutex;
pub mod fuseable;
#[cfg(feature = "std")]
pub mod hooks;
pub mod operators;
pub mod publisher;
pub mod signal;
pub mod subscriber;
pub mod subscription;

pub use cancellation_token::CancellationToken;
pub use conditional::ConditionalSubscriber;
pub use context::Context;
pub use fuseable::{mode as fusion_mode, FuseableSubscription};
pub use publisher::Publisher;
pub use signal::Signal;
pub use subscriber::{ContextualSubscriber, CoreSubscriber, Subscriber};
pub use subscription::{NoopSubscription, Subscription, UNBOUNDED};
