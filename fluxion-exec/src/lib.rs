// Copyright 2025 Umberto Gotti
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Component I: lifecycle & recovery operators. Each of these wraps a
//! source `Flux` with a
//! [`fluxion_stream_core::multi_subscription::MultiSubscriptionSubscriber`]
//! or a scheduled watchdog to recover from, delay, or bound the upstream's
//! termination, as .I describes.

#[macro_use]
mod logging;
pub mod on_error_resume;
pub mod repeat;
pub mod retry;
pub mod timeout;
pub mod using_when;

pub use on_error_resume::on_error_resume;
pub use repeat::repeat;
pub use retry::{retry, retry_times};
pub use timeout::{timeout, timeout_with_fallback};
pub use using_when::using_when;
