// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::multiple_crate_versions)]

//! Single-source stateful operators: `buffer`, `window`, `scan`, `distinct`,
//! `sample`. Everything here takes one (or one-plus-a-secondary) `Flux` and
//! carries state across elements — as opposed to the stateless transforms in
//! `fluxion-stream-multi`, which handle one element at a time with nothing
//! remembered between calls.

extern crate alloc;

#[macro_use]
mod logging;

pub mod buffer;
#[cfg(feature = "std")]
pub mod distinct;
pub mod sample;
pub mod scan;
pub mod window;

pub use buffer::{buffer_boundary, buffer_count};
#[cfg(feature = "std")]
pub use distinct::{distinct, distinct_by};
pub use sample::sample;
pub use scan::scan;
pub use window::{window_boundary, window_count};
