// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![cfg_attr(not(feature = "std"), no_std)]
//! `Flux<T>`: multi-value sources and stateless transforms (components E
//! and F).
//!
//! Every public constructor here returns a [`fluxion_stream_core::Flux`];
//! the [`ext::FluxExt`] trait adds the fluent `.map(...).filter(...)` method
//! chain on top of the free functions in [`sources`]/[`transforms`] so a
//! pipeline reads left to right the way the design's method-chaining API
//! does.

extern crate alloc;

pub mod ext;
pub mod sources;
pub mod transforms;

pub use ext::FluxExt;
pub use sources::{
    defer, empty, error, error_with, from_array, from_callable, from_iterable, interval, just, range,
};
pub use transforms::{
    do_on_cancel, do_on_complete, do_on_error, do_on_next, do_on_request, do_on_subscribe, filter,
    hide, ignore, map, skip, take,
};
