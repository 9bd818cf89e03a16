// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! The summarized multi-source coordinators: `merge`, `concat`, `zip`,
//! `combineLatest`. Each gets the condensed treatment — one concrete
//! state-machine type per operator, without the full state-vector
//! write-up `fluxion-merge`'s `switchOnFirst` gets.

extern crate alloc;

pub mod combine_latest;
pub mod concat;
pub mod merge;
pub mod zip;

pub use combine_latest::combine_latest;
pub use concat::{concat, concat_delay_error};
pub use merge::{merge, merge_delay_error};
pub use zip::zip;
