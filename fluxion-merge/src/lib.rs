// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! The deep-dive multi-source coordinators: `switchOnFirst` (full
//! nine-flag state vector), `publish` (multicast selector), and `amb`
//! (first-signal-wins race).

extern crate alloc;

pub mod amb;
pub mod publish;
pub mod switch_on_first;

pub use amb::amb;
pub use publish::publish;
pub use switch_on_first::switch_on_first;
