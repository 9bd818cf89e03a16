// Copyright 2025 Umberto Gotti
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
pub mod animal;
pub mod error_injection;
pub mod person;
pub mod plant;
pub mod sequenced;
pub mod step_verifier;
pub mod test_data;

// Re-export commonly used test utilities
pub use error_injection::FlakyProducer;
pub use sequenced::Sequenced;
pub use step_verifier::{run_to_completion, CallCounter, TestSubscriber};
pub use test_data::{DataVariant, TestData};
