//! Testing utilities for chainflow pipelines.
//!
//! This module provides:
//! - Instrumented stages
//! - Assertions on results
//! - A probe that counts resolutions

mod assertions;
mod mocks;
mod probe;

pub use assertions::{
    assert_failed, assert_failed_with, assert_pending, assert_succeeded_with, ASSERT_TIMEOUT,
};
pub use mocks::{CountingStage, FailingStage, RecordingStage};
pub use probe::OutcomeProbe;
