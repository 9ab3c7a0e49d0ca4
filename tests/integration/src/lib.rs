//! Integration test utilities for matrix-informant
//!
//! Runs the full lifecycle (intake, dispatch loop, sync task) on an
//! ephemeral port against a `RecordingSession`.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
