//! Testing utilities for warelib
//!
//! This crate provides testing tools including:
//! - Scripted sync and async step sequences with input probes
//! - A recording resetter and shared event log
//! - Prebuilt ware scenarios

pub mod resetter;
pub mod scenarios;
pub mod sequences;
pub mod test_utils;

pub use resetter::{EventLog, RecordingResetter};
pub use scenarios::{ScenarioBuilder, ScenarioWare};
pub use sequences::{
    AsyncCounter, AsyncScripted, Counter, InputProbe, ScriptedSequence, TerminateBehavior,
};
pub use test_utils::init_tracing;
