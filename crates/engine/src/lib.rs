//! The Draftsmith generation engine.
//!
//! `controller` owns one streaming session at a time: it drives the
//! provider stream, coalesces deltas into flushes, and tracks phase,
//! counters, and the last error. `orchestrator` sits above it: packs the
//! writer's material into the context budget, assembles the message list,
//! and persists the result.

pub mod controller;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use controller::{Phase, SessionStats, StreamController};
pub use orchestrator::Orchestrator;
