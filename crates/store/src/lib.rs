//! In-memory implementations of the Draftsmith store traits.
//!
//! The persistence format of stored records is outside the engine's
//! scope; these backends keep everything in process memory and serve the
//! CLI and the test suites. Durable backends implement the same traits.

pub mod in_memory;

pub use in_memory::{
    InMemoryCompressionLog, InMemoryHistoryStore, InMemoryLiveOutput, InMemoryVersionStore,
};
