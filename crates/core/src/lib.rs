//! Core domain types and traits for Draftsmith.
//!
//! This crate defines the vocabulary shared by every other crate:
//! chat messages, generation parameters, the `Provider` abstraction over
//! chat-completion backends, the collaborator store traits, and the
//! error taxonomy.

pub mod error;
pub mod message;
pub mod provider;
pub mod store;

pub use error::{EngineError, ProviderError, StoreError};
pub use message::{ChatMessage, GenerationParams, Role};
pub use provider::{Provider, ProviderRequest, StreamChunk};
