//! Provider trait — the abstraction over chat-completion backends.
//!
//! A Provider knows how to send a message list to an LLM endpoint and
//! stream the reply back as incremental content deltas. The engine calls
//! `stream()` without knowing which backend is behind it.

use crate::error::ProviderError;
use crate::message::{ChatMessage, GenerationParams};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One streaming chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g. "gpt-4o-mini", "llama-3.1-8b-instruct")
    pub model: String,

    /// The assembled message list
    pub messages: Vec<ChatMessage>,

    /// Sampling parameters
    pub params: GenerationParams,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta, if this chunk carried text
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,
}

impl StreamChunk {
    /// A content-bearing chunk.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            done: false,
        }
    }

    /// The terminal chunk.
    pub fn done() -> Self {
        Self {
            content: None,
            done: true,
        }
    }
}

/// The core Provider trait.
///
/// Implementations: OpenAI-compatible endpoints (LM Studio, Ollama, vLLM,
/// OpenAI itself) and scripted mocks in tests.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g. "openai-compat").
    fn name(&self) -> &str;

    /// Open a streaming request and return a receiver of chunks.
    ///
    /// The receiver yields content deltas in arrival order, then exactly
    /// one `done` chunk (or an error). Dropping the receiver aborts the
    /// underlying request.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    >;

    /// List available models for this provider.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
