//! Error types for the Draftsmith domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; callers that need to mix
//! them (the CLI) do so through `anyhow`.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Errors from the streaming controller and orchestrator.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A session is already generating or settling after a stop.
    #[error("A generation session is already active")]
    Busy,

    /// Endpoint or model name missing — checked before any network call.
    #[error("Connection not configured: {0}")]
    NotConfigured(String),

    /// The stream failed after starting; flushed output is preserved.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// `regenerate()` with no prior prompt.
    #[error("No previous prompt to regenerate from")]
    NoPriorPrompt,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}
