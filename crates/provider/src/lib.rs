//! Provider implementations for Draftsmith.
//!
//! One implementation covers nearly everything: most LLM servers
//! (LM Studio, Ollama, vLLM, OpenAI, OpenRouter) expose an
//! OpenAI-compatible `/v1/chat/completions` endpoint.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
