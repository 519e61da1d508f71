//! Token accounting and context-tier packing.
//!
//! `tokens` counts and truncates text against a BPE encoding; `packer`
//! fits labeled, prioritized text segments into a token budget. Both are
//! pure — no shared mutable state beyond an internal encoder cache — and
//! safe to call repeatedly and concurrently.

pub mod packer;
pub mod tokens;

pub use packer::{ContextPacker, ContextTier, PackResult};
pub use tokens::{count_tokens, truncate_to_tokens};
