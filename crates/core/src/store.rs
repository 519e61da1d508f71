//! Collaborator store traits.
//!
//! The engine produces text and metadata; where they land is someone
//! else's concern. These traits are the seams to the persistence and UI
//! layers: a version store for immutable snapshots, a history store for
//! prompt/output records, a compression log for budget degradation
//! events, and a live-output sink fed during streaming.

use crate::error::StoreError;
use crate::message::GenerationParams;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a version snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionKind {
    /// Periodic auto-save
    Auto,
    /// Explicit user save
    Manual,
    /// Output of a completed generation
    Generation,
}

/// One completed generation, as persisted to history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// The prompt the writer submitted
    pub prompt: String,

    /// The full accumulated output
    pub output: String,

    /// Which model produced it
    pub model: String,

    /// Sampling parameters used
    pub parameters: GenerationParams,

    /// Count of provider-delivered increments. An approximate proxy for
    /// output size, not a tokenizer count.
    pub approx_chunks: u64,

    /// When the generation completed
    pub timestamp: DateTime<Utc>,
}

/// A budget degradation event: a tier had to be cut down to fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionEvent {
    /// The tier that was compressed
    pub source_tier: String,

    /// What it became (e.g. "Truncated")
    pub target_tier: String,

    /// Token count before compression
    pub original_tokens: usize,

    /// Token count after compression
    pub compressed_tokens: usize,

    /// Human-readable note
    pub note: String,

    /// When the event occurred
    pub timestamp: DateTime<Utc>,
}

/// Immutable content snapshots keyed by a content id.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// The most recent snapshot for `content_id`, or `None` when no
    /// version exists yet.
    async fn load_latest(&self, content_id: &str)
        -> std::result::Result<Option<String>, StoreError>;

    /// Append a new snapshot. Versions are never rewritten.
    async fn append(
        &self,
        content_id: &str,
        content: &str,
        kind: VersionKind,
    ) -> std::result::Result<(), StoreError>;
}

/// Append-only record of completed generations.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: GenerationRecord) -> std::result::Result<(), StoreError>;

    /// The most recent `limit` records, newest first.
    async fn recent(&self, limit: usize)
        -> std::result::Result<Vec<GenerationRecord>, StoreError>;
}

/// Append-only log of budget degradation events.
#[async_trait]
pub trait CompressionLog: Send + Sync {
    async fn append(&self, event: CompressionEvent) -> std::result::Result<(), StoreError>;

    async fn events(&self) -> std::result::Result<Vec<CompressionEvent>, StoreError>;
}

/// Receives flushed chunks during streaming, in order, one call per flush.
#[async_trait]
pub trait LiveOutputSink: Send + Sync {
    async fn append(&self, chunk: &str) -> std::result::Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_kind_serializes_lowercase() {
        let json = serde_json::to_string(&VersionKind::Generation).unwrap();
        assert_eq!(json, r#""generation""#);
    }

    #[test]
    fn generation_record_roundtrip() {
        let record = GenerationRecord {
            prompt: "Write the opening line.".into(),
            output: "It was a dark and stormy night.".into(),
            model: "gpt-4o-mini".into(),
            parameters: GenerationParams::default(),
            approx_chunks: 7,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: GenerationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.prompt, record.prompt);
        assert_eq!(back.approx_chunks, 7);
    }

    #[test]
    fn compression_event_fields() {
        let event = CompressionEvent {
            source_tier: "System Prompt".into(),
            target_tier: "Truncated".into(),
            original_tokens: 800,
            compressed_tokens: 512,
            note: "System prompt truncated to fit budget".into(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("System Prompt"));
        assert!(json.contains("512"));
    }
}
