//! In-memory backends — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use draftsmith_core::error::StoreError;
use draftsmith_core::store::{
    CompressionEvent, CompressionLog, GenerationRecord, HistoryStore, LiveOutputSink, VersionKind,
    VersionStore,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One stored version snapshot.
#[derive(Debug, Clone)]
struct VersionEntry {
    content_id: String,
    content: String,
    kind: VersionKind,
}

/// Version snapshots in insertion order; the last entry per content id
/// is the latest.
#[derive(Default)]
pub struct InMemoryVersionStore {
    entries: Arc<RwLock<Vec<VersionEntry>>>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored versions across all content ids.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// The kind of the latest version for `content_id`.
    pub async fn latest_kind(&self, content_id: &str) -> Option<VersionKind> {
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .find(|e| e.content_id == content_id)
            .map(|e| e.kind)
    }
}

#[async_trait]
impl VersionStore for InMemoryVersionStore {
    async fn load_latest(&self, content_id: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().await;
        // Insertion order is chronological; the last match is the latest.
        Ok(entries
            .iter()
            .rev()
            .find(|e| e.content_id == content_id)
            .map(|e| e.content.clone()))
    }

    async fn append(
        &self,
        content_id: &str,
        content: &str,
        kind: VersionKind,
    ) -> Result<(), StoreError> {
        self.entries.write().await.push(VersionEntry {
            content_id: content_id.to_string(),
            content: content.to_string(),
            kind,
        });
        Ok(())
    }
}

/// Generation records in arrival order.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    records: Arc<RwLock<Vec<GenerationRecord>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, record: GenerationRecord) -> Result<(), StoreError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<GenerationRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}

/// Compression events in arrival order.
#[derive(Default)]
pub struct InMemoryCompressionLog {
    events: Arc<RwLock<Vec<CompressionEvent>>>,
}

impl InMemoryCompressionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompressionLog for InMemoryCompressionLog {
    async fn append(&self, event: CompressionEvent) -> Result<(), StoreError> {
        tracing::debug!(
            source = %event.source_tier,
            original = event.original_tokens,
            compressed = event.compressed_tokens,
            "Compression event"
        );
        self.events.write().await.push(event);
        Ok(())
    }

    async fn events(&self) -> Result<Vec<CompressionEvent>, StoreError> {
        Ok(self.events.read().await.clone())
    }
}

/// Accumulates flushed chunks; `contents()` is their concatenation.
#[derive(Default)]
pub struct InMemoryLiveOutput {
    chunks: Arc<RwLock<Vec<String>>>,
}

impl InMemoryLiveOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// All chunks received so far, in order.
    pub async fn chunks(&self) -> Vec<String> {
        self.chunks.read().await.clone()
    }

    /// The concatenation of every chunk received so far.
    pub async fn contents(&self) -> String {
        self.chunks.read().await.concat()
    }
}

#[async_trait]
impl LiveOutputSink for InMemoryLiveOutput {
    async fn append(&self, chunk: &str) -> Result<(), StoreError> {
        self.chunks.write().await.push(chunk.to_string());
        Ok(())
    }
}
