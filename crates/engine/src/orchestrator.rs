//! Generation orchestration.
//!
//! The orchestrator turns a writer's prompt into a full provider round
//! trip: load the system prompt and draft from the version store, slice
//! the draft into prioritized context tiers, pack them into the token
//! budget, assemble the message list, stream through the controller, and
//! persist the result.

use crate::controller::{SessionStats, StreamController};
use chrono::Utc;
use draftsmith_config::AppConfig;
use draftsmith_core::error::EngineError;
use draftsmith_core::message::ChatMessage;
use draftsmith_core::provider::Provider;
use draftsmith_core::store::{
    CompressionEvent, CompressionLog, GenerationRecord, HistoryStore, LiveOutputSink, VersionKind,
    VersionStore,
};
use draftsmith_context::{truncate_to_tokens, ContextPacker, ContextTier};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Version-store content id of the writer's system prompt.
const SYSTEM_PROMPT_ID: &str = "system-prompt";
/// Version-store content id of the working draft.
const DRAFT_ID: &str = "draft";
/// Version-store content id under which completed outputs are snapshot.
const GENERATION_OUTPUT_ID: &str = "generation-output";

const TIER_SYSTEM: &str = "System Prompt";
const TIER_RECENT: &str = "Recent Text";
const TIER_HISTORY: &str = "Compressed History";

/// Token cap on the recent-text slice of the draft. Whatever the cap
/// cuts off becomes the lower-priority history tier.
const RECENT_TEXT_TOKENS: usize = 500;

/// Runs orchestrated generations against one configuration.
pub struct Orchestrator {
    config: AppConfig,
    controller: StreamController,
    packer: ContextPacker,
    version_store: Arc<dyn VersionStore>,
    history: Arc<dyn HistoryStore>,
    compression_log: Arc<dyn CompressionLog>,
    live_output: Arc<dyn LiveOutputSink>,
    last_prompt: Mutex<Option<String>>,
}

impl Orchestrator {
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn Provider>,
        version_store: Arc<dyn VersionStore>,
        history: Arc<dyn HistoryStore>,
        compression_log: Arc<dyn CompressionLog>,
        live_output: Arc<dyn LiveOutputSink>,
    ) -> Self {
        let controller =
            StreamController::new(provider, config.base_url.clone(), config.model.clone());
        let packer = ContextPacker::new(config.model.clone());
        Self {
            config,
            controller,
            packer,
            version_store,
            history,
            compression_log,
            live_output,
            last_prompt: Mutex::new(None),
        }
    }

    /// Run one generation for `prompt` and return the full output.
    ///
    /// Streams flushed chunks to the live-output sink as they arrive. On
    /// completion with non-empty output and no session error, the result
    /// is appended to the history store and snapshot as an immutable
    /// `generation-output` version. A stopped session returns its partial
    /// text; a failed one returns the error with all flushed output left
    /// in the sink.
    pub async fn run_generation(&self, prompt: &str) -> Result<String, EngineError> {
        *self.last_prompt.lock().await = Some(prompt.to_string());
        self.generate_once(prompt).await
    }

    /// Re-run the most recent prompt.
    pub async fn regenerate(&self) -> Result<String, EngineError> {
        let prompt = self
            .last_prompt
            .lock()
            .await
            .clone()
            .ok_or(EngineError::NoPriorPrompt)?;
        self.generate_once(&prompt).await
    }

    /// Request cancellation of the active session.
    pub async fn stop(&self) {
        self.controller.stop().await;
    }

    /// Session counters from the underlying controller.
    pub async fn stats(&self) -> SessionStats {
        self.controller.stats().await
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, EngineError> {
        let system_prompt = self
            .load_latest_or_empty(SYSTEM_PROMPT_ID)
            .await?;
        let draft = self.load_latest_or_empty(DRAFT_ID).await?;

        let tiers = self.build_tiers(&system_prompt, &draft);
        let budget = self
            .config
            .max_context_tokens
            .saturating_sub(self.config.generation.max_tokens as usize);

        let packed = self.packer.pack_context(&tiers, budget);
        debug!(
            budget,
            used = packed.total_tokens,
            tiers = packed.packed.len(),
            overflow = packed.overflow,
            "Context packed"
        );

        if packed.overflow {
            self.record_overflow(&tiers, &packed.packed, budget).await;
        }

        let messages = assemble_messages(&packed.packed, prompt);

        // Flushes are forwarded to the live sink through a channel; the
        // controller callback stays synchronous.
        let (flush_tx, mut flush_rx) = mpsc::unbounded_channel::<String>();
        let sink = Arc::clone(&self.live_output);
        let forward = tokio::spawn(async move {
            while let Some(chunk) = flush_rx.recv().await {
                if let Err(e) = sink.append(&chunk).await {
                    warn!(error = %e, "Live output sink rejected a chunk");
                }
            }
        });

        let result = self
            .controller
            .generate(messages, self.config.generation.clone(), move |chunk| {
                let _ = flush_tx.send(chunk.to_string());
            })
            .await;

        // The callback (and its sender) is dropped once generate returns.
        let _ = forward.await;

        let output = result?;
        if !output.is_empty() {
            self.persist(prompt, &output).await?;
        }

        Ok(output)
    }

    async fn load_latest_or_empty(&self, content_id: &str) -> Result<String, EngineError> {
        self.version_store
            .load_latest(content_id)
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| EngineError::Generation(e.to_string()))
    }

    /// Slice the material into prioritized tiers.
    ///
    /// The draft splits at a token cap: the leading slice becomes the
    /// recent-text tier, the rest the history tier. Blank tiers are
    /// omitted entirely rather than packed at zero tokens.
    fn build_tiers(&self, system_prompt: &str, draft: &str) -> Vec<ContextTier> {
        let mut tiers = Vec::new();

        if !system_prompt.trim().is_empty() {
            tiers.push(self.packer.make_tier(TIER_SYSTEM, system_prompt, 100));
        }

        let recent = truncate_to_tokens(draft, RECENT_TEXT_TOKENS, &self.config.model);
        if !recent.trim().is_empty() {
            tiers.push(self.packer.make_tier(TIER_RECENT, recent.as_str(), 90));
        }

        // The history tier is the part of the draft the recent slice cut
        // off. The recent slice is always a prefix of the draft.
        let remainder = draft.strip_prefix(recent.as_str()).unwrap_or("");
        if !remainder.trim().is_empty() {
            tiers.push(self.packer.make_tier(TIER_HISTORY, remainder, 50));
        }

        tiers
    }

    async fn record_overflow(&self, input: &[ContextTier], packed: &[ContextTier], budget: usize) {
        let Some(top) = packed.first() else {
            return;
        };
        let original_tokens = input
            .iter()
            .find(|t| t.label == top.label)
            .map(|t| t.tokens)
            .unwrap_or(top.tokens);

        let event = CompressionEvent {
            source_tier: top.label.clone(),
            target_tier: "Truncated".into(),
            original_tokens,
            compressed_tokens: top.tokens,
            note: format!("{} truncated to fit a {budget}-token budget", top.label),
            timestamp: Utc::now(),
        };

        // Logging failures must not abort the generation.
        if let Err(e) = self.compression_log.append(event).await {
            warn!(error = %e, "Failed to record compression event");
        }
    }

    async fn persist(&self, prompt: &str, output: &str) -> Result<(), EngineError> {
        let stats = self.controller.stats().await;
        let record = GenerationRecord {
            prompt: prompt.to_string(),
            output: output.to_string(),
            model: self.config.model.clone(),
            parameters: self.config.generation.clone(),
            approx_chunks: stats.chunk_count,
            timestamp: Utc::now(),
        };

        self.history
            .append(record)
            .await
            .map_err(|e| EngineError::Generation(e.to_string()))?;
        self.version_store
            .append(GENERATION_OUTPUT_ID, output, VersionKind::Generation)
            .await
            .map_err(|e| EngineError::Generation(e.to_string()))?;

        Ok(())
    }
}

/// Build the provider message list from the packed tiers.
///
/// The system message carries the packed system prompt, with the packed
/// history appended under a marker when present. The user message is the
/// prompt, prefixed with the packed recent text when present.
fn assemble_messages(packed: &[ContextTier], prompt: &str) -> Vec<ChatMessage> {
    let find = |label: &str| {
        packed
            .iter()
            .find(|t| t.label == label)
            .map(|t| t.content.as_str())
    };

    let mut messages = Vec::new();

    let mut system_content = find(TIER_SYSTEM).unwrap_or("").to_string();
    if let Some(history) = find(TIER_HISTORY) {
        if !system_content.is_empty() {
            system_content.push_str("\n\n");
        }
        system_content.push_str("Story so far:\n\n");
        system_content.push_str(history);
    }
    if !system_content.is_empty() {
        messages.push(ChatMessage::system(system_content));
    }

    let user_content = match find(TIER_RECENT) {
        Some(recent) if !recent.is_empty() => {
            format!("Context from recent text:\n\n{recent}\n\n---\n\nPrompt: {prompt}")
        }
        _ => prompt.to_string(),
    };
    messages.push(ChatMessage::user(user_content));

    messages
}
