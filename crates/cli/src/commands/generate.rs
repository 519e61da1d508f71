//! `draftsmith generate` / `draftsmith regen` — run one streamed generation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use draftsmith_config::AppConfig;
use draftsmith_core::error::StoreError;
use draftsmith_core::store::{LiveOutputSink, VersionKind, VersionStore};
use draftsmith_engine::Orchestrator;
use draftsmith_provider::OpenAiCompatProvider;
use draftsmith_store::{InMemoryCompressionLog, InMemoryHistoryStore, InMemoryVersionStore};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Streams flushed chunks straight to stdout.
struct StdoutSink;

#[async_trait]
impl LiveOutputSink for StdoutSink {
    async fn append(&self, chunk: &str) -> std::result::Result<(), StoreError> {
        use std::io::Write;
        print!("{chunk}");
        let _ = std::io::stdout().flush();
        Ok(())
    }
}

pub async fn run(prompt: &str, draft: Option<&Path>, system_prompt: Option<&Path>) -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    if !config.is_connection_configured() {
        anyhow::bail!(
            "No model configured. Run `draftsmith config init` and set `model`, \
             or export DRAFTSMITH_MODEL."
        );
    }

    let orchestrator = Arc::new(build_orchestrator(config, draft, system_prompt).await?);
    save_last_prompt(prompt);

    // Ctrl-C stops the stream; partial output stays on screen.
    let stopper = Arc::clone(&orchestrator);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop().await;
        }
    });

    orchestrator
        .run_generation(prompt)
        .await
        .context("Generation failed")?;
    println!();

    let stats = orchestrator.stats().await;
    info!(
        chunks = stats.chunk_count,
        chars = stats.accumulated_len,
        rate = format!("{:.1}/s", stats.tokens_per_second),
        "Generation complete"
    );

    Ok(())
}

pub async fn regen() -> Result<()> {
    let prompt = load_last_prompt()
        .context("No previous prompt found. Run `draftsmith generate` first.")?;
    info!(prompt = %prompt, "Re-running previous prompt");
    run(&prompt, None, None).await
}

async fn build_orchestrator(
    config: AppConfig,
    draft: Option<&Path>,
    system_prompt: Option<&Path>,
) -> Result<Orchestrator> {
    let provider = Arc::new(OpenAiCompatProvider::new(
        config.base_url.clone(),
        config.api_key.clone().unwrap_or_default(),
    ));

    let versions = Arc::new(InMemoryVersionStore::new());
    if let Some(path) = system_prompt {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read system prompt from {}", path.display()))?;
        versions
            .append("system-prompt", &text, VersionKind::Manual)
            .await?;
    }
    if let Some(path) = draft {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read draft from {}", path.display()))?;
        versions.append("draft", &text, VersionKind::Manual).await?;
    }

    Ok(Orchestrator::new(
        config,
        provider,
        versions,
        Arc::new(InMemoryHistoryStore::new()),
        Arc::new(InMemoryCompressionLog::new()),
        Arc::new(StdoutSink),
    ))
}

fn last_prompt_path() -> std::path::PathBuf {
    AppConfig::config_dir().join("last-prompt")
}

fn save_last_prompt(prompt: &str) {
    let path = last_prompt_path();
    if let Some(dir) = path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    if let Err(e) = std::fs::write(&path, prompt) {
        tracing::debug!(error = %e, "Could not save the prompt for `regen`");
    }
}

fn load_last_prompt() -> Result<String> {
    let path = last_prompt_path();
    let prompt = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if prompt.trim().is_empty() {
        anyhow::bail!("Saved prompt is empty");
    }
    Ok(prompt)
}
