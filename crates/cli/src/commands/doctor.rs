//! `draftsmith doctor` — endpoint health check and model listing.

use anyhow::{Context, Result};
use draftsmith_config::AppConfig;
use draftsmith_core::provider::Provider;
use draftsmith_provider::OpenAiCompatProvider;

pub async fn run() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    println!("Endpoint: {}", config.base_url);
    println!(
        "Model:    {}",
        if config.model.is_empty() {
            "(not set)"
        } else {
            &config.model
        }
    );

    let provider = OpenAiCompatProvider::new(
        config.base_url.clone(),
        config.api_key.clone().unwrap_or_default(),
    );

    match provider.health_check().await {
        Ok(true) => println!("Health:   ok"),
        Ok(false) => println!("Health:   endpoint responded with an error status"),
        Err(e) => {
            println!("Health:   unreachable ({e})");
            return Ok(());
        }
    }

    let models = provider
        .list_models()
        .await
        .context("Failed to list models")?;
    if models.is_empty() {
        println!("Models:   none reported");
    } else {
        println!("Models:");
        for model in models {
            let marker = if model == config.model { " (selected)" } else { "" };
            println!("  - {model}{marker}");
        }
    }

    Ok(())
}
