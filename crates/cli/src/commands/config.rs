//! `draftsmith config` — inspect and initialize configuration.

use anyhow::{Context, Result};
use draftsmith_config::AppConfig;

/// Print the effective configuration. The API key is redacted.
pub fn show() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    println!("{config:#?}");
    Ok(())
}

/// Write a default config file unless one already exists.
pub fn init() -> Result<()> {
    let dir = AppConfig::config_dir();
    let path = dir.join("config.toml");

    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    std::fs::write(&path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote default config to {}", path.display());
    println!("Set `model` before running `draftsmith generate`.");
    Ok(())
}
