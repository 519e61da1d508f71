//! The `draftsmith` command-line interface.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "draftsmith",
    version,
    about = "Token-budgeted streaming generation for long-form writing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one generation and stream the output to stdout
    Generate {
        /// The writing prompt
        prompt: String,

        /// File holding the working draft, packed as context
        #[arg(long)]
        draft: Option<PathBuf>,

        /// File holding the system prompt
        #[arg(long)]
        system_prompt: Option<PathBuf>,
    },

    /// Re-run the most recent prompt
    Regen,

    /// Check endpoint health and list available models
    Doctor,

    /// Inspect or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate {
            prompt,
            draft,
            system_prompt,
        } => commands::generate::run(&prompt, draft.as_deref(), system_prompt.as_deref()).await,
        Commands::Regen => commands::generate::regen().await,
        Commands::Doctor => commands::doctor::run().await,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(),
            ConfigAction::Init => commands::config::init(),
        },
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
