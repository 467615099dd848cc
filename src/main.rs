//! Resonar CLI - Control-Plane Audio Engine
//!
//! Command-line interface for the Resonar audio engine.

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use resonar::cli::commands::{self, PlayOptions};
use resonar::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    info!("Resonar v{}", resonar::version());

    match cli.command {
        Some(cmd) => handle_command(cmd, cli.config.as_deref()),
        None => {
            println!("Resonar v{}", resonar::version());
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config_path: Option<&Path>) -> anyhow::Result<()> {
    match cmd {
        Commands::Info { device } => {
            let config = commands::load_config(config_path, device)
                .context("failed to load engine configuration")?;
            commands::show_info(config)?;
        }
        Commands::Presets { json, category } => {
            commands::list_presets(json, category.as_deref())?;
        }
        Commands::Play {
            file,
            stream,
            looping,
            gain,
            reverb,
            device,
            max_chunks,
        } => {
            let config = commands::load_config(config_path, device)
                .context("failed to load engine configuration")?;
            let options = PlayOptions {
                file,
                stream,
                looping,
                gain,
                reverb,
                max_chunks,
            };
            commands::play(config, &options)
                .with_context(|| format!("failed to play {}", options.file.display()))?;
        }
    }
    Ok(())
}
