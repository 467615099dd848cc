//! CLI Module
//!
//! Command-line interface for the Resonar audio engine.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Resonar - control-plane audio engine
#[derive(Parser, Debug)]
#[command(name = "resonar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version, devices and engine limits
    #[command(name = "info")]
    Info {
        /// Output device to open
        #[arg(short, long)]
        device: Option<String>,
    },

    /// List the built-in reverb presets
    #[command(name = "presets")]
    Presets {
        /// Print each preset's properties as JSON
        #[arg(long)]
        json: bool,

        /// Only list one category (default, castle, outdoors)
        #[arg(long)]
        category: Option<String>,
    },

    /// Play a file through the software mixer and report what happened
    #[command(name = "play")]
    Play {
        /// Audio file to play
        file: PathBuf,

        /// Stream the file in chunks instead of loading it whole
        #[arg(short, long)]
        stream: bool,

        /// Loop playback
        #[arg(short, long)]
        looping: bool,

        /// Source gain
        #[arg(short, long, default_value_t = 1.0)]
        gain: f32,

        /// Route the source through a reverb preset
        #[arg(short, long)]
        reverb: Option<String>,

        /// Output device to open
        #[arg(short, long)]
        device: Option<String>,

        /// Stop a looping stream after this many chunks
        #[arg(long, default_value_t = 64)]
        max_chunks: usize,
    },
}
