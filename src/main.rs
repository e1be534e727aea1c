// SPDX-License-Identifier: GPL-3.0-only

use camera_capture::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-capture")]
#[command(about = "Acquire a V4L2 camera and capture JPEG stills")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Take a single still
    Snap {
        /// Output file or directory (default: ~/Pictures/camera/capture_TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the JPEG as base64 instead of saving it
        #[arg(long)]
        base64: bool,
    },

    /// Capture stills periodically until Ctrl+C
    Watch {
        /// Seconds between stills
        #[arg(short, long, default_value = "5")]
        interval: u64,

        /// Stop after this many stills
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Show the configuration
    Config {
        /// Overwrite the config file with defaults
        #[arg(long)]
        reset: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let loaded = Config::load();
    let fallback_filter = loaded
        .as_ref()
        .map(|config| config.log_filter.clone())
        .unwrap_or_else(|_| "warn".to_string());

    // Initialize logging
    // RUST_LOG takes precedence over the configured filter
    // Examples: RUST_LOG=debug, RUST_LOG=camera_capture=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&fallback_filter)),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cli::list_cameras(),
        Commands::Snap { output, base64 } => cli::snap(&loaded?, output, base64),
        Commands::Watch { interval, count } => cli::watch(&loaded?, interval, count),
        Commands::Config { reset } => cli::show_config(loaded, reset),
    }
}
