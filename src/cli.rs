//! Command-line interface for Grimbrawl
//!
//! Supports both graphical (default) and headless modes.

use clap::Parser;
use std::path::PathBuf;

/// Halloween graveyard brawler
#[derive(Parser, Debug)]
#[command(name = "grimbrawl")]
#[command(about = "Halloween graveyard brawler")]
#[command(version)]
pub struct Args {
    /// Run in headless mode with the specified JSON config file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub headless: Option<PathBuf>,

    /// Output path for the round log (headless mode only)
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Maximum round duration in seconds, overriding the config (headless mode only)
    #[arg(long)]
    pub max_duration: Option<f32>,

    /// Settings file to load instead of ./settings.ron (windowed mode only)
    #[arg(long, value_name = "SETTINGS_FILE")]
    pub settings: Option<PathBuf>,

    /// Enable development conveniences (verbose logging)
    #[arg(long)]
    pub dev: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}
