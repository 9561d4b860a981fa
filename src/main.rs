// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use kinect_colordepth::backends::sensor::{ColorImageFormat, DepthImageFormat};
use kinect_colordepth::config::Config;
use kinect_colordepth::constants::DEFAULT_PROBE_TICKS;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "kinect-colordepth")]
#[command(about = "Kinect V1 color/depth alignment viewer")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Configuration file (default: ~/.config/kinect-colordepth/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Color stream preset, overriding the configuration (e.g. RgbResolution1280x960Fps12)
    #[arg(long, global = true)]
    color_format: Option<ColorImageFormat>,

    /// Depth stream preset, overriding the configuration (e.g. Resolution640x480Fps30)
    #[arg(long, global = true)]
    depth_format: Option<DepthImageFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show color and depth side by side in the terminal (default)
    Terminal,

    /// List sensors and their stream formats
    Formats,

    /// Process frames without a UI and report statistics
    Probe {
        /// Number of frame pairs to process
        #[arg(short, long, default_value_t = DEFAULT_PROBE_TICKS)]
        ticks: u64,

        /// Start with masking disabled
        #[arg(long)]
        no_mask: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=kinect_colordepth=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(format) = cli.color_format {
        config.color_format = format;
    }
    if let Some(format) = cli.depth_format {
        config.depth_format = format;
    }

    match cli.command {
        Some(Commands::Formats) => cli::list_formats(&config),
        Some(Commands::Probe { ticks, no_mask }) => cli::probe(config, ticks, no_mask),
        Some(Commands::Terminal) | None => Ok(kinect_colordepth::terminal::run(config)?),
    }
}
