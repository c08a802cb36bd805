// SPDX-License-Identifier: GPL-3.0-only

use barcode_scanner::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "barcode-scanner")]
#[command(about = "Detect barcodes in a stream of camera frames")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Config file to use instead of ~/.config/barcode-scanner/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed images through the scanner and print detections as JSON lines
    Scan {
        /// Images to use as camera frames, in order
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// How many times to feed the whole image list
        #[arg(short, long, default_value = "1")]
        repeat: u32,

        /// Sensor orientation in degrees (0, 90, 180, 270)
        #[arg(short, long)]
        orientation: Option<i32>,

        /// Delay between frames in milliseconds
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },

    /// Loop over images as a live feed until Ctrl-C
    Watch {
        /// Images to use as camera frames, in order
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(),
    };

    // Initialize logging
    // RUST_LOG takes precedence over the configured filter
    // Examples: RUST_LOG=debug, RUST_LOG=barcode_scanner=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_filter))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan {
            images,
            repeat,
            orientation,
            interval_ms,
        } => {
            if let Some(orientation) = orientation {
                config.default_orientation = orientation;
            }
            if let Some(interval_ms) = interval_ms {
                config.frame_interval_ms = interval_ms;
            }
            cli::scan(&images, repeat, config)
        }
        Commands::Watch { images } => cli::watch(&images, config),
        Commands::Config => cli::print_config(&config),
    }
}
