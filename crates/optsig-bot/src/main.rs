//! optsig - Entry Point
//!
//! Replays chat message records (JSON lines) into structured option trading
//! instructions (JSON lines).

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Chat trade-signal parser
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via OPTSIG_CONFIG env var)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON-lines message records; overrides input.path
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// JSON-lines instruction output; overrides output.path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Open-positions snapshot (JSON array); overrides positions.snapshot_path
    #[arg(short, long)]
    positions: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI arg > OPTSIG_CONFIG env var > default
    let mut config = optsig_bot::AppConfig::load(args.config.as_deref())?;
    if args.input.is_some() {
        config.input.path = args.input;
    }
    if args.output.is_some() {
        config.output.path = args.output;
    }
    if args.positions.is_some() {
        config.positions.snapshot_path = args.positions;
    }

    optsig_telemetry::init_logging_with(&config.telemetry.log_level)?;
    info!("Starting optsig v{}", env!("CARGO_PKG_VERSION"));
    info!(
        recent_window = config.resolver.recent_window,
        history_capacity = config.resolver.history_capacity,
        weekly_cutoff_hour = config.resolver.weekly_cutoff_hour,
        "Configuration loaded"
    );

    let app = optsig_bot::Application::new(config)?;
    let stats = app.run().await?;
    info!(emitted = stats.emitted, skipped = stats.skipped, "Done");

    Ok(())
}
