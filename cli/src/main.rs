//! packgate maintenance tool
//!
//! Runs the packgate startup pipeline over a local data directory and then
//! one maintenance command against it.
//!
//! Usage:
//!   packgate status
//!   packgate --data-dir ./state purchase pack_01
//!   packgate --config packgate.json restore

use anyhow::{Context, Result};
use clap::Parser;
use packgate_cli::{Command, Session};
use packgate_orchestrator::PackgateConfig;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "packgate")]
#[command(about = "Inspect and repair packgate entitlements")]
struct Args {
    /// Path to a JSON config file (catalog, orchestrator budgets, validator)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding entitlement state [default: platform data dir]/packgate
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = match &args.config {
        Some(path) => PackgateConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PackgateConfig::default(),
    };
    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .context("no platform data directory, pass --data-dir")?
            .join("packgate"),
    };
    debug!("data directory: {}", data_dir.display());

    let session = Session::open(&data_dir, config).await?;
    info!(stage = %session.orchestrator().stage(), "packgate ready");

    let report = session.run(&args.command).await?;
    println!("{report}");
    Ok(())
}
