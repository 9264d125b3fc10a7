//! MeshCache Node Daemon
//!
//! Boots an embedded cache engine: restores persisted state, assembles the
//! invocation pipeline and serves until interrupted. Wire-protocol frontends
//! attach to the engine through the library surface; this binary only hosts
//! the invocation core.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use meshcache::engine::CacheEngine;

// =============================================================================
// CLI Arguments
// =============================================================================

/// MeshCache node - clustered cache engine invocation core
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory for restart-persistent state (omit to run non-persistent)
    #[arg(long, env = "MESHCACHE_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting MeshCache node");
    match &args.state_dir {
        Some(dir) => info!("  State directory: {}", dir.display()),
        None => info!("  State directory: none (non-persistent)"),
    }

    let mut builder = CacheEngine::builder();
    if let Some(dir) = &args.state_dir {
        builder = builder.state_dir(dir);
    }
    let engine = builder.build().context("failed to assemble engine")?;

    engine.start().await.context("failed to start engine")?;
    info!("Node ready, pipeline accepting invocations");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    engine.stop().await.context("failed to stop engine")?;

    let stats = engine.stats().snapshot();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        stores = stats.stores,
        failures = stats.failures,
        "Final pipeline statistics"
    );

    Ok(())
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}
