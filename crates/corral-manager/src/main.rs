//! Corral manager daemon.
//!
//! Runs the node lifecycle manager and its HTTP API.

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use corral_manager::{ManagerConfig, ManagerService};

/// Corral node lifecycle manager.
#[derive(Parser, Debug)]
#[command(name = "corrald")]
#[command(about = "Manage the lifecycle of corral cluster nodes")]
#[command(version)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug,hyper=info,tower=info"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    info!("corral manager starting");

    let config = match cli.config.as_deref() {
        Some(path) => ManagerConfig::from_required_file(path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => ManagerConfig::load().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load config, using defaults");
            ManagerConfig::default()
        }),
    };

    info!(
        listen_addr = %config.server.listen_addr,
        queue_capacity = config.manager.queue_capacity,
        configuration_type = ?config.configuration.configuration_type,
        monitored_nodes = config.monitor.nodes.len(),
        "configuration loaded"
    );

    ManagerService::new(config).run().await?;

    Ok(())
}
