//! Limelight Janitor - orphaned worker container cleanup
//!
//! Runs one garbage-collection sweep over the worker-container fleet and
//! exits. Scheduling belongs to an external timer (cron, a platform
//! timer trigger); this binary owns nothing but a single pass.

use anyhow::{Context, Result};
use clap::Parser;
use limelight_janitor::{JanitorSweep, RestFleetProvider, StaticCredential};
use limelight_tunnels::WorkerProbe;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Limelight janitor - deletes worker containers that no longer answer pings
#[derive(Parser, Debug)]
#[command(name = "limelight-janitor")]
#[command(about = "Limelight janitor - deletes worker containers that no longer answer pings")]
#[command(version)]
#[command(long_about = r#"
The janitor lists every worker container in the managed resource group,
pings each one's health path with a short timeout, and deletes the ones
that fail to respond. Containers that answer are presumed to be backing
an active session and are left untouched.

EXAMPLES:
  # Sweep the default resource group
  limelight-janitor --management-url https://mgmt.example.dev \
    --management-token $TOKEN

  # Sweep with a longer ping timeout
  limelight-janitor --management-url https://mgmt.example.dev \
    --management-token $TOKEN --ping-timeout-ms 5000

ENVIRONMENT VARIABLES:
  LIMELIGHT_MANAGEMENT_URL    Management API base URL
  LIMELIGHT_MANAGEMENT_TOKEN  Bearer token for the management API
  LIMELIGHT_RESOURCE_GROUP    Resource group holding the containers
"#)]
struct Args {
    /// Management API base URL
    #[arg(long, env = "LIMELIGHT_MANAGEMENT_URL")]
    management_url: String,

    /// Bearer token for the management API
    #[arg(long, env = "LIMELIGHT_MANAGEMENT_TOKEN", hide_env_values = true)]
    management_token: String,

    /// Resource group holding the worker containers
    #[arg(long, env = "LIMELIGHT_RESOURCE_GROUP", default_value = "limelight")]
    resource_group: String,

    /// Ping timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    ping_timeout_ms: u64,

    /// Ping workers over plain HTTP (development only)
    #[arg(long)]
    plaintext: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Setup logging with the specified log level
fn setup_logging(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("Invalid log level: {}", log_level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level)?;

    let provider = Arc::new(RestFleetProvider::new(
        args.management_url,
        args.resource_group,
        Arc::new(StaticCredential(args.management_token)),
    ));
    let probe = WorkerProbe::new()
        .with_timeout(Duration::from_millis(args.ping_timeout_ms))
        .with_plaintext(args.plaintext);

    let report = JanitorSweep::new(provider, probe)
        .run()
        .await
        .context("sweep aborted")?;

    info!(
        visited = report.visited,
        healthy = report.healthy,
        deleted = report.deleted.len(),
        failures = report.failures,
        "janitor run complete"
    );
    Ok(())
}
