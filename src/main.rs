//! Fertisense - Fertigation Sensor Intelligence
//!
//! Runs the periodic predictive-maintenance analysis against a local sled
//! history store. Ingestion (MQTT/HTTP) and the dashboard are separate
//! services; this binary only drives the reliability cycle.
//!
//! # Usage
//!
//! ```bash
//! # One analysis pass over the local store
//! fertisense --once
//!
//! # Periodic analysis every 15 minutes
//! fertisense --interval-secs 900
//! ```
//!
//! # Environment Variables
//!
//! - `FERTISENSE_CONFIG`: Path to rig_config.toml (default: ./rig_config.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fertisense::config::{self, RigConfig};
use fertisense::maintenance::MaintenanceScheduler;
use fertisense::reliability::ReliabilityEstimator;
use fertisense::storage::{HistoryStore, SledHistoryStore};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "fertisense")]
#[command(about = "Fertigation Sensor Intelligence - predictive maintenance runner")]
#[command(version)]
struct CliArgs {
    /// Path to the rig configuration TOML (overrides FERTISENSE_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the sled history database
    #[arg(long, default_value = "data/history")]
    data_dir: PathBuf,

    /// Seconds between analysis runs
    #[arg(long, default_value = "900")]
    interval_secs: u64,

    /// Run a single analysis pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = CliArgs::parse();

    let rig_config = match &args.config {
        Some(path) => RigConfig::load_from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RigConfig::load().context("loading rig configuration")?,
    };
    config::init(rig_config);

    let store = SledHistoryStore::open(&args.data_dir)
        .with_context(|| format!("opening history store at {}", args.data_dir.display()))?;
    let store: Arc<dyn HistoryStore> = Arc::new(store);

    let estimator =
        ReliabilityEstimator::new(Arc::clone(&store)).context("building reliability estimator")?;
    let scheduler = MaintenanceScheduler::new(Arc::clone(&store));

    info!(
        rig = %config::get().rig.name,
        sensors = estimator.monitored_sensors().len(),
        "Fertisense analysis runner started"
    );

    if args.once {
        run_once(&estimator, &scheduler);
        return Ok(());
    }

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(args.interval_secs));
    loop {
        interval.tick().await;
        run_once(&estimator, &scheduler);
    }
}

fn run_once(estimator: &ReliabilityEstimator, scheduler: &MaintenanceScheduler) {
    let summary = estimator.run_analysis(scheduler);

    for sensor in &summary.high_risk_sensors {
        warn!(sensor = %sensor, "Sensor at high failure risk");
    }
    info!(
        analyzed = summary.sensors_analyzed,
        scheduled = summary.maintenances_scheduled,
        failed = summary.failures.len(),
        "Analysis cycle finished"
    );
}
