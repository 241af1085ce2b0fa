//! Calibration cycle binary.
//!
//! Runs one residual sweep over the rolling window and rewrites the bias
//! coefficient singleton. Must be scheduled as a single non-overlapping
//! daily invocation; concurrent runs would race the read-modify-write.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use calibration::{CalibrationConfig, CalibrationEngine};
use storage::{CoefficientsStore, ObjectStorage, ObjectStorageConfig, SnapshotStore};

#[derive(Parser, Debug)]
#[command(name = "calibrator")]
#[command(about = "Daily residual bias calibration")]
struct Args {
    /// Rolling window length in days
    #[arg(long, default_value_t = 7, env = "CALIBRATION_WINDOW_DAYS")]
    window_days: u32,

    /// Learning rate in (0, 1]; 1.0 replaces the prior bias outright
    #[arg(long, default_value_t = 1.0, env = "CALIBRATION_LEARNING_RATE")]
    learning_rate: f64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(
        window_days = args.window_days,
        learning_rate = args.learning_rate,
        "Starting calibration cycle"
    );

    let storage = Arc::new(ObjectStorage::new(&ObjectStorageConfig::from_env())?);
    let snapshots = SnapshotStore::new(Arc::clone(&storage));
    let coefficients = CoefficientsStore::new(Arc::clone(&storage));

    let engine = CalibrationEngine::new(CalibrationConfig {
        window_days: args.window_days,
        learning_rate: args.learning_rate,
        ..CalibrationConfig::default()
    })?;

    let today = aq_common::time::local_now().date();
    let updated = engine.run(&snapshots, &coefficients, today).await?;

    info!(generated_at = %updated.generated_at, "Calibration cycle finished");
    Ok(())
}
