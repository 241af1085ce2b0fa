//! Forecast run binary.
//!
//! One invocation produces the full 24-hour horizon: fetch the scattered
//! weather forecast, interpolate per hour, run the pollutant models with
//! the learned bias, and write one snapshot per hour plus the timeline
//! summary. The weather feed is fetched before anything is written, so a
//! dead feed aborts the run with nothing persisted.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use forecast_engine::{ForecastPipeline, GridDomain, PollutantModels, WeatherClient};
use storage::{CoefficientsStore, ObjectStorage, SnapshotStore};

use config::ForecasterConfig;

#[derive(Parser, Debug)]
#[command(name = "forecaster")]
#[command(about = "24-hour air-quality forecast run")]
struct Args {
    /// Skip the learned bias correction (diagnostic runs)
    #[arg(long)]
    no_bias: bool,

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

    info!("Starting forecast run");

    let config = ForecasterConfig::from_env();
    let storage = Arc::new(ObjectStorage::new(&config.storage)?);
    let snapshots = SnapshotStore::new(Arc::clone(&storage));
    let coefficients_store = CoefficientsStore::new(Arc::clone(&storage));

    // Models and domain load before the feed is touched; a schema mismatch
    // or missing lattice aborts here.
    let models = PollutantModels::load(&storage)
        .await
        .context("loading model artifacts")?;
    let domain = Arc::new(GridDomain::load(&config.domain).context("loading grid domain")?);

    let weather = WeatherClient::new(config.weather.clone())?
        .fetch_hourly()
        .await
        .context("fetching weather forecast")?;

    let coefficients = if args.no_bias {
        info!("Bias correction disabled for this run");
        storage::CalibrationCoefficients::zeroed(config.window_days)
    } else {
        coefficients_store.load_or_default(config.window_days).await
    };

    let pipeline = ForecastPipeline::new(domain, models);
    let written = pipeline.run(&weather, &coefficients, &snapshots).await?;

    info!(snapshots = written.len(), "Forecast run finished");
    Ok(())
}
