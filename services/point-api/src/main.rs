//! Point API server.
//!
//! Serves nearest-point air-quality queries, the full-grid map export,
//! and raw snapshot passthrough against the cached live grid.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use clap::Parser;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use point_api::handlers;
use point_api::state::AppState;

/// Point API Server
#[derive(Parser, Debug)]
#[command(name = "point-api")]
#[command(about = "Nearest-point air-quality query API")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8086", env = "AIR_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    info!("Starting point API server");

    let state = match AppState::new() {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    let app = Router::new()
        .route("/air", get(handlers::air::air_handler))
        .route("/air/timeline", get(handlers::air::timeline_handler))
        .route("/map", get(handlers::map::map_handler))
        .route("/forecast/:timestamp", get(handlers::map::forecast_handler))
        .route("/history/:timestamp", get(handlers::map::history_handler))
        .route("/health", get(handlers::health::health_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = args.listen.parse().expect("Invalid listen address");
    info!("Point API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server failed");
}
