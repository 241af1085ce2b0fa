//! Environment-driven configuration for the forecaster.

use std::path::PathBuf;

use forecast_engine::{DomainPaths, WeatherClientConfig};
use storage::ObjectStorageConfig;

/// Full configuration of one forecast run.
#[derive(Debug, Clone)]
pub struct ForecasterConfig {
    pub storage: ObjectStorageConfig,
    pub weather: WeatherClientConfig,
    pub domain: DomainPaths,
    /// Window length recorded when starting from zero-bias coefficients.
    pub window_days: u32,
}

impl ForecasterConfig {
    /// Assemble from environment variables, falling back to the packaged
    /// geodata layout.
    pub fn from_env() -> Self {
        let mut weather = WeatherClientConfig::default();
        if let Ok(url) = std::env::var("WEATHER_FEED_URL") {
            weather.base_url = url;
        }

        let domain = DomainPaths {
            grid_path: env_path("GRID_PATH", "geodata/malla_valle_mexico.geojson"),
            admin_path: Some(env_path("ADMIN_PATH", "geodata/grid_colonias_db.json")),
            buildings_path: Some(env_path("BUILDINGS_PATH", "geodata/capa_edificios_v2.json")),
        };

        Self {
            storage: ObjectStorageConfig::from_env(),
            weather,
            domain,
            window_days: std::env::var("CALIBRATION_WINDOW_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(7),
        }
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}
