//! Environment-driven configuration for the point API.

/// Runtime tunables for the query surface.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Live-grid cache time-to-live in seconds.
    pub cache_ttl_secs: u64,
    /// Maximum serviceable distance before a query degrades to a warning.
    pub max_distance_km: f64,
    /// Forecast horizon servable by the timeline endpoint.
    pub horizon_hours: usize,
    /// Default timeline length when the caller does not ask for one.
    pub default_timeline_hours: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            max_distance_km: forecast_engine::lookup::DEFAULT_MAX_DISTANCE_KM,
            horizon_hours: 24,
            default_timeline_hours: 4,
        }
    }
}

impl ApiConfig {
    /// Assemble from `AIR_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_ttl_secs: env_parse("AIR_CACHE_TTL_SECS", defaults.cache_ttl_secs),
            max_distance_km: env_parse("AIR_MAX_DISTANCE_KM", defaults.max_distance_km),
            horizon_hours: env_parse("AIR_HORIZON_HOURS", defaults.horizon_hours),
            default_timeline_hours: env_parse(
                "AIR_TIMELINE_HOURS",
                defaults.default_timeline_hours,
            ),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
