//! Scattered-point weather forecast ingestion (Open-Meteo compatible).
//!
//! Fetches a 24-hour hourly forecast for a fixed set of sample coordinates
//! covering the domain, then pivots the location-major response into
//! time-major scattered observation sets for the interpolator. The feed is
//! a hard dependency: an unreachable endpoint or malformed body aborts the
//! forecast run before anything is written.

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use aq_common::{time, AqError, AqResult};

/// Configuration for the weather feed client.
#[derive(Debug, Clone)]
pub struct WeatherClientConfig {
    /// Forecast endpoint base URL.
    pub base_url: String,
    /// Sample coordinates as (lat, lon), covering the domain.
    pub sample_points: Vec<(f64, f64)>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Forecast horizon in days.
    pub forecast_days: u32,
    /// IANA timezone the feed should index hours in.
    pub timezone: String,
}

impl Default for WeatherClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            sample_points: default_sample_points(),
            timeout_secs: 25,
            forecast_days: 1,
            timezone: "America/Mexico_City".to_string(),
        }
    }
}

/// The calibrated 6×6 sample lattice over the Valle de México.
fn default_sample_points() -> Vec<(f64, f64)> {
    let lats = [19.15, 19.276, 19.402, 19.528, 19.654, 19.78];
    let lons = [-99.39, -99.284, -99.178, -99.072, -98.966, -98.86];
    let mut points = Vec::with_capacity(36);
    for lat in lats {
        for lon in lons {
            points.push((lat, lon));
        }
    }
    points
}

/// Hourly parallel arrays for one sample point, as returned by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct HourlySeries {
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_direction_10m: Vec<Option<f64>>,
}

/// Forecast block for one sample coordinate.
#[derive(Debug, Clone, Deserialize)]
pub struct PointForecast {
    pub latitude: f64,
    pub longitude: f64,
    pub hourly: HourlySeries,
}

// A single-point request returns a bare object instead of an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedResponse {
    Many(Vec<PointForecast>),
    One(PointForecast),
}

/// One scalar attribute sampled at scattered coordinates.
#[derive(Debug, Clone, Default)]
pub struct ScatteredField {
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
    pub values: Vec<f64>,
}

impl ScatteredField {
    fn push(&mut self, lon: f64, lat: f64, value: f64) {
        self.lons.push(lon);
        self.lats.push(lat);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Scattered wind samples; only points carrying both speed and direction.
#[derive(Debug, Clone, Default)]
pub struct ScatteredWind {
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
    pub speed: Vec<f64>,
    pub direction: Vec<f64>,
}

impl ScatteredWind {
    pub fn len(&self) -> usize {
        self.speed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speed.is_empty()
    }
}

/// All scattered observations for one target hour.
#[derive(Debug, Clone, Default)]
pub struct HourObservations {
    pub tmp: ScatteredField,
    pub rh: ScatteredField,
    pub wind: ScatteredWind,
}

/// Pivot the location-major feed response into time-major observation sets.
///
/// Null readings are skipped per field; an hour entry exists as soon as any
/// point reported any field for it. An empty pivot (no usable hours) is a
/// fatal feed error.
pub fn pivot(points: Vec<PointForecast>) -> AqResult<BTreeMap<NaiveDateTime, HourObservations>> {
    let mut hours: BTreeMap<NaiveDateTime, HourObservations> = BTreeMap::new();

    for point in &points {
        let hourly = &point.hourly;
        for (i, stamp) in hourly.time.iter().enumerate() {
            let when = time::parse_feed_time(stamp)?;
            let entry = hours.entry(when).or_default();

            if let Some(Some(v)) = hourly.temperature_2m.get(i) {
                entry.tmp.push(point.longitude, point.latitude, *v);
            }
            if let Some(Some(v)) = hourly.relative_humidity_2m.get(i) {
                entry.rh.push(point.longitude, point.latitude, *v);
            }
            if let (Some(Some(s)), Some(Some(d))) = (
                hourly.wind_speed_10m.get(i),
                hourly.wind_direction_10m.get(i),
            ) {
                entry.wind.lons.push(point.longitude);
                entry.wind.lats.push(point.latitude);
                entry.wind.speed.push(*s);
                entry.wind.direction.push(*d);
            }
        }
    }

    if hours.is_empty() {
        return Err(AqError::WeatherFeed(
            "feed response carried no hourly samples".to_string(),
        ));
    }
    Ok(hours)
}

/// HTTP client for the scattered-point weather feed.
pub struct WeatherClient {
    client: reqwest::Client,
    config: WeatherClientConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherClientConfig) -> AqResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AqError::WeatherFeed(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Fetch the 24 h forecast for every sample point.
    pub async fn fetch(&self) -> AqResult<Vec<PointForecast>> {
        let lat_list = join_coords(self.config.sample_points.iter().map(|p| p.0));
        let lon_list = join_coords(self.config.sample_points.iter().map(|p| p.1));

        debug!(points = self.config.sample_points.len(), "Querying weather feed");
        let forecast_days = self.config.forecast_days.to_string();
        let params = [
            ("latitude", lat_list.as_str()),
            ("longitude", lon_list.as_str()),
            (
                "hourly",
                "temperature_2m,relative_humidity_2m,wind_speed_10m,wind_direction_10m",
            ),
            ("timezone", self.config.timezone.as_str()),
            ("forecast_days", forecast_days.as_str()),
            ("wind_speed_unit", "ms"),
        ];
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| AqError::WeatherFeed(format!("feed unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AqError::WeatherFeed(format!(
                "feed returned HTTP {}",
                status
            )));
        }

        let parsed: FeedResponse = response
            .json()
            .await
            .map_err(|e| AqError::WeatherFeed(format!("malformed feed body: {}", e)))?;

        let points = match parsed {
            FeedResponse::Many(v) => v,
            FeedResponse::One(p) => vec![p],
        };
        info!(points = points.len(), "Weather feed fetched");
        Ok(points)
    }

    /// Fetch and pivot in one step.
    pub async fn fetch_hourly(&self) -> AqResult<BTreeMap<NaiveDateTime, HourObservations>> {
        pivot(self.fetch().await?)
    }
}

fn join_coords(coords: impl Iterator<Item = f64>) -> String {
    coords
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
