//! The 24-hour forecast pipeline.
//!
//! Per run: interpolate meteorology per target hour, build features, run
//! the five regression models, apply the learned hourly bias, assemble IAS
//! and risk per cell, and persist one snapshot per hour. Hours are
//! independent units of work processed sequentially; per-cell math inside
//! an hour is data-parallel. A failure mid-run leaves already-written hours
//! in place.

use chrono::{Datelike, NaiveDateTime, Timelike};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

use aq_common::{
    index, time, AqResult, CellRecord, Pollutant, TimelineEntry,
};
use storage::{CalibrationCoefficients, SnapshotStore};

use crate::domain::GridDomain;
use crate::features::{build_features, CellMeteorology};
use crate::interpolate::{interpolate_scalar, interpolate_wind};
use crate::models::PollutantModels;
use crate::weather::HourObservations;

/// Flat-field defaults when a meteorological attribute has no samples at
/// all for an hour.
const DEFAULT_TMP_C: f64 = 20.0;
const DEFAULT_RH_PCT: f64 = 40.0;
const DEFAULT_WSP_MS: f64 = 1.0;

/// Provenance labels written into each record's source attribution.
const SOURCE_WEATHER: &str = "Open-Meteo";
const SOURCE_CHEMISTRY: &str = "AI Forecast";

/// Forecast engine orchestration over a fixed domain and model registry.
pub struct ForecastPipeline {
    domain: Arc<GridDomain>,
    models: PollutantModels,
}

impl ForecastPipeline {
    pub fn new(domain: Arc<GridDomain>, models: PollutantModels) -> Self {
        Self { domain, models }
    }

    /// Compute the full grid for one target hour.
    pub fn build_hour(
        &self,
        when: &NaiveDateTime,
        obs: &HourObservations,
        coefficients: &CalibrationCoefficients,
    ) -> Vec<CellRecord> {
        let cells = self.domain.cells();
        let targets = self.domain.targets();
        let hour = when.hour();
        let month = when.month();

        let tmp = if obs.tmp.is_empty() {
            warn!(hour, "No temperature samples, broadcasting default");
            vec![DEFAULT_TMP_C; targets.len()]
        } else {
            let field = interpolate_scalar(&obs.tmp.lons, &obs.tmp.lats, &obs.tmp.values, &targets);
            if field.degenerate {
                warn!(hour, points = obs.tmp.len(), "Temperature field is degenerate (flat)");
            }
            field.values
        };

        let rh = if obs.rh.is_empty() {
            warn!(hour, "No humidity samples, broadcasting default");
            vec![DEFAULT_RH_PCT; targets.len()]
        } else {
            let field = interpolate_scalar(&obs.rh.lons, &obs.rh.lats, &obs.rh.values, &targets);
            if field.degenerate {
                warn!(hour, points = obs.rh.len(), "Humidity field is degenerate (flat)");
            }
            field.values
        };

        let (wsp, wdr) = if obs.wind.is_empty() {
            warn!(hour, "No wind samples, broadcasting default");
            (vec![DEFAULT_WSP_MS; targets.len()], vec![0.0; targets.len()])
        } else {
            let wind = interpolate_wind(
                &obs.wind.lons,
                &obs.wind.lats,
                &obs.wind.speed,
                &obs.wind.direction,
                &targets,
            );
            if wind.degenerate {
                warn!(hour, points = obs.wind.len(), "Wind field is degenerate (flat)");
            }
            (wind.speed, wind.direction)
        };

        // Hour-of-day bias is constant across the grid for this snapshot.
        let bias: HashMap<Pollutant, f64> = Pollutant::ALL
            .into_iter()
            .map(|p| (p, coefficients.bias(hour, p)))
            .collect();

        let timestamp = time::display_timestamp(when);
        let sources = source_attribution();

        cells
            .par_iter()
            .enumerate()
            .map(|(i, cell)| {
                let met = CellMeteorology {
                    tmp: tmp[i],
                    rh: rh[i],
                    wsp: wsp[i],
                    wdr: wdr[i],
                };
                let features = build_features(cell, &met, hour, month);

                let mut concentrations = [0.0f64; 5];
                for (slot, pollutant) in Pollutant::ALL.into_iter().enumerate() {
                    let raw = match self.models.get(pollutant) {
                        Some(model) => model.predict(&features).max(0.0),
                        None => 0.0,
                    };
                    concentrations[slot] = (raw + bias[&pollutant]).max(0.0);
                }

                let (ias, dominant) = index::worst_sub_index(&concentrations);
                let risk = index::risk_category(ias);

                CellRecord {
                    timestamp: timestamp.clone(),
                    lat: cell.lat,
                    lon: cell.lon,
                    col: cell.col.clone(),
                    mun: cell.mun.clone(),
                    edo: cell.edo.clone(),
                    pob: cell.pob,
                    altitude: cell.altitude,
                    building_vol: cell.building_vol,
                    tmp: round1(met.tmp),
                    rh: met.rh.round(),
                    wsp: round1(met.wsp),
                    wdr: met.wdr.round(),
                    o3: Some(round1(concentrations[0])),
                    pm10: Some(round1(concentrations[1])),
                    pm25: Some(round1(concentrations[2])),
                    co: Some(round2(concentrations[3])),
                    so2: Some(round1(concentrations[4])),
                    ias: ias as i64,
                    risk,
                    dominant: dominant.display_name().to_string(),
                    station: None,
                    sources: sources.clone(),
                }
            })
            .collect()
    }

    /// Run the full horizon: one snapshot per hour, then the timeline
    /// summary. Returns the written snapshot keys in hour order.
    pub async fn run(
        &self,
        weather: &BTreeMap<NaiveDateTime, HourObservations>,
        coefficients: &CalibrationCoefficients,
        store: &SnapshotStore,
    ) -> AqResult<Vec<String>> {
        for missing in self.models.missing() {
            warn!(pollutant = missing.key(), "Running without a model, grid reads zero");
        }
        info!(
            hours = weather.len(),
            cells = self.domain.len(),
            "Starting forecast run"
        );

        let mut written = Vec::with_capacity(weather.len());
        let mut timeline = Vec::with_capacity(weather.len());

        for (when, obs) in weather {
            let records = self.build_hour(when, obs, coefficients);
            let stamp = time::snapshot_stamp(when);
            written.push(store.write_forecast_hour(&stamp, &records).await?);
            timeline.push(summarize_hour(when, &records));
        }

        store.write_timeline(&timeline).await?;
        info!(snapshots = written.len(), "Forecast run completed");
        Ok(written)
    }
}

/// City-wide summary entry for one forecast hour.
pub fn summarize_hour(when: &NaiveDateTime, records: &[CellRecord]) -> TimelineEntry {
    let ias_mean = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| r.ias as f64).sum::<f64>() / records.len() as f64
    };

    // Dominant pollutant of the hour = the most frequent cell dominant.
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in records {
        *counts.entry(r.dominant.as_str()).or_insert(0) += 1;
    }
    let dominant = counts
        .into_iter()
        .max_by_key(|(_, n)| *n)
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| Pollutant::O3.display_name().to_string());

    TimelineEntry {
        timestamp: time::display_timestamp(when),
        ias_mean: round1(ias_mean),
        risk: index::risk_category(ias_mean),
        dominant,
    }
}

fn source_attribution() -> std::collections::BTreeMap<String, String> {
    let mut sources = BTreeMap::new();
    for field in ["tmp", "rh", "wsp", "wdr"] {
        sources.insert(field.to_string(), SOURCE_WEATHER.to_string());
    }
    for p in Pollutant::ALL {
        sources.insert(p.key().to_string(), SOURCE_CHEMISTRY.to_string());
    }
    sources
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
