//! Grid cell and snapshot record types.
//!
//! `GridCell` is the static lattice point; `CellRecord` is the persisted
//! per-cell row of an hourly snapshot. The record field names mirror the
//! stored JSON schema consumed by the map frontend (`"o3 1h"` etc.), so the
//! serde renames are part of the wire contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::index::RiskCategory;
use crate::pollutant::Pollutant;

/// A static evaluation point of the fixed lattice.
///
/// Immutable once the domain is loaded; the identical cell set is shared by
/// every snapshot, which is what makes position-indexed comparison across
/// time valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
    pub building_vol: f64,
    /// Neighborhood name.
    pub col: String,
    /// Municipality.
    pub mun: String,
    /// State.
    pub edo: String,
    /// Resident population assigned to the cell.
    pub pob: f64,
}

/// One cell row of an hourly snapshot (static attributes ⊕ dynamic fields).
///
/// Concentrations are `Option` because realized grids ingested from the live
/// network may omit pollutants a station does not measure; absent values are
/// excluded from city-wide averaging rather than treated as zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellRecord {
    /// Local display timestamp, `YYYY-MM-DD HH:MM`.
    pub timestamp: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub col: String,
    #[serde(default)]
    pub mun: String,
    #[serde(default)]
    pub edo: String,
    #[serde(default)]
    pub pob: f64,
    #[serde(default)]
    pub altitude: f64,
    #[serde(default)]
    pub building_vol: f64,

    pub tmp: f64,
    pub rh: f64,
    pub wsp: f64,
    pub wdr: f64,

    #[serde(rename = "o3 1h", default)]
    pub o3: Option<f64>,
    #[serde(rename = "pm10 12h", default)]
    pub pm10: Option<f64>,
    #[serde(rename = "pm25 12h", default)]
    pub pm25: Option<f64>,
    #[serde(rename = "co 8h", default)]
    pub co: Option<f64>,
    #[serde(rename = "so2 1h", default)]
    pub so2: Option<f64>,

    pub ias: i64,
    pub risk: RiskCategory,
    /// Display name of the dominant pollutant.
    pub dominant: String,
    /// Observation-station name when the cell coincides with one; virtual
    /// cells carry `None`.
    #[serde(default)]
    pub station: Option<String>,
    /// Field → provenance attribution, stored with each record.
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

impl CellRecord {
    /// Concentration for one pollutant, if present.
    pub fn concentration(&self, pollutant: Pollutant) -> Option<f64> {
        match pollutant {
            Pollutant::O3 => self.o3,
            Pollutant::Pm10 => self.pm10,
            Pollutant::Pm25 => self.pm25,
            Pollutant::Co => self.co,
            Pollutant::So2 => self.so2,
        }
    }
}

/// City-wide mean concentration across a snapshot, skipping absent values.
///
/// Returns `None` when no cell carries the pollutant, so the caller can
/// drop the sample instead of averaging zeros.
pub fn grid_mean(records: &[CellRecord], pollutant: Pollutant) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for r in records {
        if let Some(v) = r.concentration(pollutant) {
            sum += v;
            n += 1;
        }
    }
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// One hour of the 24 h city-wide forecast summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Local display timestamp, `YYYY-MM-DD HH:MM`.
    pub timestamp: String,
    pub ias_mean: f64,
    pub risk: RiskCategory,
    pub dominant: String,
}
