//! Per-cell feature vector construction.
//!
//! The feature order is the contract with the trained model artifacts:
//! every artifact carries its own `feature_names` list, and a mismatch with
//! [`FEATURE_SCHEMA`] is a fatal load error, never silently defaulted.

use aq_common::GridCell;

/// Fixed feature schema the regression models were trained against.
pub const FEATURE_SCHEMA: [&str; 13] = [
    "lat",
    "lon",
    "altitude",
    "building_vol",
    "station_numeric",
    "hour_sin",
    "hour_cos",
    "month_sin",
    "month_cos",
    "tmp",
    "rh",
    "wsp",
    "wdr",
];

/// Sentinel categorical station code for virtual (non-observation) cells.
pub const VIRTUAL_STATION_CODE: f64 = -1.0;

/// Interpolated meteorology for one cell and hour.
#[derive(Debug, Clone, Copy)]
pub struct CellMeteorology {
    pub tmp: f64,
    pub rh: f64,
    pub wsp: f64,
    pub wdr: f64,
}

/// Cyclic encodings for hour-of-day and month, avoiding the day/year
/// boundary discontinuities a raw ordinal would introduce.
pub fn temporal_encoding(hour: u32, month: u32) -> [f64; 4] {
    use std::f64::consts::TAU;
    let h = TAU * hour as f64 / 24.0;
    let m = TAU * month as f64 / 12.0;
    [h.sin(), h.cos(), m.sin(), m.cos()]
}

/// Assemble the feature vector for one cell at one target hour.
pub fn build_features(cell: &GridCell, met: &CellMeteorology, hour: u32, month: u32) -> [f64; 13] {
    let [hour_sin, hour_cos, month_sin, month_cos] = temporal_encoding(hour, month);
    [
        cell.lat,
        cell.lon,
        cell.altitude,
        cell.building_vol,
        VIRTUAL_STATION_CODE,
        hour_sin,
        hour_cos,
        month_sin,
        month_cos,
        met.tmp,
        met.rh,
        met.wsp,
        met.wdr,
    ]
}
