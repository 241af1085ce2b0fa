//! Common test fixtures for valle-aire tests.
//!
//! Pre-defined domain cells, snapshot records, and model artifacts that
//! represent common scenarios in the forecast pipeline.

use aq_common::{CellRecord, GridCell, RiskCategory};
use std::collections::BTreeMap;

/// Feature schema the model-artifact fixtures are written against. Kept in
/// sync with the engine's builder by the engine's own tests.
pub const FIXTURE_FEATURE_SCHEMA: [&str; 13] = [
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

/// Domain bounds used by fixtures: the Valle de México rectangle.
pub const DOMAIN_BOUNDS: (f64, f64, f64, f64) = (19.13, 19.80, -99.40, -98.80);

/// A small 3×3 lattice inside the domain.
pub fn domain_cells() -> Vec<GridCell> {
    let lats = [19.25, 19.45, 19.65];
    let lons = [-99.30, -99.10, -98.90];
    let mut cells = Vec::with_capacity(9);
    for lat in lats {
        for lon in lons {
            cells.push(GridCell {
                lat,
                lon,
                altitude: 2240.0,
                building_vol: 0.4,
                col: "Centro".to_string(),
                mun: "Cuauhtémoc".to_string(),
                edo: "Ciudad de México".to_string(),
                pob: 1200.0,
            });
        }
    }
    cells
}

/// A minimal snapshot record at the given coordinate.
pub fn record_at(lat: f64, lon: f64) -> CellRecord {
    CellRecord {
        timestamp: "2025-03-14 10:00".to_string(),
        lat,
        lon,
        col: "Centro".to_string(),
        mun: "Cuauhtémoc".to_string(),
        edo: "Ciudad de México".to_string(),
        pob: 1200.0,
        altitude: 2240.0,
        building_vol: 0.4,
        tmp: 21.0,
        rh: 45.0,
        wsp: 1.5,
        wdr: 90.0,
        o3: Some(40.0),
        pm10: Some(30.0),
        pm25: Some(12.0),
        co: Some(0.6),
        so2: Some(4.0),
        ias: 43,
        risk: RiskCategory::Low,
        dominant: "O3".to_string(),
        station: None,
        sources: BTreeMap::new(),
    }
}

/// A full snapshot over [`domain_cells`] with uniform concentrations.
pub fn snapshot_with(o3: f64, pm10: f64, pm25: f64) -> Vec<CellRecord> {
    domain_cells()
        .into_iter()
        .map(|c| {
            let mut r = record_at(c.lat, c.lon);
            r.o3 = Some(o3);
            r.pm10 = Some(pm10);
            r.pm25 = Some(pm25);
            r
        })
        .collect()
}

/// A single-tree model artifact that always predicts `value`.
pub fn constant_model_artifact(value: f64) -> String {
    format!(
        r#"{{"feature_names": {}, "base_score": 0.0,
            "trees": [{{"nodes": [{{"leaf": {}}}]}}]}}"#,
        serde_json::to_string(&FIXTURE_FEATURE_SCHEMA).unwrap(),
        value
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_sit_inside_domain_bounds() {
        let (min_lat, max_lat, min_lon, max_lon) = DOMAIN_BOUNDS;
        for c in domain_cells() {
            assert!(c.lat >= min_lat && c.lat <= max_lat);
            assert!(c.lon >= min_lon && c.lon <= max_lon);
        }
    }

    #[test]
    fn test_constant_artifact_is_valid_json() {
        let artifact = constant_model_artifact(42.0);
        let parsed: serde_json::Value = serde_json::from_str(&artifact).unwrap();
        assert_eq!(parsed["trees"][0]["nodes"][0]["leaf"], 42.0);
    }
}
