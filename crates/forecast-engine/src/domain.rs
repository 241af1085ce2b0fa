//! Static grid domain: the fixed lattice of evaluation points.
//!
//! Loaded once at cold start and immutable for the process lifetime. The
//! base lattice is a GeoJSON point collection; two optional enrichment
//! layers (administrative metadata and building volume) are merged in by
//! rounded-coordinate keys. A missing enrichment layer degrades to defaults;
//! a missing base lattice is fatal.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use aq_common::{AqError, AqResult, GridCell};

/// Altitude assigned when the lattice point carries no elevation property.
const DEFAULT_ALTITUDE_M: f64 = 2240.0;

/// File locations for the domain definition and its enrichment layers.
#[derive(Debug, Clone)]
pub struct DomainPaths {
    /// Base lattice, GeoJSON point collection. Required.
    pub grid_path: PathBuf,
    /// Administrative layer (col/mun/edo/pob per point). Optional.
    pub admin_path: Option<PathBuf>,
    /// Building-volume layer. Optional.
    pub buildings_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// [lon, lat]
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    elevation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AdminEntry {
    lat: f64,
    lon: f64,
    #[serde(default)]
    col: Option<String>,
    #[serde(default)]
    mun: Option<String>,
    #[serde(default)]
    edo: Option<String>,
    #[serde(default)]
    pob: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BuildingEntry {
    lat: f64,
    lon: f64,
    #[serde(default)]
    building_vol: Option<f64>,
}

/// The fixed lattice of evaluation points, shared by every snapshot.
#[derive(Debug, Clone)]
pub struct GridDomain {
    cells: Vec<GridCell>,
}

/// Coordinates are matched across layers at 5-decimal precision (~1 m).
fn round5(v: f64) -> f64 {
    (v * 1e5).round() / 1e5
}

fn coord_key(lat: f64, lon: f64) -> (i64, i64) {
    ((lat * 1e5).round() as i64, (lon * 1e5).round() as i64)
}

impl GridDomain {
    /// Load the lattice and merge the enrichment layers.
    pub fn load(paths: &DomainPaths) -> AqResult<Self> {
        let raw = fs::read_to_string(&paths.grid_path).map_err(|e| {
            AqError::GridDefinition(format!(
                "cannot read base lattice {}: {}",
                paths.grid_path.display(),
                e
            ))
        })?;
        let collection: FeatureCollection = serde_json::from_str(&raw).map_err(|e| {
            AqError::GridDefinition(format!(
                "malformed base lattice {}: {}",
                paths.grid_path.display(),
                e
            ))
        })?;
        if collection.features.is_empty() {
            return Err(AqError::GridDefinition(
                "base lattice contains no points".to_string(),
            ));
        }

        let admin = Self::load_admin(paths);
        let buildings = Self::load_buildings(paths);

        let mut cells = Vec::with_capacity(collection.features.len());
        for feature in &collection.features {
            let coords = &feature.geometry.coordinates;
            if coords.len() < 2 {
                return Err(AqError::GridDefinition(
                    "lattice feature without [lon, lat] coordinates".to_string(),
                ));
            }
            let lon = round5(coords[0]);
            let lat = round5(coords[1]);
            let key = coord_key(lat, lon);

            let (col, mun, edo, pob) = match admin.as_ref().and_then(|m| m.get(&key)) {
                Some(a) => (
                    a.col.clone().unwrap_or_else(|| "Zona Federal".to_string()),
                    a.mun
                        .clone()
                        .unwrap_or_else(|| "Valle de México".to_string()),
                    a.edo.clone().unwrap_or_default(),
                    a.pob.unwrap_or(0.0),
                ),
                None => (
                    "Zona Federal".to_string(),
                    "Valle de México".to_string(),
                    String::new(),
                    0.0,
                ),
            };

            let building_vol = buildings
                .as_ref()
                .and_then(|m| m.get(&key).copied())
                .unwrap_or(0.0);

            cells.push(GridCell {
                lat,
                lon,
                altitude: feature.properties.elevation.unwrap_or(DEFAULT_ALTITUDE_M),
                building_vol,
                col,
                mun,
                edo,
                pob,
            });
        }

        info!(cells = cells.len(), "Grid domain loaded");
        Ok(Self { cells })
    }

    fn load_admin(paths: &DomainPaths) -> Option<HashMap<(i64, i64), AdminEntry>> {
        let path = paths.admin_path.as_ref()?;
        match fs::read_to_string(path).map_err(|e| e.to_string()).and_then(|raw| {
            serde_json::from_str::<Vec<AdminEntry>>(&raw).map_err(|e| e.to_string())
        }) {
            Ok(entries) => Some(
                entries
                    .into_iter()
                    .map(|e| (coord_key(round5(e.lat), round5(e.lon)), e))
                    .collect(),
            ),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Administrative layer unavailable, using defaults");
                None
            }
        }
    }

    fn load_buildings(paths: &DomainPaths) -> Option<HashMap<(i64, i64), f64>> {
        let path = paths.buildings_path.as_ref()?;
        match fs::read_to_string(path).map_err(|e| e.to_string()).and_then(|raw| {
            serde_json::from_str::<Vec<BuildingEntry>>(&raw).map_err(|e| e.to_string())
        }) {
            Ok(entries) => Some(
                entries
                    .into_iter()
                    .filter_map(|e| {
                        e.building_vol
                            .map(|v| (coord_key(round5(e.lat), round5(e.lon)), v))
                    })
                    .collect(),
            ),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Building layer unavailable, using zero volume");
                None
            }
        }
    }

    /// Build a domain from an in-memory cell set (fixtures, warm re-use).
    pub fn from_cells(cells: Vec<GridCell>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Target coordinates as (lon, lat) pairs for the interpolator.
    pub fn targets(&self) -> Vec<(f64, f64)> {
        self.cells.iter().map(|c| (c.lon, c.lat)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    const GRID_JSON: &str = r#"{
        "features": [
            {"geometry": {"coordinates": [-99.178, 19.402]}, "properties": {"elevation": 2250.0}},
            {"geometry": {"coordinates": [-99.072, 19.402]}, "properties": {}}
        ]
    }"#;

    #[test]
    fn test_load_with_enrichment() {
        let dir = TempDir::new().unwrap();
        let grid = write_file(&dir, "grid.geojson", GRID_JSON);
        let admin = write_file(
            &dir,
            "admin.json",
            r#"[{"lat": 19.402, "lon": -99.178, "col": "Centro", "mun": "Cuauhtémoc",
                 "edo": "Ciudad de México", "pob": 1500}]"#,
        );
        let buildings = write_file(
            &dir,
            "buildings.json",
            r#"[{"lat": 19.402, "lon": -99.178, "building_vol": 0.85}]"#,
        );

        let domain = GridDomain::load(&DomainPaths {
            grid_path: grid,
            admin_path: Some(admin),
            buildings_path: Some(buildings),
        })
        .unwrap();

        assert_eq!(domain.len(), 2);
        let matched = &domain.cells()[0];
        assert_eq!(matched.col, "Centro");
        assert_eq!(matched.mun, "Cuauhtémoc");
        assert!((matched.building_vol - 0.85).abs() < 1e-12);
        assert!((matched.altitude - 2250.0).abs() < 1e-12);

        // The second point matched no enrichment rows.
        let unmatched = &domain.cells()[1];
        assert_eq!(unmatched.col, "Zona Federal");
        assert_eq!(unmatched.mun, "Valle de México");
        assert_eq!(unmatched.building_vol, 0.0);
        assert!((unmatched.altitude - 2240.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_enrichment_degrades_to_defaults() {
        let dir = TempDir::new().unwrap();
        let grid = write_file(&dir, "grid.geojson", GRID_JSON);

        let domain = GridDomain::load(&DomainPaths {
            grid_path: grid,
            admin_path: Some(dir.path().join("does-not-exist.json")),
            buildings_path: None,
        })
        .unwrap();

        assert_eq!(domain.len(), 2);
        assert_eq!(domain.cells()[0].col, "Zona Federal");
    }

    #[test]
    fn test_missing_base_lattice_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = GridDomain::load(&DomainPaths {
            grid_path: dir.path().join("missing.geojson"),
            admin_path: None,
            buildings_path: None,
        })
        .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_empty_lattice_is_fatal() {
        let dir = TempDir::new().unwrap();
        let grid = write_file(&dir, "grid.geojson", r#"{"features": []}"#);
        let err = GridDomain::load(&DomainPaths {
            grid_path: grid,
            admin_path: None,
            buildings_path: None,
        })
        .unwrap_err();
        assert!(err.is_fatal());
    }
}
