//! Nearest-point lookup against a cached grid snapshot.
//!
//! One implementation serves every point-query surface; response shaping is
//! the API layer's concern (parameterized by schema version). The lookup
//! always returns a real sampled cell plus the computed distance, and never
//! synthesizes an interpolated value for a point query.

use rayon::prelude::*;
use serde::Serialize;

use aq_common::{AqError, AqResult, BoundingBox, CellRecord};

/// Mean Earth radius used for great-circle distances, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6367.0;

/// Default maximum serviceable distance from the nearest cell.
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 10.0;

/// Haversine great-circle distance in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Outcome class of a point query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    /// Nearest cell within the serviceable radius.
    Success,
    /// Nearest cell beyond the radius; data returned, caller decides.
    Warning,
    /// Query outside the fixed domain rectangle; no distances computed.
    OutOfBounds,
}

/// Result of one nearest-point query.
#[derive(Debug, Clone)]
pub struct PointLookup {
    pub status: LookupStatus,
    /// The nearest sampled cell; absent only for out-of-bounds queries.
    pub record: Option<CellRecord>,
    pub distance_km: Option<f64>,
}

impl PointLookup {
    fn out_of_bounds() -> Self {
        Self {
            status: LookupStatus::OutOfBounds,
            record: None,
            distance_km: None,
        }
    }
}

/// Nearest-point query engine over the fixed domain.
#[derive(Debug, Clone)]
pub struct NearestPointLookup {
    bounds: BoundingBox,
    max_distance_km: f64,
}

impl NearestPointLookup {
    pub fn new(bounds: BoundingBox, max_distance_km: f64) -> Self {
        Self {
            bounds,
            max_distance_km,
        }
    }

    /// The fixed metropolitan domain with the default 10 km radius.
    pub fn default_domain() -> Self {
        Self::new(BoundingBox::valle_de_mexico(), DEFAULT_MAX_DISTANCE_KM)
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Resolve a query coordinate against one snapshot.
    ///
    /// Out-of-coverage queries short-circuit before any distance math.
    /// An empty snapshot is a service error, not a lookup outcome.
    pub fn query(&self, records: &[CellRecord], lat: f64, lon: f64) -> AqResult<PointLookup> {
        if !self.bounds.contains(lat, lon) {
            return Ok(PointLookup::out_of_bounds());
        }

        if records.is_empty() {
            return Err(AqError::ServiceUnavailable(
                "grid snapshot has no cells".to_string(),
            ));
        }

        let (idx, distance_km) = records
            .par_iter()
            .enumerate()
            .map(|(i, r)| (i, haversine_km(lat, lon, r.lat, r.lon)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .expect("non-empty records");

        let status = if distance_km <= self.max_distance_km {
            LookupStatus::Success
        } else {
            LookupStatus::Warning
        };

        Ok(PointLookup {
            status,
            record: Some(records[idx].clone()),
            distance_km: Some(distance_km),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::record_at;

    fn lookup() -> NearestPointLookup {
        NearestPointLookup::default_domain()
    }

    #[test]
    fn test_exact_cell_distance_near_zero() {
        let records = vec![record_at(19.40, -99.10), record_at(19.50, -99.20)];
        let hit = lookup().query(&records, 19.40, -99.10).unwrap();
        assert_eq!(hit.status, LookupStatus::Success);
        assert!(hit.distance_km.unwrap() < 1e-9);
        assert_eq!(hit.record.unwrap().lat, 19.40);
    }

    #[test]
    fn test_out_of_bounds_short_circuits() {
        let records = vec![record_at(19.40, -99.10)];
        let miss = lookup().query(&records, 25.0, -99.10).unwrap();
        assert_eq!(miss.status, LookupStatus::OutOfBounds);
        assert!(miss.record.is_none());
        assert!(miss.distance_km.is_none());

        // Grid state is irrelevant for out-of-bounds queries.
        let miss_empty = lookup().query(&[], 25.0, -99.10).unwrap();
        assert_eq!(miss_empty.status, LookupStatus::OutOfBounds);
    }

    #[test]
    fn test_near_query_succeeds_far_query_warns() {
        let records = vec![record_at(19.40, -99.10)];

        // ~0.2 km east of the cell.
        let near = lookup().query(&records, 19.40, -99.098).unwrap();
        assert_eq!(near.status, LookupStatus::Success);
        assert!(near.distance_km.unwrap() < 1.0);

        // ~50 km away but still inside the bounding rectangle.
        let far = NearestPointLookup::new(BoundingBox::new(18.0, 21.0, -100.0, -98.0), 10.0)
            .query(&records, 19.85, -99.10)
            .unwrap();
        assert_eq!(far.status, LookupStatus::Warning);
        assert!(far.distance_km.unwrap() > 10.0);
        // Degraded coverage still returns the nearest cell's data.
        assert!(far.record.is_some());
    }

    #[test]
    fn test_picks_the_minimum_distance_cell() {
        let records = vec![
            record_at(19.20, -99.30),
            record_at(19.40, -99.10),
            record_at(19.70, -98.90),
        ];
        let hit = lookup().query(&records, 19.41, -99.11).unwrap();
        assert_eq!(hit.record.unwrap().lat, 19.40);
    }

    #[test]
    fn test_empty_grid_is_service_error() {
        let err = lookup().query(&[], 19.40, -99.10).unwrap_err();
        assert!(matches!(err, AqError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is ~111 km at this radius.
        let d = haversine_km(19.0, -99.0, 20.0, -99.0);
        assert!((d - EARTH_RADIUS_KM * 1f64.to_radians()).abs() < 1e-9);
    }
}
