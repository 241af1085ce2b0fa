//! Geographic bounding box for the serviceable domain.

use serde::{Deserialize, Serialize};

/// A WGS84 lat/lon bounding rectangle.
///
/// Coordinates are in degrees. The fixed metropolitan domain is defined by
/// [`BoundingBox::valle_de_mexico`]; queries outside it are out of coverage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// The fixed Valle de México service domain.
    pub fn valle_de_mexico() -> Self {
        Self::new(19.13, 19.80, -99.40, -98.80)
    }

    /// Check if a point is contained within this bbox (inclusive edges).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Height of the box in degrees of latitude.
    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Width of the box in degrees of longitude.
    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_point() {
        let bbox = BoundingBox::valle_de_mexico();
        assert!(bbox.contains(19.40, -99.10));
        assert!(!bbox.contains(20.50, -99.10));
        assert!(!bbox.contains(19.40, -97.00));
        // Edges are inclusive
        assert!(bbox.contains(19.13, -99.40));
    }

    #[test]
    fn test_spans() {
        let bbox = BoundingBox::new(19.0, 20.0, -100.0, -98.5);
        assert!((bbox.lat_span() - 1.0).abs() < 1e-12);
        assert!((bbox.lon_span() - 1.5).abs() < 1e-12);
    }
}
