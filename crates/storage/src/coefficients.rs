//! The calibration-coefficients singleton.
//!
//! A single JSON object holding the learned per-hour, per-pollutant bias.
//! Created all-zero on cold start, updated once per calibration cycle,
//! never deleted. Unsampled (hour, pollutant) combinations keep their prior
//! value across runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use aq_common::{time, AqResult, Pollutant};

use crate::object_store::{ObjectStorage, StoragePath};

/// Version tag written with every coefficients generation.
pub const COEFFICIENTS_VERSION: &str = "V2-Memory";

/// Learned additive bias per hour-of-day and pollutant.
///
/// `hourly_bias` is keyed by stringified hour ("0".."23") then pollutant key,
/// matching the stored JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCoefficients {
    pub generated_at: String,
    pub window_days: u32,
    pub version: String,
    pub hourly_bias: BTreeMap<String, BTreeMap<String, f64>>,
}

impl CalibrationCoefficients {
    /// All-zero cold-start coefficients.
    pub fn zeroed(window_days: u32) -> Self {
        let mut hourly_bias = BTreeMap::new();
        for hour in 0..24u32 {
            let mut by_pollutant = BTreeMap::new();
            for p in Pollutant::ALL {
                by_pollutant.insert(p.key().to_string(), 0.0);
            }
            hourly_bias.insert(hour.to_string(), by_pollutant);
        }
        Self {
            generated_at: time::display_timestamp(&time::local_now()),
            window_days,
            version: COEFFICIENTS_VERSION.to_string(),
            hourly_bias,
        }
    }

    /// Bias for one hour-of-day and pollutant; absent entries read as zero.
    pub fn bias(&self, hour: u32, pollutant: Pollutant) -> f64 {
        self.hourly_bias
            .get(&hour.to_string())
            .and_then(|m| m.get(pollutant.key()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Set the bias for one hour-of-day and pollutant.
    pub fn set_bias(&mut self, hour: u32, pollutant: Pollutant, value: f64) {
        self.hourly_bias
            .entry(hour.to_string())
            .or_default()
            .insert(pollutant.key().to_string(), value);
    }
}

/// Load/store access to the coefficients singleton.
#[derive(Clone)]
pub struct CoefficientsStore {
    storage: Arc<ObjectStorage>,
}

impl CoefficientsStore {
    pub fn new(storage: Arc<ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Read the persisted singleton, if any generation exists yet.
    pub async fn load(&self) -> AqResult<Option<CalibrationCoefficients>> {
        self.storage
            .get_json_opt(&StoragePath::coefficients())
            .await
    }

    /// Read the singleton, falling back to all-zero coefficients on cold
    /// start. A storage failure also falls back (logged) so a forecast run
    /// degrades to uncorrected output instead of aborting.
    pub async fn load_or_default(&self, window_days: u32) -> CalibrationCoefficients {
        match self.load().await {
            Ok(Some(coeffs)) => coeffs,
            Ok(None) => {
                info!("No calibration memory yet, starting from zero bias");
                CalibrationCoefficients::zeroed(window_days)
            }
            Err(e) => {
                warn!(error = %e, "Could not read calibration memory, using zero bias");
                CalibrationCoefficients::zeroed(window_days)
            }
        }
    }

    /// Overwrite the singleton with a new generation.
    pub async fn store(&self, coefficients: &CalibrationCoefficients) -> AqResult<()> {
        self.storage
            .put_json(&StoragePath::coefficients(), coefficients)
            .await?;
        info!(
            generated_at = %coefficients.generated_at,
            window_days = coefficients.window_days,
            "Calibration coefficients written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_covers_all_hours_and_pollutants() {
        let c = CalibrationCoefficients::zeroed(7);
        assert_eq!(c.hourly_bias.len(), 24);
        for hour in 0..24 {
            for p in Pollutant::ALL {
                assert_eq!(c.bias(hour, p), 0.0);
            }
        }
        assert_eq!(c.version, COEFFICIENTS_VERSION);
    }

    #[test]
    fn test_set_and_get_bias() {
        let mut c = CalibrationCoefficients::zeroed(7);
        c.set_bias(14, Pollutant::O3, -3.25);
        assert_eq!(c.bias(14, Pollutant::O3), -3.25);
        // Untouched entries stay zero.
        assert_eq!(c.bias(14, Pollutant::Pm10), 0.0);
        assert_eq!(c.bias(13, Pollutant::O3), 0.0);
    }

    #[test]
    fn test_json_shape() {
        let mut c = CalibrationCoefficients::zeroed(7);
        c.set_bias(6, Pollutant::Pm25, 1.5);
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"hourly_bias\""));
        assert!(json.contains("\"window_days\":7"));

        let back: CalibrationCoefficients = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bias(6, Pollutant::Pm25), 1.5);
    }

    #[test]
    fn test_absent_entries_read_as_zero() {
        let c: CalibrationCoefficients = serde_json::from_str(
            r#"{"generated_at":"2025-03-14 06:00","window_days":7,"version":"V2-Memory",
                "hourly_bias":{"0":{"o3":2.0}}}"#,
        )
        .unwrap();
        assert_eq!(c.bias(0, Pollutant::O3), 2.0);
        assert_eq!(c.bias(0, Pollutant::Co), 0.0);
        assert_eq!(c.bias(23, Pollutant::O3), 0.0);
    }
}
