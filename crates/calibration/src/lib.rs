//! Adaptive bias calibration.
//!
//! Compares historical forecast snapshots against realized grids over a
//! rolling window and folds the mean residual into the persisted
//! per-hour, per-pollutant bias coefficients.

pub mod engine;

pub use engine::{is_excluded_date, CalibrationConfig, CalibrationEngine, SampleSource};
