//! Rolling-window residual calibration engine.
//!
//! For each day in the window and each (hour-of-day, pollutant) pair, the
//! engine compares the city-wide mean of the forecast snapshot against the
//! realized grid at the same local timestamp and accumulates
//! `residual = realized − forecast`. The persisted coefficients are a
//! memory: an (hour, pollutant) pair with no new samples keeps its prior
//! bias unchanged.
//!
//! Must run as a single, non-overlapping daily invocation — the singleton
//! read-modify-write is unprotected.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashMap;
use tracing::{debug, info};

use aq_common::{cell, time, AqError, AqResult, CellRecord, Pollutant};
use storage::{CalibrationCoefficients, CoefficientsStore, SnapshotStore};

/// Residual samples keyed by (hour-of-day, pollutant).
pub type ResidualSet = HashMap<(u32, Pollutant), Vec<f64>>;

/// Calibration parameters.
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    /// Rolling window length in days.
    pub window_days: u32,
    /// Fraction of the mean residual folded into the bias per run, in
    /// (0, 1]. 1.0 replaces the prior bias with the observed residual.
    pub learning_rate: f64,
    /// Minute-of-hour of forecast snapshot keys.
    pub forecast_minute: u32,
    /// Minute-of-hour the live ingestion stamps realized grids with.
    pub realized_minute: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            learning_rate: 1.0,
            forecast_minute: 0,
            realized_minute: 20,
        }
    }
}

/// Holiday outlier dates excluded from the residual sweep.
pub fn is_excluded_date(date: NaiveDate) -> bool {
    matches!(
        (date.month(), date.day()),
        (12, 24) | (12, 25) | (12, 31) | (1, 1)
    )
}

/// Paired snapshot access for the residual sweep.
///
/// A `None` on either side means the sample is silently skipped; errors
/// abort the run before the singleton is touched.
#[async_trait]
pub trait SampleSource: Send + Sync {
    async fn forecast_snapshot(&self, stamp: &str) -> AqResult<Option<Vec<CellRecord>>>;
    async fn realized_snapshot(&self, stamp: &str) -> AqResult<Option<Vec<CellRecord>>>;
}

#[async_trait]
impl SampleSource for SnapshotStore {
    async fn forecast_snapshot(&self, stamp: &str) -> AqResult<Option<Vec<CellRecord>>> {
        self.read_forecast_hour(stamp).await
    }

    async fn realized_snapshot(&self, stamp: &str) -> AqResult<Option<Vec<CellRecord>>> {
        self.read_history(stamp).await
    }
}

/// The calibration engine itself.
pub struct CalibrationEngine {
    config: CalibrationConfig,
}

impl CalibrationEngine {
    pub fn new(config: CalibrationConfig) -> AqResult<Self> {
        if !(config.learning_rate > 0.0 && config.learning_rate <= 1.0) {
            return Err(AqError::InvalidParameter {
                param: "learning_rate".to_string(),
                message: format!("{} is outside (0, 1]", config.learning_rate),
            });
        }
        if config.window_days == 0 {
            return Err(AqError::InvalidParameter {
                param: "window_days".to_string(),
                message: "window must cover at least one day".to_string(),
            });
        }
        Ok(Self { config })
    }

    /// Sweep the window and collect residuals per (hour, pollutant).
    pub async fn collect_residuals(
        &self,
        source: &dyn SampleSource,
        today: NaiveDate,
    ) -> AqResult<ResidualSet> {
        let mut residuals: ResidualSet = HashMap::new();
        let mut paired_hours = 0usize;

        for day_back in 1..=self.config.window_days {
            let date = today - Duration::days(day_back as i64);
            if is_excluded_date(date) {
                debug!(%date, "Skipping excluded calendar date");
                continue;
            }

            for hour in 0..24u32 {
                let forecast_stamp = time::stamp_for(date, hour, self.config.forecast_minute)?;
                let realized_stamp = time::stamp_for(date, hour, self.config.realized_minute)?;

                let forecast = source.forecast_snapshot(&forecast_stamp).await?;
                let realized = source.realized_snapshot(&realized_stamp).await?;
                let (Some(forecast), Some(realized)) = (forecast, realized) else {
                    continue;
                };
                paired_hours += 1;

                for pollutant in Pollutant::ALL {
                    let f_mean = cell::grid_mean(&forecast, pollutant);
                    let r_mean = cell::grid_mean(&realized, pollutant);
                    if let (Some(f), Some(r)) = (f_mean, r_mean) {
                        residuals.entry((hour, pollutant)).or_default().push(r - f);
                    }
                }
            }
        }

        info!(
            paired_hours,
            sampled_pairs = residuals.len(),
            window_days = self.config.window_days,
            "Residual sweep completed"
        );
        Ok(residuals)
    }

    /// Fold collected residuals into the prior coefficients.
    ///
    /// Pairs with no samples this run are left untouched, so memory
    /// persists across sparse windows.
    pub fn apply(
        &self,
        prior: &CalibrationCoefficients,
        residuals: &ResidualSet,
    ) -> CalibrationCoefficients {
        let mut next = prior.clone();
        next.generated_at = time::display_timestamp(&time::local_now());
        next.window_days = self.config.window_days;
        next.version = storage::coefficients::COEFFICIENTS_VERSION.to_string();

        for ((hour, pollutant), samples) in residuals {
            if samples.is_empty() {
                continue;
            }
            let mean_residual = samples.iter().sum::<f64>() / samples.len() as f64;
            let updated = prior.bias(*hour, *pollutant) + self.config.learning_rate * mean_residual;
            next.set_bias(*hour, *pollutant, round2(updated));
        }

        next
    }

    /// One full calibration cycle: load memory, sweep, update, persist.
    ///
    /// Any failure during the sweep aborts before the singleton is
    /// rewritten.
    pub async fn run(
        &self,
        source: &dyn SampleSource,
        coefficients: &CoefficientsStore,
        today: NaiveDate,
    ) -> AqResult<CalibrationCoefficients> {
        let prior = coefficients.load_or_default(self.config.window_days).await;
        let residuals = self.collect_residuals(source, today).await?;
        let next = self.apply(&prior, &residuals);
        coefficients.store(&next).await?;
        Ok(next)
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;
    use test_utils::fixtures::snapshot_with;

    /// In-memory sample source keyed by snapshot stamp.
    #[derive(Default)]
    struct StubSource {
        forecasts: Map<String, Vec<CellRecord>>,
        realized: Map<String, Vec<CellRecord>>,
    }

    #[async_trait]
    impl SampleSource for StubSource {
        async fn forecast_snapshot(&self, stamp: &str) -> AqResult<Option<Vec<CellRecord>>> {
            Ok(self.forecasts.get(stamp).cloned())
        }

        async fn realized_snapshot(&self, stamp: &str) -> AqResult<Option<Vec<CellRecord>>> {
            Ok(self.realized.get(stamp).cloned())
        }
    }

    fn engine(learning_rate: f64) -> CalibrationEngine {
        CalibrationEngine::new(CalibrationConfig {
            learning_rate,
            ..CalibrationConfig::default()
        })
        .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[tokio::test]
    async fn test_zero_samples_leaves_bias_unchanged() {
        let mut prior = CalibrationCoefficients::zeroed(7);
        prior.set_bias(9, Pollutant::O3, 4.25);

        let residuals = engine(1.0)
            .collect_residuals(&StubSource::default(), today())
            .await
            .unwrap();
        assert!(residuals.is_empty());

        let next = engine(1.0).apply(&prior, &residuals);
        // Bit-for-bit: the entire bias table survives an empty sweep.
        assert_eq!(next.hourly_bias, prior.hourly_bias);
        assert_eq!(next.bias(9, Pollutant::O3), 4.25);
    }

    #[tokio::test]
    async fn test_unit_learning_rate_adds_single_residual() {
        let mut source = StubSource::default();
        // Yesterday 09:00 local: forecast o3 mean 40, realized 45.
        source
            .forecasts
            .insert("2025-03-13_09-00".to_string(), snapshot_with(40.0, 30.0, 12.0));
        source
            .realized
            .insert("2025-03-13_09-20".to_string(), snapshot_with(45.0, 30.0, 12.0));

        let eng = engine(1.0);
        let residuals = eng.collect_residuals(&source, today()).await.unwrap();
        assert_eq!(residuals[&(9, Pollutant::O3)], vec![5.0]);

        let mut prior = CalibrationCoefficients::zeroed(7);
        prior.set_bias(9, Pollutant::O3, 2.0);
        let next = eng.apply(&prior, &residuals);

        // new = old + residual with learning_rate = 1.
        assert_eq!(next.bias(9, Pollutant::O3), 7.0);
        // The matching pm residuals were zero: bias stays zero.
        assert_eq!(next.bias(9, Pollutant::Pm10), 0.0);
        // Other hours were never sampled.
        assert_eq!(next.bias(10, Pollutant::O3), 0.0);
    }

    #[tokio::test]
    async fn test_damped_learning_rate() {
        let mut source = StubSource::default();
        source
            .forecasts
            .insert("2025-03-13_09-00".to_string(), snapshot_with(40.0, 30.0, 12.0));
        source
            .realized
            .insert("2025-03-13_09-20".to_string(), snapshot_with(50.0, 30.0, 12.0));

        let eng = engine(0.5);
        let residuals = eng.collect_residuals(&source, today()).await.unwrap();
        let next = eng.apply(&CalibrationCoefficients::zeroed(7), &residuals);
        assert_eq!(next.bias(9, Pollutant::O3), 5.0);
    }

    #[tokio::test]
    async fn test_missing_side_skips_pair() {
        let mut source = StubSource::default();
        // Forecast exists, realized grid was never ingested.
        source
            .forecasts
            .insert("2025-03-13_09-00".to_string(), snapshot_with(40.0, 30.0, 12.0));

        let residuals = engine(1.0)
            .collect_residuals(&source, today())
            .await
            .unwrap();
        assert!(residuals.is_empty());
    }

    #[tokio::test]
    async fn test_excluded_dates_are_skipped() {
        let mut source = StubSource::default();
        // Christmas day pair would produce a large residual.
        source
            .forecasts
            .insert("2024-12-25_09-00".to_string(), snapshot_with(10.0, 30.0, 12.0));
        source
            .realized
            .insert("2024-12-25_09-20".to_string(), snapshot_with(90.0, 30.0, 12.0));

        let day_after = NaiveDate::from_ymd_opt(2024, 12, 26).unwrap();
        let residuals = engine(1.0)
            .collect_residuals(&source, day_after)
            .await
            .unwrap();
        assert!(residuals.is_empty());
    }

    #[test]
    fn test_excluded_date_table() {
        for (y, m, d, excluded) in [
            (2024, 12, 24, true),
            (2024, 12, 25, true),
            (2024, 12, 31, true),
            (2025, 1, 1, true),
            (2025, 1, 2, false),
            (2024, 12, 26, false),
        ] {
            assert_eq!(
                is_excluded_date(NaiveDate::from_ymd_opt(y, m, d).unwrap()),
                excluded
            );
        }
    }

    #[test]
    fn test_learning_rate_bounds() {
        for bad in [0.0, -0.5, 1.5] {
            let result = CalibrationEngine::new(CalibrationConfig {
                learning_rate: bad,
                ..CalibrationConfig::default()
            });
            assert!(result.is_err(), "learning_rate {} accepted", bad);
        }
        assert!(CalibrationEngine::new(CalibrationConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_multiple_days_average() {
        let mut source = StubSource::default();
        for (date, realized_o3) in [("2025-03-13", 44.0), ("2025-03-12", 48.0)] {
            source.forecasts.insert(
                format!("{}_09-00", date),
                snapshot_with(40.0, 30.0, 12.0),
            );
            source.realized.insert(
                format!("{}_09-20", date),
                snapshot_with(realized_o3, 30.0, 12.0),
            );
        }

        let eng = engine(1.0);
        let residuals = eng.collect_residuals(&source, today()).await.unwrap();
        assert_eq!(residuals[&(9, Pollutant::O3)].len(), 2);

        let next = eng.apply(&CalibrationCoefficients::zeroed(7), &residuals);
        // mean(4, 8) = 6
        assert_eq!(next.bias(9, Pollutant::O3), 6.0);
    }
}
