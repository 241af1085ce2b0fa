//! Snapshot plane: forecast hours, the live singleton, realized history,
//! and the 24 h timeline summary.
//!
//! Forecast snapshots are keyed by target hour and regenerated under the
//! same key (overwrite, no locks). The live grid is a singleton overwritten
//! at ingestion cadence; realized history grids sit next to it keyed by
//! their ingestion stamp.

use std::sync::Arc;
use tracing::{debug, info};

use aq_common::{AqResult, CellRecord, TimelineEntry};

use crate::object_store::{ObjectStorage, StoragePath};

/// Read/write access to the persisted snapshot plane.
#[derive(Clone)]
pub struct SnapshotStore {
    storage: Arc<ObjectStorage>,
}

impl SnapshotStore {
    pub fn new(storage: Arc<ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Persist one forecast hour. Each hour is an independent unit of work;
    /// a failure in a later hour leaves earlier writes in place.
    pub async fn write_forecast_hour(
        &self,
        stamp: &str,
        records: &[CellRecord],
    ) -> AqResult<String> {
        let key = StoragePath::forecast_hour(stamp);
        self.storage.put_json(&key, &records).await?;
        info!(key = %key, cells = records.len(), "Forecast snapshot written");
        Ok(key)
    }

    /// Read one forecast hour, or `None` when it was never generated.
    pub async fn read_forecast_hour(&self, stamp: &str) -> AqResult<Option<Vec<CellRecord>>> {
        self.storage
            .get_json_opt(&StoragePath::forecast_hour(stamp))
            .await
    }

    /// Overwrite the live-grid singleton.
    pub async fn write_live(&self, records: &[CellRecord]) -> AqResult<()> {
        self.storage
            .put_json(&StoragePath::live_latest(), &records)
            .await
    }

    /// Read the live-grid singleton.
    pub async fn read_live(&self) -> AqResult<Option<Vec<CellRecord>>> {
        self.storage.get_json_opt(&StoragePath::live_latest()).await
    }

    /// Read a realized history grid by its ingestion stamp.
    pub async fn read_history(&self, stamp: &str) -> AqResult<Option<Vec<CellRecord>>> {
        self.storage
            .get_json_opt(&StoragePath::live_history(stamp))
            .await
    }

    /// Overwrite the 24 h city-wide timeline summary.
    pub async fn write_timeline(&self, entries: &[TimelineEntry]) -> AqResult<()> {
        debug!(hours = entries.len(), "Writing timeline summary");
        self.storage
            .put_json(&StoragePath::timeline(), &entries)
            .await
    }

    /// Read the 24 h timeline summary.
    pub async fn read_timeline(&self) -> AqResult<Option<Vec<TimelineEntry>>> {
        self.storage.get_json_opt(&StoragePath::timeline()).await
    }
}
