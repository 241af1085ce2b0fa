//! Application state for the point API.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use forecast_engine::NearestPointLookup;
use storage::{LiveGridCache, ObjectStorage, ObjectStorageConfig, SnapshotStore};

use aq_common::BoundingBox;

use crate::config::ApiConfig;

/// Shared application state.
pub struct AppState {
    /// Snapshot plane access (forecast hours, history, timeline).
    pub snapshots: SnapshotStore,

    /// Cached live grid with TTL; the snapshot store is the fetcher.
    pub live_grid: LiveGridCache,

    /// Nearest-point query engine over the fixed domain.
    pub lookup: NearestPointLookup,

    /// Runtime tunables.
    pub config: ApiConfig,
}

impl AppState {
    /// Create a new AppState from environment configuration.
    pub fn new() -> Result<Self> {
        let config = ApiConfig::from_env();
        let storage = Arc::new(ObjectStorage::new(&ObjectStorageConfig::from_env())?);
        let snapshots = SnapshotStore::new(storage);

        let live_grid = LiveGridCache::new(
            Arc::new(snapshots.clone()),
            Duration::from_secs(config.cache_ttl_secs),
        );

        let lookup = NearestPointLookup::new(
            BoundingBox::valle_de_mexico(),
            config.max_distance_km,
        );

        Ok(Self {
            snapshots,
            live_grid,
            lookup,
            config,
        })
    }
}
