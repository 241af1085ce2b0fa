//! Persistence layer for valle-aire services.
//!
//! Provides:
//! - Object storage (MinIO/S3) for snapshot and model-artifact JSON blobs
//! - The forecast/live/history snapshot plane
//! - The calibration-coefficients singleton
//! - A process-lifetime cache for the live grid with an injectable fetcher

pub mod coefficients;
pub mod grid_cache;
pub mod object_store;
pub mod snapshot;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig, StoragePath};
pub use coefficients::{CalibrationCoefficients, CoefficientsStore};
pub use grid_cache::{GridFetcher, LiveGridCache, LiveGridCacheStats};
pub use snapshot::SnapshotStore;
