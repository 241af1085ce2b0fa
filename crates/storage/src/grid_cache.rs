//! Process-lifetime cache for the live grid.
//!
//! Warm invocations reuse the cached snapshot; cold starts (and expired
//! entries) go through the injected fetcher. The fetcher is a seam so
//! cold-start vs warm-reuse behavior is testable without object storage.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use aq_common::{AqResult, CellRecord};

use crate::snapshot::SnapshotStore;

/// Source of the live grid for the cache.
#[async_trait]
pub trait GridFetcher: Send + Sync {
    async fn fetch(&self) -> AqResult<Option<Vec<CellRecord>>>;
}

#[async_trait]
impl GridFetcher for SnapshotStore {
    async fn fetch(&self) -> AqResult<Option<Vec<CellRecord>>> {
        self.read_live().await
    }
}

struct CachedGrid {
    records: Arc<Vec<CellRecord>>,
    fetched_at: Instant,
}

/// Counters for cache behavior.
#[derive(Default)]
pub struct LiveGridCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub refreshes: AtomicU64,
}

impl LiveGridCacheStats {
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.refreshes.load(Ordering::Relaxed),
        )
    }
}

/// Cached live grid with TTL and an injectable fetcher.
pub struct LiveGridCache {
    fetcher: Arc<dyn GridFetcher>,
    ttl: Duration,
    slot: RwLock<Option<CachedGrid>>,
    stats: LiveGridCacheStats,
}

impl LiveGridCache {
    pub fn new(fetcher: Arc<dyn GridFetcher>, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            slot: RwLock::new(None),
            stats: LiveGridCacheStats::default(),
        }
    }

    /// Get the live grid, fetching on cold start or expiry.
    ///
    /// Returns `None` when the live singleton has never been ingested.
    pub async fn get(&self) -> AqResult<Option<Arc<Vec<CellRecord>>>> {
        {
            let slot = self.slot.read().await;
            if let Some(cached) = slot.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(Arc::clone(&cached.records)));
                }
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Live grid cache cold or expired, fetching");

        let fetched = self.fetcher.fetch().await?;
        let Some(records) = fetched else {
            return Ok(None);
        };

        let records = Arc::new(records);
        let mut slot = self.slot.write().await;
        *slot = Some(CachedGrid {
            records: Arc::clone(&records),
            fetched_at: Instant::now(),
        });
        self.stats.refreshes.fetch_add(1, Ordering::Relaxed);
        info!(cells = records.len(), "Live grid cache refreshed");
        Ok(Some(records))
    }

    /// Drop the cached entry so the next read goes to the fetcher.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        *slot = None;
    }

    pub fn stats(&self) -> &LiveGridCacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct StubFetcher {
        calls: AtomicUsize,
        payload: Option<Vec<CellRecord>>,
    }

    #[async_trait]
    impl GridFetcher for StubFetcher {
        async fn fetch(&self) -> AqResult<Option<Vec<CellRecord>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.clone())
        }
    }

    fn one_record() -> Vec<CellRecord> {
        serde_json::from_str(
            r#"[{"timestamp":"2025-03-14 10:00","lat":19.4,"lon":-99.1,
                 "tmp":20.0,"rh":50.0,"wsp":1.0,"wdr":90.0,
                 "ias":30,"risk":"Low","dominant":"O3"}]"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_cold_start_fetches_once_then_reuses() {
        let fetcher = Arc::new(StubFetcher {
            calls: AtomicUsize::new(0),
            payload: Some(one_record()),
        });
        let cache = LiveGridCache::new(Arc::clone(&fetcher) as Arc<dyn GridFetcher>, Duration::from_secs(300));

        let first = cache.get().await.unwrap().unwrap();
        let second = cache.get().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        let (hits, misses, refreshes) = cache.stats().snapshot();
        assert_eq!((hits, misses, refreshes), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let fetcher = Arc::new(StubFetcher {
            calls: AtomicUsize::new(0),
            payload: Some(one_record()),
        });
        let cache = LiveGridCache::new(Arc::clone(&fetcher) as Arc<dyn GridFetcher>, Duration::from_secs(300));

        cache.get().await.unwrap();
        cache.invalidate().await;
        cache.get().await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_absent_live_grid_is_not_cached() {
        let fetcher = Arc::new(StubFetcher {
            calls: AtomicUsize::new(0),
            payload: None,
        });
        let cache = LiveGridCache::new(Arc::clone(&fetcher) as Arc<dyn GridFetcher>, Duration::from_secs(300));

        assert!(cache.get().await.unwrap().is_none());
        assert!(cache.get().await.unwrap().is_none());
        // Absence is retried on every read, never stored as a grid.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }
}
