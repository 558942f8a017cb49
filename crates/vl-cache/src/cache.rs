//! The handle cache and its eviction sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use vl_core::config::CacheBackend;
use vl_core::{is_expired, CacheEntry, Handle, ResolutionResult};

use crate::store::CacheStore;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub evicted: usize,
    pub failed: usize,
}

/// Maps opaque handles to resolution results for a bounded time.
///
/// Store failures never reach callers: a failed write is logged and a failed
/// read is a miss.
#[derive(Clone)]
pub struct HandleCache {
    store: Arc<dyn CacheStore>,
    ttl: chrono::Duration,
}

impl HandleCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        Self { store, ttl }
    }

    pub fn backend(&self) -> CacheBackend {
        self.store.kind()
    }

    /// Store `result` under a fresh handle.
    pub async fn put(&self, result: ResolutionResult) -> Handle {
        let entry = CacheEntry::new(Handle::new(), result, Utc::now());
        if let Err(e) = self.store.insert(&entry).await {
            tracing::warn!(handle = %entry.handle, error = %e, "failed to store cache entry");
        } else {
            tracing::debug!(handle = %entry.handle, "cached resolution");
        }
        entry.handle
    }

    pub async fn get(&self, handle: Handle) -> Option<CacheEntry> {
        match self.store.load(handle).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(handle = %handle, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Remove `handle`. Missing entries are fine.
    pub async fn evict(&self, handle: Handle) {
        if let Err(e) = self.store.remove(handle).await {
            tracing::warn!(handle = %handle, error = %e, "failed to evict cache entry");
        }
    }

    /// Number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.store.ages().await.map(|a| a.len()).unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now()).await
    }

    /// Evict every entry older than the TTL as of `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let ages = match self.store.ages().await {
            Ok(ages) => ages,
            Err(e) => {
                tracing::warn!(error = %e, "cache sweep could not enumerate entries");
                return SweepReport {
                    failed: 1,
                    ..SweepReport::default()
                };
            }
        };

        let mut report = SweepReport {
            scanned: ages.len(),
            ..SweepReport::default()
        };

        for (handle, created_at) in ages {
            if !is_expired(created_at, now, self.ttl) {
                continue;
            }
            match self.store.remove(handle).await {
                Ok(_) => report.evicted += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(handle = %handle, error = %e, "failed to evict expired entry");
                }
            }
        }

        report
    }
}

/// Start a background task that sweeps `cache` every `interval` until
/// `cancel` fires.
pub fn start_sweep_task(
    cache: HandleCache,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let interval = if interval.is_zero() {
        Duration::from_secs(1)
    } else {
        interval
    };

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; nothing can have expired yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let report = cache.sweep().await;
                    if report.evicted > 0 || report.failed > 0 {
                        tracing::info!(
                            scanned = report.scanned,
                            evicted = report.evicted,
                            failed = report.failed,
                            "cache sweep"
                        );
                    }
                }
            }
        }
        tracing::debug!("cache sweep task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileStore;
    use crate::memory::MemoryStore;
    use async_trait::async_trait;
    use vl_core::{Error, Result};

    fn result(n: u32) -> ResolutionResult {
        ResolutionResult::direct(format!("https://www.tiktok.com/@u/video/{n}"))
    }

    fn memory_cache(ttl_secs: u64) -> HandleCache {
        HandleCache::new(Arc::new(MemoryStore::new()), Duration::from_secs(ttl_secs))
    }

    #[tokio::test]
    async fn put_then_get() {
        let cache = memory_cache(300);
        let handle = cache.put(result(1)).await;
        let entry = cache.get(handle).await.unwrap();
        assert_eq!(entry.handle, handle);
        assert_eq!(entry.result, result(1));
    }

    #[tokio::test]
    async fn handles_are_distinct() {
        let cache = memory_cache(300);
        let a = cache.put(result(1)).await;
        let b = cache.put(result(1)).await;
        assert_ne!(a, b);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn evict_is_idempotent() {
        let cache = memory_cache(300);
        let handle = cache.put(result(1)).await;
        cache.evict(handle).await;
        cache.evict(handle).await;
        assert!(cache.get(handle).await.is_none());
    }

    #[tokio::test]
    async fn sweep_evicts_only_expired() {
        let store = Arc::new(MemoryStore::new());
        let cache = HandleCache::new(store.clone(), Duration::from_secs(300));
        let now = Utc::now();

        let old = CacheEntry::new(Handle::new(), result(1), now - chrono::Duration::seconds(301));
        let boundary = CacheEntry::new(Handle::new(), result(2), now - chrono::Duration::seconds(300));
        let fresh = CacheEntry::new(Handle::new(), result(3), now - chrono::Duration::seconds(10));
        for e in [&old, &boundary, &fresh] {
            store.insert(e).await.unwrap();
        }

        let report = cache.sweep_at(now).await;
        assert_eq!(
            report,
            SweepReport {
                scanned: 3,
                evicted: 1,
                failed: 0
            }
        );
        assert!(cache.get(old.handle).await.is_none());
        assert!(cache.get(boundary.handle).await.is_some());
        assert!(cache.get(fresh.handle).await.is_some());
    }

    #[tokio::test]
    async fn file_backend_sweeps_corrupt_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let cache = HandleCache::new(store, Duration::from_secs(60));

        let handle = Handle::new();
        std::fs::write(dir.path().join(format!("{handle}.json")), b"garbage").unwrap();
        assert!(cache.get(handle).await.is_none());

        let report = cache.sweep_at(Utc::now() + chrono::Duration::seconds(120)).await;
        assert_eq!(report.evicted, 1);
        assert!(!dir.path().join(format!("{handle}.json")).exists());
    }

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        fn kind(&self) -> CacheBackend {
            CacheBackend::File
        }
        async fn insert(&self, _entry: &CacheEntry) -> Result<()> {
            Err(Error::Internal("disk full".into()))
        }
        async fn load(&self, _handle: Handle) -> Result<Option<CacheEntry>> {
            Err(Error::Internal("disk gone".into()))
        }
        async fn remove(&self, _handle: Handle) -> Result<bool> {
            Err(Error::Internal("read-only".into()))
        }
        async fn ages(&self) -> Result<Vec<(Handle, DateTime<Utc>)>> {
            Ok(vec![(Handle::new(), Utc::now() - chrono::Duration::days(1))])
        }
    }

    #[tokio::test]
    async fn store_failures_do_not_surface() {
        let cache = HandleCache::new(Arc::new(BrokenStore), Duration::from_secs(1));
        let handle = cache.put(result(1)).await;
        assert!(cache.get(handle).await.is_none());
        cache.evict(handle).await;

        let report = cache.sweep().await;
        assert_eq!(report.scanned, 1);
        assert_eq!(report.evicted, 0);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn sweep_task_evicts_and_stops() {
        let cache = HandleCache::new(Arc::new(MemoryStore::new()), Duration::ZERO);
        let handle = cache.put(result(1)).await;

        let cancel = CancellationToken::new();
        let task = start_sweep_task(cache.clone(), Duration::from_millis(20), cancel.clone());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.get(handle).await.is_none());

        cancel.cancel();
        task.await.unwrap();
    }
}
