//! Storage backend abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vl_core::config::{CacheBackend, CacheConfig};
use vl_core::{CacheEntry, Handle, Result};

use crate::file::FileStore;
use crate::memory::MemoryStore;

/// Where cache entries live.
///
/// Implementations must tolerate concurrent calls on distinct handles.
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn kind(&self) -> CacheBackend;

    async fn insert(&self, entry: &CacheEntry) -> Result<()>;

    /// `Ok(None)` when the handle is unknown.
    async fn load(&self, handle: Handle) -> Result<Option<CacheEntry>>;

    /// Returns whether something was removed.
    async fn remove(&self, handle: Handle) -> Result<bool>;

    /// Creation time of every stored entry.
    async fn ages(&self) -> Result<Vec<(Handle, DateTime<Utc>)>>;
}

/// Build the backend selected by `config.backend`.
pub async fn open_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryStore::new()),
        CacheBackend::File => Arc::new(FileStore::open(&config.dir).await?),
    };
    tracing::info!(backend = %config.backend, "cache store ready");
    Ok(store)
}
