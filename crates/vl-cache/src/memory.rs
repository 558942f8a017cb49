//! In-process backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use vl_core::config::CacheBackend;
use vl_core::{CacheEntry, Handle, Result};

use crate::store::CacheStore;

/// Entries held in a [`DashMap`]; lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<Handle, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn kind(&self) -> CacheBackend {
        CacheBackend::Memory
    }

    async fn insert(&self, entry: &CacheEntry) -> Result<()> {
        self.entries.insert(entry.handle, entry.clone());
        Ok(())
    }

    async fn load(&self, handle: Handle) -> Result<Option<CacheEntry>> {
        Ok(self.entries.get(&handle).map(|e| e.value().clone()))
    }

    async fn remove(&self, handle: Handle) -> Result<bool> {
        Ok(self.entries.remove(&handle).is_some())
    }

    async fn ages(&self) -> Result<Vec<(Handle, DateTime<Utc>)>> {
        Ok(self
            .entries
            .iter()
            .map(|e| (*e.key(), e.value().created_at))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vl_core::ResolutionResult;

    #[tokio::test]
    async fn insert_load_remove() {
        let store = MemoryStore::new();
        let entry = CacheEntry::new(Handle::new(), ResolutionResult::direct("s"), Utc::now());

        store.insert(&entry).await.unwrap();
        assert_eq!(store.load(entry.handle).await.unwrap(), Some(entry.clone()));
        assert_eq!(store.ages().await.unwrap().len(), 1);

        assert!(store.remove(entry.handle).await.unwrap());
        assert!(!store.remove(entry.handle).await.unwrap());
        assert!(store.load(entry.handle).await.unwrap().is_none());
    }
}
