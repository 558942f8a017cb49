//! Directory-backed store: one `<handle>.json` record per entry.
//!
//! Records are written to a temporary file and renamed into place, so a
//! reader sees either the whole record or no record at all.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vl_core::config::CacheBackend;
use vl_core::{CacheEntry, Error, Handle, Result};

use crate::store::CacheStore;

const RECORD_EXT: &str = "json";

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir`, creating it if needed.
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn record_path(&self, handle: Handle) -> PathBuf {
        self.dir.join(format!("{handle}.{RECORD_EXT}"))
    }

    /// Creation time of the record at `path`, falling back to the file's
    /// mtime when the body cannot be read or parsed.
    async fn record_age(path: &Path) -> Option<DateTime<Utc>> {
        let parsed = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice::<CacheEntry>(&bytes).ok(),
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(_) => None,
        };
        if let Some(entry) = parsed {
            return Some(entry.created_at);
        }

        tracing::warn!(path = %path.display(), "unreadable cache record; using file mtime");
        let modified = tokio::fs::metadata(path).await.ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }
}

#[async_trait]
impl CacheStore for FileStore {
    fn kind(&self) -> CacheBackend {
        CacheBackend::File
    }

    async fn insert(&self, entry: &CacheEntry) -> Result<()> {
        let body = serde_json::to_vec_pretty(entry)
            .map_err(|e| Error::Internal(format!("cannot serialize cache entry: {e}")))?;

        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", entry.handle, uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, &body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.record_path(entry.handle)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn load(&self, handle: Handle) -> Result<Option<CacheEntry>> {
        let bytes = match tokio::fs::read(self.record_path(handle)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::Internal(format!("corrupt cache record {handle}: {e}")))
    }

    async fn remove(&self, handle: Handle) -> Result<bool> {
        match tokio::fs::remove_file(self.record_path(handle)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn ages(&self) -> Result<Vec<(Handle, DateTime<Utc>)>> {
        let mut ages = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;

        loop {
            let item = match dir.next_entry().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    // Sweep what was listed; the rest waits for the next pass.
                    tracing::warn!(
                        dir = %self.dir.display(),
                        listed = ages.len(),
                        error = %e,
                        "cache directory listing interrupted"
                    );
                    break;
                }
            };
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            let Some(handle) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<Handle>().ok())
            else {
                continue;
            };
            // A record deleted since read_dir listed it is simply skipped.
            if let Some(created_at) = Self::record_age(&path).await {
                ages.push((handle, created_at));
            }
        }

        Ok(ages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vl_core::ResolutionResult;

    fn entry() -> CacheEntry {
        CacheEntry::new(
            Handle::new(),
            ResolutionResult::extracted(
                "https://www.tiktok.com/@u/video/1",
                "https://cdn.example/v.mp4",
                Some("Clip".into()),
                None,
                None,
            ),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let entry = entry();

        store.insert(&entry).await.unwrap();
        assert!(dir.path().join(format!("{}.json", entry.handle)).is_file());
        assert_eq!(store.load(entry.handle).await.unwrap(), Some(entry.clone()));

        // A second store over the same directory sees the record.
        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.load(entry.handle).await.unwrap(), Some(entry));
    }

    #[tokio::test]
    async fn missing_record_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.load(Handle::new()).await.unwrap().is_none());
        assert!(!store.remove(Handle::new()).await.unwrap());
    }

    #[tokio::test]
    async fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        for _ in 0..5 {
            store.insert(&entry()).await.unwrap();
        }
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 5);
        assert!(names.iter().all(|n| n.ends_with(".json")));
    }

    #[tokio::test]
    async fn corrupt_record_errors_on_load_but_still_ages() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let handle = Handle::new();
        std::fs::write(dir.path().join(format!("{handle}.json")), b"{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        assert!(store.load(handle).await.is_err());

        let ages = store.ages().await.unwrap();
        assert_eq!(ages.len(), 1);
        assert_eq!(ages[0].0, handle);
    }
}
