//! Persistence media for cache records

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::Mutex;

use crate::error::CacheError;

/// Key/value medium holding serialized cache records
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`
    async fn load(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Replace the value under `key`. Readers never see a partial value.
    async fn save(&self, key: &str, value: &str) -> Result<(), CacheError>;

    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// One JSON file per key inside a directory.
///
/// Writes go to a temp file in the same directory and are renamed over the
/// target, so a concurrent `load` sees either the old or the new record.
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.path_for(key);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", key, uuid::Uuid::new_v4()));

        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store, used when persistence is disabled and in tests
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned()))
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), CacheError> {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache_dir(test_name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "btcfeed_store_{}_{}",
            test_name,
            uuid::Uuid::new_v4()
        ))
    }

    #[tokio::test]
    async fn file_store_replaces_whole_value() {
        let dir = temp_cache_dir("replace");
        let store = FileStore::new(&dir);

        assert!(store.load("k").await.unwrap().is_none());
        store.save("k", "first").await.unwrap();
        store.save("k", "second").await.unwrap();
        assert_eq!(store.load("k").await.unwrap().as_deref(), Some("second"));

        // no temp files left behind
        let leftovers = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);

        store.remove("k").await.unwrap();
        assert!(store.load("k").await.unwrap().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn remove_missing_key_is_ok() {
        let store = FileStore::new(temp_cache_dir("remove_missing"));
        assert!(store.remove("absent").await.is_ok());
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        store.save("a", "1").await.unwrap();
        assert_eq!(store.load("a").await.unwrap().as_deref(), Some("1"));
        store.remove("a").await.unwrap();
        assert!(store.load("a").await.unwrap().is_none());
    }
}
