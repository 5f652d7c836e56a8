use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Durable mapping from key names to JSON values.
///
/// Single-key reads and writes are atomic. `set_many` lands all of its
/// entries together or none of them.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.set_many(&[(key, value)]).await
    }
}

/// Store backed by a single JSON object on disk.
///
/// The file is re-read on every access so that edits made by another
/// process (e.g. the `skip` subcommand while the daemon runs) are picked up
/// on the next tick.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Map<String, Value>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::NotAnObject(self.path.display().to_string())),
        }
    }

    async fn save(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        // Rename is atomic, so readers never see a half-written object.
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.load().await?.remove(key))
    }

    async fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        self.save(&map).await?;
        debug!(path = %self.path.display(), keys = entries.len(), "settings written");
        Ok(())
    }
}

/// In-process store used in tests. Counts writes and can be switched to
/// fail every call, standing in for an unavailable backend.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: std::sync::Mutex<Map<String, Value>>,
    writes: std::sync::atomic::AtomicUsize,
    unavailable: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn writes(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable
            .store(unavailable, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Map<String, Value> {
        self.values.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("store offline")));
        }
        Ok(())
    }
}

#[cfg(test)]
#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.check_available()?;
        let values = self
            .values
            .lock()
            .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))?;
        Ok(values.get(key).cloned())
    }

    async fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), StoreError> {
        self.check_available()?;
        let mut values = self
            .values
            .lock()
            .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))?;
        for (key, value) in entries {
            values.insert((*key).to_string(), value.clone());
        }
        self.writes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_file_store_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("settings.json"));
        assert_eq!(store.get("time").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = JsonFileStore::new(&path);
        store
            .set_many(&[("stage", json!("shortBreak")), ("pomodoroCounter", json!(2))])
            .await
            .unwrap();
        store.set("time", json!(1_700_000_000)).await.unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("stage").await.unwrap(), Some(json!("shortBreak")));
        assert_eq!(reopened.get("pomodoroCounter").await.unwrap(), Some(json!(2)));
        assert_eq!(reopened.get("time").await.unwrap(), Some(json!(1_700_000_000)));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_store_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.get("time").await,
            Err(StoreError::NotAnObject(_))
        ));
    }

    #[tokio::test]
    async fn test_file_store_corrupt_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.get("time").await, Err(StoreError::Json(_))));
    }

    #[tokio::test]
    async fn test_memory_store_unavailable() {
        let store = MemoryStore::default();
        store.set("time", json!(5)).await.unwrap();
        store.set_unavailable(true);
        assert!(store.get("time").await.is_err());
        assert!(store.set("time", json!(6)).await.is_err());
        store.set_unavailable(false);
        assert_eq!(store.get("time").await.unwrap(), Some(json!(5)));
        assert_eq!(store.writes(), 1);
    }
}
