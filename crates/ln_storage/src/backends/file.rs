use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ln_core::{Error, KeyValueStore, Result, Versioned};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

use crate::{BackendConfig, StorageBackend};

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u64,
    value: Value,
}

/// One JSON document per key inside a directory.
///
/// Writes go through a temp file and a rename. The write lock only covers
/// this process; two processes sharing a directory can still race.
pub struct FileStorage {
    root: PathBuf,
    write_lock: Mutex<()>,
}

fn validate_key(key: &str) -> Result<()> {
    let ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("Invalid storage key: {:?}", key)))
    }
}

impl FileStorage {
    pub async fn new_with_path(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            Error::Storage(format!("Failed to create data directory {}: {}", root.display(), e))
        })?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    async fn read_envelope(&self, key: &str) -> Result<Option<Envelope>> {
        validate_key(key)?;
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                warn!("Treating corrupted {} as absent: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn write_envelope(&self, key: &str, envelope: &Envelope) -> Result<()> {
        let path = self.path_for(key);
        let tmp = self.root.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, serde_json::to_vec_pretty(envelope)?).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    fn get_error_message() -> &'static str {
        "Data directory should be writable"
    }

    async fn open(config: &BackendConfig) -> Result<Self> {
        let path = config.url.strip_prefix("file://").unwrap_or(&config.url);
        Self::new_with_path(path).await
    }
}

#[async_trait]
impl KeyValueStore for FileStorage {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<Versioned>> {
        Ok(self.read_envelope(key).await?.map(|e| Versioned {
            version: e.version,
            value: e.value,
        }))
    }

    async fn put(&self, key: &str, value: Value) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let version = self.read_envelope(key).await?.map(|e| e.version).unwrap_or(0) + 1;
        self.write_envelope(key, &Envelope { version, value }).await?;
        Ok(version)
    }

    async fn compare_and_swap(&self, key: &str, expected: u64, value: Value) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let found = self.read_envelope(key).await?.map(|e| e.version).unwrap_or(0);
        if found != expected {
            return Err(Error::Conflict {
                key: key.to_string(),
                expected,
                found,
            });
        }
        let version = found + 1;
        self.write_envelope(key, &Envelope { version, value }).await?;
        Ok(version)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            if let Some(key) = name.strip_suffix(".json") {
                keys.push(key.to_string());
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::exercise_store;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_storage() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new_with_path(dir.path()).await.unwrap();
        exercise_store(&storage).await;
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let storage = FileStorage::new_with_path(dir.path()).await.unwrap();
            storage.put("auth", json!({"authenticated": true})).await.unwrap();
        }
        let storage = FileStorage::open(&BackendConfig::new(format!("file://{}", dir.path().display())))
            .await
            .unwrap();
        let stored = storage.get("auth").await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.value, json!({"authenticated": true}));
    }

    #[tokio::test]
    async fn test_corrupted_file_reads_as_absent() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new_with_path(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("admin_stories.json"), "{ not json").unwrap();
        assert!(storage.get("admin_stories").await.unwrap().is_none());
        assert_eq!(
            storage.compare_and_swap("admin_stories", 0, json!([])).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new_with_path(dir.path()).await.unwrap();
        assert!(storage.put("../escape", json!(1)).await.is_err());
    }
}
