use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ln_core::{Error, KeyValueStore, Result, Versioned};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{BackendConfig, StorageBackend};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Versioned>,
}

impl MemoryStore {
    fn version_of(&self, key: &str) -> u64 {
        self.entries.get(key).map(|v| v.version).unwrap_or(0)
    }

    fn insert(&mut self, key: &str, version: u64, value: Value) {
        self.entries.insert(key.to_string(), Versioned { version, value });
    }

    pub fn put(&mut self, key: &str, value: Value) -> u64 {
        let version = self.version_of(key) + 1;
        self.insert(key, version, value);
        version
    }

    pub fn compare_and_swap(&mut self, key: &str, expected: u64, value: Value) -> Result<u64> {
        let found = self.version_of(key);
        if found != expected {
            return Err(Error::Conflict {
                key: key.to_string(),
                expected,
                found,
            });
        }
        self.insert(key, found + 1, value);
        Ok(found + 1)
    }
}

/// Process-local store. Everything is lost when the process exits.
#[derive(Clone)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
    config: BackendConfig,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::default())),
            config: BackendConfig::new("memory://"),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn open(config: &BackendConfig) -> Result<Self> {
        let mut storage = Self::new();
        storage.config.with_url(&config.url);
        Ok(storage)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Versioned>> {
        Ok(self.store.read().await.entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<u64> {
        Ok(self.store.write().await.put(key, value))
    }

    async fn compare_and_swap(&self, key: &str, expected: u64, value: Value) -> Result<u64> {
        self.store.write().await.compare_and_swap(key, expected, value)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store.write().await.entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.store.read().await.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::exercise_store;
    use ln_core::repository::keys;
    use chrono::Utc;
    use ln_core::{Article, Repository};

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        exercise_store(&storage).await;
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        let repo = Repository::new(Arc::new(storage));
        repo.write(keys::ADMIN_STORIES, &vec![Article::new("a", "A", Utc::now())])
            .await
            .unwrap();
        assert!(other.get(keys::ADMIN_STORIES).await.unwrap().is_some());
    }
}
