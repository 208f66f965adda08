use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::KeyValueStore;
use crate::types::{Article, ScheduledPublish};
use crate::{Error, Result};

/// Keys of the persisted state layout.
pub mod keys {
    pub const AUTH: &str = "auth";
    pub const ADMIN_STORIES: &str = "admin_stories";
    pub const SCHEDULED: &str = "scheduled_posts";
    pub const IMPORTED: &str = "imported_articles";
    pub const AUTO_IMPORT_ENABLED: &str = "auto_import_enabled";
    pub const AUTO_IMPORT_INTERVAL: &str = "auto_import_interval";
    pub const LAST_FETCHED: &str = "last_fetched";
}

pub const DEFAULT_MAX_RETRIES: usize = 8;
pub const DEFAULT_AUTO_IMPORT_INTERVAL_MINUTES: u64 = 30;
/// One year.
pub const MAX_AUTO_IMPORT_INTERVAL_MINUTES: u64 = 525_600;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthState {
    pub authenticated: bool,
    pub username: Option<String>,
    pub token: Option<String>,
    pub logged_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoImportSettings {
    pub enabled: bool,
    pub interval_minutes: u64,
    pub last_fetched: Option<DateTime<Utc>>,
}

impl AutoImportSettings {
    /// Whether a cycle should run at `now` given the last successful fetch.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.last_fetched {
            None => true,
            // An interval too large to represent never comes due.
            Some(last) => i64::try_from(self.interval_minutes)
                .ok()
                .and_then(chrono::Duration::try_minutes)
                .and_then(|interval| last.checked_add_signed(interval))
                .is_some_and(|due_at| now >= due_at),
        }
    }
}

/// Typed access to the key/value store.
///
/// Reads treat a malformed value the same as an absent one. Writes through
/// [`Repository::update`] are optimistic: they retry when another writer
/// changed the key between the read and the write.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn KeyValueStore>,
    max_retries: usize,
}

impl Repository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Reads `key` with its version. Absent and corrupted values both yield `T::default()`.
    pub async fn load<T>(&self, key: &str) -> Result<(u64, T)>
    where
        T: DeserializeOwned + Default,
    {
        match self.store.get(key).await? {
            None => Ok((0, T::default())),
            Some(stored) => match serde_json::from_value(stored.value) {
                Ok(value) => Ok((stored.version, value)),
                Err(e) => {
                    warn!("Discarding malformed value under '{}': {}", key, e);
                    Ok((stored.version, T::default()))
                }
            },
        }
    }

    pub async fn read<T>(&self, key: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        Ok(self.load(key).await?.1)
    }

    /// Blind overwrite of `key`.
    pub async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.store.put(key, serde_json::to_value(value)?).await?;
        Ok(())
    }

    /// Read-modify-write of `key` guarded by its version.
    ///
    /// `f` may run more than once when writers race, so it must not have
    /// side effects beyond the value it is given.
    pub async fn update<T, R, F>(&self, key: &str, mut f: F) -> Result<R>
    where
        T: DeserializeOwned + Serialize + Default + Send,
        R: Send,
        F: FnMut(&mut T) -> R + Send,
    {
        let mut attempt = 0;
        loop {
            let (version, mut value) = self.load::<T>(key).await?;
            let out = f(&mut value);
            let json = serde_json::to_value(&value)?;
            match self.store.compare_and_swap(key, version, json).await {
                Ok(_) => return Ok(out),
                Err(e) if e.is_conflict() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!("Conflict writing '{}', retry {}/{}", key, attempt, self.max_retries);
                    tokio::task::yield_now().await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn admin_stories(&self) -> Result<Vec<Article>> {
        self.read(keys::ADMIN_STORIES).await
    }

    pub async fn imported(&self) -> Result<Vec<Article>> {
        self.read(keys::IMPORTED).await
    }

    pub async fn scheduled(&self) -> Result<Vec<ScheduledPublish>> {
        self.read(keys::SCHEDULED).await
    }

    pub async fn auth(&self) -> Result<AuthState> {
        self.read(keys::AUTH).await
    }

    pub async fn set_auth(&self, auth: &AuthState) -> Result<()> {
        self.write(keys::AUTH, auth).await
    }

    pub async fn auto_import_settings(&self) -> Result<AutoImportSettings> {
        let enabled: Option<bool> = self.read(keys::AUTO_IMPORT_ENABLED).await?;
        let interval: Option<u64> = self.read(keys::AUTO_IMPORT_INTERVAL).await?;
        let last_fetched: Option<DateTime<Utc>> = self.read(keys::LAST_FETCHED).await?;
        Ok(AutoImportSettings {
            enabled: enabled.unwrap_or(false),
            interval_minutes: interval
                .filter(|m| *m > 0)
                .unwrap_or(DEFAULT_AUTO_IMPORT_INTERVAL_MINUTES),
            last_fetched,
        })
    }

    pub async fn set_auto_import(&self, enabled: bool, interval_minutes: u64) -> Result<()> {
        if interval_minutes > MAX_AUTO_IMPORT_INTERVAL_MINUTES {
            return Err(Error::InvalidInput(format!(
                "Auto-import interval must be at most {} minutes",
                MAX_AUTO_IMPORT_INTERVAL_MINUTES
            )));
        }
        self.write(keys::AUTO_IMPORT_ENABLED, &enabled).await?;
        self.write(keys::AUTO_IMPORT_INTERVAL, &interval_minutes.max(1)).await
    }

    pub async fn set_last_fetched(&self, at: DateTime<Utc>) -> Result<()> {
        self.write(keys::LAST_FETCHED, &at).await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::MockStore;
    use super::*;
    use serde_json::json;

    fn repo() -> Repository {
        Repository::new(Arc::new(MockStore::default()))
    }

    #[tokio::test]
    async fn test_absent_and_corrupt_read_as_default() {
        let repo = repo();
        assert!(repo.admin_stories().await.unwrap().is_empty());

        repo.store().put(keys::ADMIN_STORIES, json!("not a list")).await.unwrap();
        assert!(repo.admin_stories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_overwrites_corrupt_value() {
        let repo = repo();
        repo.store().put(keys::SCHEDULED, json!({"bogus": true})).await.unwrap();
        repo.update(keys::SCHEDULED, |list: &mut Vec<ScheduledPublish>| list.len())
            .await
            .unwrap();
        let stored = repo.store().get(keys::SCHEDULED).await.unwrap().unwrap();
        assert_eq!(stored.value, json!([]));
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_blind_puts_lose_a_write() {
        let repo = repo();
        // Two writers each read the empty list, append their item and write back.
        let (_, mut first): (u64, Vec<String>) = repo.load("log").await.unwrap();
        let (_, mut second): (u64, Vec<String>) = repo.load("log").await.unwrap();
        first.push("from-first".to_string());
        second.push("from-second".to_string());
        repo.write("log", &first).await.unwrap();
        repo.write("log", &second).await.unwrap();

        let stored: Vec<String> = repo.read("log").await.unwrap();
        assert_eq!(stored, vec!["from-second".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_compare_and_swap_conflicts() {
        let repo = repo();
        let (version, _): (u64, Vec<String>) = repo.load("log").await.unwrap();
        repo.store().compare_and_swap("log", version, json!(["a"])).await.unwrap();
        let err = repo
            .store()
            .compare_and_swap("log", version, json!(["b"]))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_concurrent_updates_keep_every_write() {
        let repo = repo();
        let mut handles = Vec::new();
        for i in 0..8 {
            let repo = repo.clone().with_max_retries(64);
            handles.push(tokio::spawn(async move {
                repo.update("log", move |list: &mut Vec<u32>| list.push(i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let mut stored: Vec<u32> = repo.read("log").await.unwrap();
        stored.sort();
        assert_eq!(stored, (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_auto_import_settings_defaults() {
        let repo = repo();
        let settings = repo.auto_import_settings().await.unwrap();
        assert!(!settings.enabled);
        assert_eq!(settings.interval_minutes, DEFAULT_AUTO_IMPORT_INTERVAL_MINUTES);
        assert!(settings.last_fetched.is_none());

        repo.set_auto_import(true, 0).await.unwrap();
        let settings = repo.auto_import_settings().await.unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.interval_minutes, 1);
    }

    #[test]
    fn test_auto_import_is_due() {
        let now = Utc::now();
        let mut settings = AutoImportSettings {
            enabled: true,
            interval_minutes: 10,
            last_fetched: None,
        };
        assert!(settings.is_due(now));
        settings.last_fetched = Some(now - chrono::Duration::minutes(5));
        assert!(!settings.is_due(now));
        settings.last_fetched = Some(now - chrono::Duration::minutes(10));
        assert!(settings.is_due(now));
        settings.enabled = false;
        assert!(!settings.is_due(now));
    }

    #[test]
    fn test_unrepresentable_interval_is_never_due() {
        let now = Utc::now();
        for interval_minutes in [1 << 60, u64::MAX] {
            let settings = AutoImportSettings {
                enabled: true,
                interval_minutes,
                last_fetched: Some(now - chrono::Duration::days(3650)),
            };
            assert!(!settings.is_due(now));
        }
    }

    #[tokio::test]
    async fn test_set_auto_import_rejects_oversized_interval() {
        let repo = Repository::new(Arc::new(MockStore::default()));
        let err = repo.set_auto_import(true, 1 << 60).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        repo.set_auto_import(true, MAX_AUTO_IMPORT_INTERVAL_MINUTES).await.unwrap();
        let settings = repo.auto_import_settings().await.unwrap();
        assert_eq!(settings.interval_minutes, MAX_AUTO_IMPORT_INTERVAL_MINUTES);
    }
}
