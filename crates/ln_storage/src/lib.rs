use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use ln_core::{Error, KeyValueStore, Result};
use tracing::info;

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: KeyValueStore {
    fn get_error_message() -> &'static str;

    async fn open(config: &BackendConfig) -> Result<Self>
    where
        Self: Sized;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    File,
    Sqlite,
}

impl StorageKind {
    pub fn default_url(&self) -> &'static str {
        match self {
            StorageKind::Memory => "memory://",
            StorageKind::File => "./data",
            StorageKind::Sqlite => "sqlite://localnews.db",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageKind::Memory => "memory",
            StorageKind::File => "file",
            StorageKind::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Ok(StorageKind::Memory),
            "file" | "json" => Ok(StorageKind::File),
            "sqlite" => Ok(StorageKind::Sqlite),
            other => Err(Error::InvalidInput(format!("Unknown storage backend: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub url: String,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn with_url(&mut self, url: &str) {
        self.url = url.to_string();
    }
}

/// Opens the backend named by `kind`, at `url` or the backend's default location.
pub async fn create_storage(kind: &str, url: Option<&str>) -> Result<Arc<dyn KeyValueStore>> {
    let kind: StorageKind = kind.parse()?;
    let config = BackendConfig::new(url.unwrap_or(kind.default_url()));
    let storage: Arc<dyn KeyValueStore> = match kind {
        StorageKind::Memory => Arc::new(MemoryStorage::open(&config).await?),
        StorageKind::File => Arc::new(FileStorage::open(&config).await?),
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => Arc::new(SQLiteStorage::open(&config).await?),
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => {
            return Err(Error::Storage(
                "SQLite support was not compiled in (enable the `sqlite` feature)".to_string(),
            ))
        }
    };
    info!("🏦 Opened {} storage at {}", kind, config.url);
    Ok(storage)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, BackendConfig, StorageBackend, StorageKind};
}
