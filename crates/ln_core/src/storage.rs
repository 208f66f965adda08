use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// A stored value together with the version it was written at.
///
/// Versions start at 1 for the first write; an absent key is version 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub version: u64,
    pub value: Value,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<Versioned>>;

    /// Unconditional write. Concurrent writers overwrite each other; the last one wins.
    async fn put(&self, key: &str, value: Value) -> Result<u64>;

    /// Writes only if the stored version still equals `expected` (0 meaning absent).
    ///
    /// Returns the new version, or [`crate::Error::Conflict`] when another
    /// writer got there first.
    async fn compare_and_swap(&self, key: &str, expected: u64, value: Value) -> Result<u64>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn keys(&self) -> Result<Vec<String>>;
}
