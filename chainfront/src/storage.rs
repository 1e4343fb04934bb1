//! Best-effort transaction-history cache.
//!
//! The cache is a convenience for UI collaborators across reloads, keyed by
//! the configured storage key. It is never authoritative: the ledger's
//! in-memory history is, and cache failures are logged and swallowed by the
//! broker rather than surfaced.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, WalletError};
use crate::types::Transaction;

/// Storage backend for the transaction history.
#[async_trait]
pub trait HistoryCache: Send + Sync {
    /// Load the cached history, newest first. An absent cache is an empty
    /// history, not an error.
    async fn load(&self) -> Result<Vec<Transaction>>;

    /// Replace the cached history.
    async fn save(&self, history: &[Transaction]) -> Result<()>;
}

/// In-memory cache. Useful for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<Vec<Transaction>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryCache for MemoryCache {
    async fn load(&self) -> Result<Vec<Transaction>> {
        Ok(self.entries.read().await.clone())
    }

    async fn save(&self, history: &[Transaction]) -> Result<()> {
        *self.entries.write().await = history.to_vec();
        Ok(())
    }
}

/// JSON file cache, one file per storage key.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// Create a cache file named after `key` inside `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, key: &str) -> Self {
        let safe_key = key.replace([':', '/', '\\'], "_");
        Self {
            path: dir.into().join(format!("{safe_key}.json")),
        }
    }
}

#[async_trait]
impl HistoryCache for FileCache {
    async fn load(&self) -> Result<Vec<Transaction>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| WalletError::storage(e.to_string()))?;
        let history =
            serde_json::from_str(&content).map_err(|e| WalletError::storage(e.to_string()))?;
        debug!(path = %self.path.display(), "loaded history cache");
        Ok(history)
    }

    async fn save(&self, history: &[Transaction]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WalletError::storage(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(history)
            .map_err(|e| WalletError::storage(e.to_string()))?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| WalletError::storage(e.to_string()))?;
        debug!(path = %self.path.display(), entries = history.len(), "saved history cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Asset, TxHash, TxState};
    use crate::util::random_address;

    fn sample() -> Transaction {
        Transaction::new(
            TxHash::random(),
            random_address(),
            random_address(),
            Asset::Native,
            "1.5",
            TxState::Confirmed,
        )
    }

    #[tokio::test]
    async fn memory_cache_round_trips() {
        let cache = MemoryCache::new();
        assert!(cache.load().await.unwrap().is_empty());

        let tx = sample();
        cache.save(std::slice::from_ref(&tx)).await.unwrap();
        let loaded = cache.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].hash, tx.hash);
    }

    #[tokio::test]
    async fn file_cache_round_trips() {
        let dir = std::env::temp_dir().join(format!("chainfront-test-{}", fastrand::u64(..)));
        let cache = FileCache::new(&dir, "chainfront.history");

        // Absent file reads as empty.
        assert!(cache.load().await.unwrap().is_empty());

        let tx = sample();
        cache.save(std::slice::from_ref(&tx)).await.unwrap();
        let loaded = cache.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].hash, tx.hash);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn storage_keys_are_sanitized() {
        let cache = FileCache::new("/tmp", "a:b/c");
        assert!(cache.path.ends_with("a_b_c.json"));
    }
}
