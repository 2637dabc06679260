//! In-memory cache implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use skin_core::{CacheRecord, CacheStore, Domain, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Key of an in-memory record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    domain: Domain,
    key: String,
}

/// Simple in-memory cache for testing and development.
///
/// Records live in a `RwLock`-protected `HashMap` and are lost when the cache is
/// dropped. Payloads are cloned on get/put.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<EntryKey, CacheRecord>>,
}

impl InMemoryCache {
    /// Create a new empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records across all domains.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    #[instrument(skip(self), fields(domain = %domain))]
    async fn get(&self, domain: Domain, key: &str) -> Result<Option<CacheRecord>> {
        let entry_key = EntryKey {
            domain,
            key: key.to_string(),
        };

        let entries = self.entries.read().await;
        match entries.get(&entry_key) {
            Some(record) => {
                debug!("Cache hit");
                Ok(Some(record.clone()))
            }
            None => {
                debug!("Cache miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, payload), fields(domain = %domain))]
    async fn put_at(
        &self,
        domain: Domain,
        key: &str,
        payload: &Value,
        written_at: DateTime<Utc>,
    ) -> Result<()> {
        let entry_key = EntryKey {
            domain,
            key: key.to_string(),
        };

        let mut entries = self.entries.write().await;
        entries.insert(
            entry_key,
            CacheRecord {
                payload: payload.clone(),
                written_at,
            },
        );
        debug!("Cached payload");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self, domain: Domain) -> Result<()> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|k, _| k.domain != domain);
        debug!(removed = before - entries.len(), "Cleared domain");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let cache = InMemoryCache::new();

        // Initially no data
        assert!(cache.get(Domain::History, "570:arcana").await.unwrap().is_none());

        cache
            .put(Domain::History, "570:arcana", &json!({"points": []}))
            .await
            .unwrap();

        let record = cache.get(Domain::History, "570:arcana").await.unwrap();
        assert_eq!(record.unwrap().payload, json!({"points": []}));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_cache_clear_is_per_domain() {
        let cache = InMemoryCache::new();
        cache.put(Domain::Price, "a", &json!(1)).await.unwrap();
        cache.put(Domain::History, "a", &json!(2)).await.unwrap();

        cache.clear(Domain::Price).await.unwrap();
        assert!(cache.get(Domain::Price, "a").await.unwrap().is_none());
        assert!(cache.get(Domain::History, "a").await.unwrap().is_some());

        cache.clear_all().await.unwrap();
        assert!(cache.is_empty().await);
    }
}
