//! No-op cache implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use skin_core::{CacheRecord, CacheStore, Domain, Result};
use tracing::trace;

/// A no-op cache that doesn't store anything.
///
/// `get` always returns `Ok(None)` and writes succeed without effect. Useful for
/// disabling caching, which makes every call go upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheStore for NoopCache {
    async fn get(&self, _domain: Domain, _key: &str) -> Result<Option<CacheRecord>> {
        trace!("NoopCache: get called, returning None");
        Ok(None)
    }

    async fn put_at(
        &self,
        _domain: Domain,
        _key: &str,
        _payload: &Value,
        _written_at: DateTime<Utc>,
    ) -> Result<()> {
        trace!("NoopCache: put_at called, doing nothing");
        Ok(())
    }

    async fn clear(&self, _domain: Domain) -> Result<()> {
        trace!("NoopCache: clear called, doing nothing");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_noop_cache_never_hits() {
        let cache = NoopCache::new();

        cache.put(Domain::Price, "730:glove case", &json!("$0.41")).await.unwrap();
        assert!(
            cache
                .get(Domain::Price, "730:glove case")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_noop_cache_management() {
        let cache = NoopCache::new();
        assert!(cache.clear(Domain::Schema).await.is_ok());
        assert!(cache.clear_all().await.is_ok());
    }
}
