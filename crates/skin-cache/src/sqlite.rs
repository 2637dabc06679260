//! SQLite-based cache implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use skin_core::{CacheRecord, CacheStore, Domain, MarketError, Result};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};

/// SQLite-based cache for marketplace data.
///
/// Each [`Domain`] gets its own table keyed by the composite string key, with the
/// payload stored as JSON text. Every statement commits on its own; there is no
/// transaction spanning a read and a later write.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Create a new SQLite cache at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| MarketError::Cache(e.to_string()))?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory SQLite cache.
    ///
    /// Useful for testing; data is lost when the cache is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| MarketError::Cache(e.to_string()))?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Initialize one table per domain.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MarketError::Cache(e.to_string()))?;

        for domain in Domain::ALL {
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        key TEXT PRIMARY KEY,
                        payload TEXT NOT NULL,
                        written_at TEXT NOT NULL
                    )",
                    Self::table(domain)
                ),
                [],
            )
            .map_err(|e| MarketError::Cache(e.to_string()))?;
        }

        debug!("SQLite cache schema initialized");
        Ok(())
    }

    /// Table backing a domain.
    const fn table(domain: Domain) -> &'static str {
        match domain {
            Domain::Price => "price_cache",
            Domain::History => "history_cache",
            Domain::PopularItems => "popular_items_cache",
            Domain::Schema => "schema_cache",
            Domain::Recommendations => "recommendations_cache",
        }
    }
}

#[async_trait]
impl CacheStore for SqliteCache {
    #[instrument(skip(self), fields(domain = %domain))]
    async fn get(&self, domain: Domain, key: &str) -> Result<Option<CacheRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MarketError::Cache(e.to_string()))?;

        let row = conn
            .query_row(
                &format!(
                    "SELECT payload, written_at FROM {} WHERE key = ?1",
                    Self::table(domain)
                ),
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|e| MarketError::Cache(e.to_string()))?;

        let Some((payload, written_at)) = row else {
            debug!("Cache miss");
            return Ok(None);
        };

        let payload: Value =
            serde_json::from_str(&payload).map_err(|e| MarketError::Cache(e.to_string()))?;
        let written_at = DateTime::parse_from_rfc3339(&written_at)
            .map_err(|e| MarketError::Cache(format!("Invalid written_at {written_at:?}: {e}")))?
            .with_timezone(&Utc);

        debug!("Cache hit");
        Ok(Some(CacheRecord {
            payload,
            written_at,
        }))
    }

    #[instrument(skip(self, payload), fields(domain = %domain))]
    async fn put_at(
        &self,
        domain: Domain,
        key: &str,
        payload: &Value,
        written_at: DateTime<Utc>,
    ) -> Result<()> {
        let payload =
            serde_json::to_string(payload).map_err(|e| MarketError::Cache(e.to_string()))?;

        let conn = self
            .conn
            .lock()
            .map_err(|e| MarketError::Cache(e.to_string()))?;

        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (key, payload, written_at) VALUES (?1, ?2, ?3)",
                Self::table(domain)
            ),
            params![key, payload, written_at.to_rfc3339()],
        )
        .map_err(|e| MarketError::Cache(e.to_string()))?;

        debug!("Cached payload");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self, domain: Domain) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MarketError::Cache(e.to_string()))?;

        let deleted = conn
            .execute(&format!("DELETE FROM {}", Self::table(domain)), [])
            .map_err(|e| MarketError::Cache(e.to_string()))?;

        debug!(deleted, "Cleared domain");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use skin_core::CacheStoreExt;

    #[tokio::test]
    async fn test_sqlite_cache_initialization() {
        let cache = SqliteCache::in_memory();
        assert!(cache.is_ok());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = SqliteCache::in_memory().unwrap();

        // Initially no data
        assert!(cache.get(Domain::Price, "730:glove case").await.unwrap().is_none());

        let payload = json!({"steam_price": "$0.41"});
        cache.put(Domain::Price, "730:glove case", &payload).await.unwrap();

        let record = cache.get(Domain::Price, "730:glove case").await.unwrap().unwrap();
        assert_eq!(record.payload, payload);

        // Same key in another domain is a different record
        assert!(cache.get(Domain::History, "730:glove case").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let cache = SqliteCache::in_memory().unwrap();
        let written_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

        cache
            .put(Domain::Schema, "570", &json!({"version": 1}))
            .await
            .unwrap();
        cache
            .put_at(Domain::Schema, "570", &json!({"version": 2}), written_at)
            .await
            .unwrap();

        let record = cache.get(Domain::Schema, "570").await.unwrap().unwrap();
        assert_eq!(record.payload, json!({"version": 2}));
        assert_eq!(record.written_at, written_at);
    }

    #[tokio::test]
    async fn test_typed_helpers() {
        let cache = SqliteCache::in_memory().unwrap();
        let items = vec!["Glove Case".to_string(), "Spectrum Case".to_string()];

        cache
            .put_json(Domain::PopularItems, "730", &items)
            .await
            .unwrap();
        let back: Vec<String> = cache
            .get_json(Domain::PopularItems, "730")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(back, items);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let cache = SqliteCache::in_memory().unwrap();

        for domain in Domain::ALL {
            cache.put(domain, "key", &json!(1)).await.unwrap();
        }

        cache.clear(Domain::History).await.unwrap();
        assert!(cache.get(Domain::History, "key").await.unwrap().is_none());
        assert!(cache.get(Domain::Price, "key").await.unwrap().is_some());

        cache.clear_all().await.unwrap();
        for domain in Domain::ALL {
            assert!(cache.get(domain, "key").await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_persists_across_connections() {
        let path = std::env::temp_dir().join(format!(
            "skin-cache-test-{}.sqlite",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        {
            let cache = SqliteCache::new(&path).unwrap();
            cache
                .put(Domain::Recommendations, "76561198000000000", &json!({"risers": []}))
                .await
                .unwrap();
        }

        let cache = SqliteCache::new(&path).unwrap();
        let record = cache
            .get(Domain::Recommendations, "76561198000000000")
            .await
            .unwrap();
        assert!(record.is_some());

        drop(cache);
        let _ = std::fs::remove_file(&path);
    }
}
