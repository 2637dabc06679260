//! Cache trait for storing fetched marketplace data.
//!
//! This module defines the [`CacheStore`] trait, a key/value layer partitioned
//! by [`Domain`]. Payloads are opaque JSON values; [`CacheStoreExt`] adds typed
//! helpers on top.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt;

use crate::error::Result;

/// Logical partition of the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    /// Composite price quotes and secondary bulk snapshots.
    Price,
    /// Sale-history series.
    History,
    /// Curated popular-items listings.
    PopularItems,
    /// Item schemas.
    Schema,
    /// Per-user recommendation blobs.
    Recommendations,
}

impl Domain {
    /// Every domain, in table-creation order.
    pub const ALL: [Self; 5] = [
        Self::Price,
        Self::History,
        Self::PopularItems,
        Self::Schema,
        Self::Recommendations,
    ];

    /// Returns the storage name of this domain.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::History => "history",
            Self::PopularItems => "popular_items",
            Self::Schema => "schema",
            Self::Recommendations => "recommendations",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored payload together with the time it was written.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheRecord {
    /// The stored value.
    pub payload: Value,
    /// When the value was written.
    pub written_at: DateTime<Utc>,
}

/// Domain-partitioned key/value store.
///
/// Writes are idempotent upserts (last write wins). There is no locking across
/// calls: a read followed by a write is not atomic. Storage failures are
/// returned as errors and must abort the calling operation.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Retrieves a record.
    ///
    /// Returns `Ok(Some(record))` if a record exists, `Ok(None)` if not cached.
    async fn get(&self, domain: Domain, key: &str) -> Result<Option<CacheRecord>>;

    /// Stores a payload with an explicit write time.
    async fn put_at(
        &self,
        domain: Domain,
        key: &str,
        payload: &Value,
        written_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Stores a payload stamped with the current time.
    async fn put(&self, domain: Domain, key: &str, payload: &Value) -> Result<()> {
        self.put_at(domain, key, payload, Utc::now()).await
    }

    /// Removes every record of one domain.
    async fn clear(&self, domain: Domain) -> Result<()>;

    /// Removes every record of every domain.
    async fn clear_all(&self) -> Result<()> {
        for domain in Domain::ALL {
            self.clear(domain).await?;
        }
        Ok(())
    }
}

/// Typed helpers for [`CacheStore`].
#[async_trait]
pub trait CacheStoreExt: CacheStore {
    /// Retrieves and deserializes a payload.
    async fn get_json<T: DeserializeOwned + Send>(
        &self,
        domain: Domain,
        key: &str,
    ) -> Result<Option<T>> {
        match self.get(domain, key).await? {
            Some(record) => Ok(Some(serde_json::from_value(record.payload)?)),
            None => Ok(None),
        }
    }

    /// Serializes and stores a payload.
    async fn put_json<T: Serialize + Sync>(
        &self,
        domain: Domain,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let payload = serde_json::to_value(value)?;
        self.put(domain, key, &payload).await
    }
}

impl<C: CacheStore + ?Sized> CacheStoreExt for C {}
