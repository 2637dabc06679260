//! TTL-gated per-user blob store.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use skin_core::{CacheStore, Domain, Result};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// How long a recommendation blob stays fresh, in hours.
pub const DEFAULT_RECOMMENDATION_TTL_HOURS: i64 = 24;

/// Per-user recommendation blobs with lazily evaluated staleness.
///
/// A read is a hit only while `now - written_at < ttl`. Stale blobs are left in
/// place until the next write for that user; nothing sweeps them.
#[derive(Clone)]
pub struct RecommendationCache {
    store: Arc<dyn CacheStore>,
    ttl: TimeDelta,
}

impl fmt::Debug for RecommendationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecommendationCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl RecommendationCache {
    /// Creates a recommendation cache with the default 24 hour TTL.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_ttl(store, TimeDelta::hours(DEFAULT_RECOMMENDATION_TTL_HOURS))
    }

    /// Creates a recommendation cache with a custom TTL.
    #[must_use]
    pub fn with_ttl(store: Arc<dyn CacheStore>, ttl: TimeDelta) -> Self {
        Self { store, ttl }
    }

    /// Returns the configured TTL.
    #[must_use]
    pub const fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Returns the user's blob if it is still fresh.
    ///
    /// # Errors
    /// Returns an error if the underlying store fails.
    pub async fn get(&self, user: &str) -> Result<Option<Value>> {
        self.get_at(user, Utc::now()).await
    }

    /// Returns the user's blob if it is fresh as of `now`.
    ///
    /// # Errors
    /// Returns an error if the underlying store fails.
    pub async fn get_at(&self, user: &str, now: DateTime<Utc>) -> Result<Option<Value>> {
        let Some(record) = self.store.get(Domain::Recommendations, user).await? else {
            return Ok(None);
        };

        let age = now.signed_duration_since(record.written_at);
        if age < self.ttl {
            Ok(Some(record.payload))
        } else {
            debug!(user, age_secs = age.num_seconds(), "Recommendations are stale");
            Ok(None)
        }
    }

    /// Stores a blob for the user, stamped now.
    ///
    /// # Errors
    /// Returns an error if the underlying store fails.
    pub async fn put(&self, user: &str, blob: &Value) -> Result<()> {
        self.put_at(user, blob, Utc::now()).await
    }

    /// Stores a blob for the user with an explicit write time.
    ///
    /// # Errors
    /// Returns an error if the underlying store fails.
    pub async fn put_at(&self, user: &str, blob: &Value, written_at: DateTime<Utc>) -> Result<()> {
        self.store
            .put_at(Domain::Recommendations, user, blob, written_at)
            .await
    }
}
