//! Sale-history ingestion with a single-point fallback.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use skin_core::{
    CacheStore, CacheStoreExt, Catalog, Domain, HistoryPoint, HistorySeries, HistorySource,
    ItemKey, MarketError, Result,
};

use crate::aggregator::PriceAggregator;

/// Cache-aside reader of per-item sale history.
#[derive(Clone)]
pub struct HistoryIngester {
    cache: Arc<dyn CacheStore>,
    source: Option<Arc<dyn HistorySource>>,
}

impl fmt::Debug for HistoryIngester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryIngester")
            .field("source", &self.source.as_ref().map(|s| s.name()))
            .finish_non_exhaustive()
    }
}

impl HistoryIngester {
    /// Creates an ingester without a history source.
    ///
    /// Every miss then falls back to the current quote.
    #[must_use]
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self {
            cache,
            source: None,
        }
    }

    /// Sets the history source.
    pub fn set_source(&mut self, source: Arc<dyn HistorySource>) {
        debug!(source = source.name(), "Registering history source");
        self.source = Some(source);
    }

    /// Returns an item's sale history.
    ///
    /// # Errors
    /// Returns an error only if the cache fails.
    pub async fn get_history(
        &self,
        item: &ItemKey,
        catalog: Catalog,
        prices: &PriceAggregator,
    ) -> Result<HistorySeries> {
        self.get_history_at(item, catalog, prices, Utc::now()).await
    }

    /// Returns an item's sale history, stamping a synthesized point with `now`.
    ///
    /// Cached series are returned as stored. On a miss the listing page is
    /// scraped; when that yields nothing the current primary price becomes a
    /// single point with volume 1. Non-empty results are cached, an empty
    /// series is not.
    ///
    /// # Errors
    /// Returns an error only if the cache fails.
    #[instrument(skip(self, item, prices), fields(item = %item, catalog = %catalog))]
    pub async fn get_history_at(
        &self,
        item: &ItemKey,
        catalog: Catalog,
        prices: &PriceAggregator,
        now: DateTime<Utc>,
    ) -> Result<HistorySeries> {
        let key = item.cache_key(catalog);

        if let Some(cached) = self
            .cache
            .get_json::<HistorySeries>(Domain::History, &key)
            .await?
        {
            debug!(points = cached.len(), "Cache hit for history");
            return Ok(cached);
        }

        let series = match self.scrape(item, catalog).await {
            Some(series) => series,
            None => Self::fallback(item, catalog, prices, now).await?,
        };

        if series.is_empty() {
            debug!("No usable history, not caching");
        } else {
            self.cache.put_json(Domain::History, &key, &series).await?;
        }
        Ok(series)
    }

    /// Scrapes the listing page; `None` when it yields no points.
    async fn scrape(&self, item: &ItemKey, catalog: Catalog) -> Option<HistorySeries> {
        let source = self.source.as_ref()?;
        match source.fetch_history(item, catalog).await {
            Ok(Some(series)) if !series.is_empty() => Some(series),
            Ok(_) => {
                debug!(source = source.name(), "Listing page carries no history");
                None
            }
            Err(e @ MarketError::FormatDrift { .. }) => {
                warn!(source = source.name(), error = %e, "History layout changed, falling back");
                None
            }
            Err(e) => {
                warn!(source = source.name(), error = %e, "History fetch failed, falling back");
                None
            }
        }
    }

    /// Builds a single point from the current quote, or an empty series.
    async fn fallback(
        item: &ItemKey,
        catalog: Catalog,
        prices: &PriceAggregator,
        now: DateTime<Utc>,
    ) -> Result<HistorySeries> {
        let quote = prices.get_price(item, catalog, false).await?;
        Ok(quote
            .steam_value()
            .map(|price| HistorySeries::from_points(vec![HistoryPoint::new(now, price, 1)]))
            .unwrap_or_default())
    }
}
