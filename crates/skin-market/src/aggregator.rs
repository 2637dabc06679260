//! Composite price quotes.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use skin_core::{
    BulkPriceSource, CacheStore, CacheStoreExt, Catalog, Domain, ItemKey, LiveQuoteSource,
    PriceQuote, PriceSnapshot, Result,
};

/// Composes one item's price from a live primary quote and bulk secondary
/// snapshots.
///
/// Upstream failures degrade the affected field to `"N/A"`; only cache I/O
/// can fail a call.
#[derive(Clone)]
pub struct PriceAggregator {
    cache: Arc<dyn CacheStore>,
    primary: Option<Arc<dyn LiveQuoteSource>>,
    secondaries: Vec<Arc<dyn BulkPriceSource>>,
}

impl fmt::Debug for PriceAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceAggregator")
            .field("primary", &self.primary.as_ref().map(|p| p.name()))
            .field(
                "secondaries",
                &self.secondaries.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Cache key of a bulk snapshot.
#[must_use]
pub fn snapshot_key(source: &dyn BulkPriceSource, catalog: Catalog) -> String {
    format!(
        "snapshot:{}:{}",
        source.field(catalog).field_name(),
        catalog.app_id()
    )
}

impl PriceAggregator {
    /// Creates an aggregator without sources.
    #[must_use]
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self {
            cache,
            primary: None,
            secondaries: Vec::new(),
        }
    }

    /// Sets the primary live-quote source.
    pub fn set_primary(&mut self, source: Arc<dyn LiveQuoteSource>) {
        debug!(source = source.name(), "Registering primary quote source");
        self.primary = Some(source);
    }

    /// Registers a secondary bulk source.
    pub fn register_secondary(&mut self, source: Arc<dyn BulkPriceSource>) {
        debug!(source = source.name(), "Registering secondary price source");
        self.secondaries.push(source);
    }

    /// Returns the composite quote of an item.
    ///
    /// A cached quote is returned unchanged unless `force_refresh` is set.
    /// Otherwise every field is fetched anew and the cached quote is replaced.
    ///
    /// # Errors
    /// Returns an error only if the cache fails.
    #[instrument(skip(self, item), fields(item = %item, catalog = %catalog))]
    pub async fn get_price(
        &self,
        item: &ItemKey,
        catalog: Catalog,
        force_refresh: bool,
    ) -> Result<PriceQuote> {
        let key = item.cache_key(catalog);

        if !force_refresh {
            if let Some(cached) = self.cache.get_json::<PriceQuote>(Domain::Price, &key).await? {
                debug!("Cache hit for price");
                return Ok(cached);
            }
        }

        let mut quote = PriceQuote::unavailable(item, catalog);

        if let Some(primary) = &self.primary {
            match primary.fetch_quote(item, catalog).await {
                Ok(Some(price)) => quote.steam_price = price,
                Ok(None) => debug!(source = primary.name(), "No live price"),
                Err(e) => warn!(
                    source = primary.name(),
                    error = %e,
                    "Live quote failed, using N/A"
                ),
            }
        }

        let fields = catalog.secondary_fields();
        for source in &self.secondaries {
            if !source.supports(catalog) || !fields.contains(&source.field(catalog)) {
                continue;
            }
            let snapshot = self.snapshot(source.as_ref(), catalog).await?;
            if let Some(price) = snapshot.get(item) {
                quote = quote.with_price(source.field(catalog), price);
            }
        }

        self.cache.put_json(Domain::Price, &key, &quote).await?;
        Ok(quote)
    }

    /// Returns the bulk snapshot of a secondary source, fetching it on first use.
    ///
    /// A failed fetch yields an empty snapshot that is not cached.
    ///
    /// # Errors
    /// Returns an error only if the cache fails.
    pub async fn snapshot(
        &self,
        source: &dyn BulkPriceSource,
        catalog: Catalog,
    ) -> Result<PriceSnapshot> {
        let key = snapshot_key(source, catalog);

        if let Some(cached) = self
            .cache
            .get_json::<PriceSnapshot>(Domain::Price, &key)
            .await?
        {
            return Ok(cached);
        }

        match source.fetch_snapshot(catalog).await {
            Ok(snapshot) => {
                debug!(
                    source = source.name(),
                    items = snapshot.len(),
                    "Caching bulk snapshot"
                );
                self.cache.put_json(Domain::Price, &key, &snapshot).await?;
                Ok(snapshot)
            }
            Err(e) => {
                warn!(
                    source = source.name(),
                    error = %e,
                    "Bulk snapshot failed, prices from this source are N/A"
                );
                Ok(PriceSnapshot::new())
            }
        }
    }
}
