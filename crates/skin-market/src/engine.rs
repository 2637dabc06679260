//! The engine facade.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use polars::prelude::DataFrame;
use tracing::{debug, info, instrument, warn};

use skin_cache::{DEFAULT_RECOMMENDATION_TTL_HOURS, RecommendationCache};
use skin_core::{
    BulkPriceSource, CacheStore, CacheStoreExt, Catalog, Domain, HistorySeries, HistorySource,
    ItemKey, ListingItem, ListingSource, LiveQuoteSource, MarketError, PriceQuote, Result,
};
use skin_forecast::{ForecastEngine, ForecastResult, MAX_HORIZON, ScoringFunction};

use crate::aggregator::PriceAggregator;
use crate::config::EngineConfig;
use crate::history::HistoryIngester;
use crate::recommend::{Favorite, RECOMMENDATION_HORIZON, Recommendation, Recommendations};

const DEFAULT_POPULAR_ITEMS_COUNT: usize = 50;
const DEFAULT_SEARCH_RESULTS_COUNT: usize = 20;

/// Price, history, forecast and listing operations over one cache.
///
/// Callers pass raw item names and app ids as received; both are validated
/// before any I/O.
///
/// # Example
///
/// ```rust,ignore
/// use skin_market::{EngineConfig, MarketEngine};
///
/// #[tokio::main]
/// async fn main() -> skin_market::Result<()> {
///     let engine = MarketEngine::from_config(&EngineConfig::from_env()?)?;
///
///     let quote = engine.get_price("Glove Case", 730, false).await?;
///     println!("{}", quote.steam_price);
///
///     let forecast = engine.predict("Glove Case", 730, 7).await?;
///     println!("{:?}", forecast.predictions);
///     Ok(())
/// }
/// ```
pub struct MarketEngine {
    cache: Arc<dyn CacheStore>,
    prices: PriceAggregator,
    history: HistoryIngester,
    listings: Option<Arc<dyn ListingSource>>,
    models: HashMap<Catalog, Arc<dyn ScoringFunction>>,
    recommendations: RecommendationCache,
    popular_items_count: usize,
    search_results_count: usize,
}

impl fmt::Debug for MarketEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut models: Vec<_> = self.models.keys().copied().collect();
        models.sort_by_key(|c| c.app_id());
        f.debug_struct("MarketEngine")
            .field("prices", &self.prices)
            .field("history", &self.history)
            .field("listings", &self.listings.as_ref().map(|l| l.name()))
            .field("models", &models)
            .field("recommendations", &self.recommendations)
            .finish_non_exhaustive()
    }
}

/// Validates the raw inputs of an item operation.
fn item_request(name: &str, app_id: u32) -> Result<(ItemKey, Catalog)> {
    let catalog = Catalog::try_from(app_id)?;
    let item = ItemKey::new(name);
    if item.canonical().is_empty() {
        return Err(MarketError::InvalidParameter(
            "item name must not be empty".to_string(),
        ));
    }
    Ok((item, catalog))
}

impl MarketEngine {
    /// Creates an engine without sources or models.
    #[must_use]
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self {
            prices: PriceAggregator::new(cache.clone()),
            history: HistoryIngester::new(cache.clone()),
            recommendations: RecommendationCache::with_ttl(
                cache.clone(),
                TimeDelta::hours(DEFAULT_RECOMMENDATION_TTL_HOURS),
            ),
            cache,
            listings: None,
            models: HashMap::new(),
            popular_items_count: DEFAULT_POPULAR_ITEMS_COUNT,
            search_results_count: DEFAULT_SEARCH_RESULTS_COUNT,
        }
    }

    /// Builds an engine with every marketplace, a SQLite cache and the
    /// configured models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or a model file
    /// cannot be loaded.
    #[cfg(all(feature = "steam", feature = "tm", feature = "lis", feature = "cache-sqlite"))]
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let cache = Arc::new(skin_cache::SqliteCache::new(&config.database_path)?);

        let mut steam =
            skin_steam::SteamMarket::with_timeout(config.http_timeout(), config.max_attempts)
                .with_currency(config.steam_currency);
        if let Some(cookie) = &config.steam_login_cookie {
            steam = steam.with_login_cookie(cookie.clone());
        }

        let mut engine = Self::new(cache)
            .with_settings(config)?
            .with_steam(steam)
            .with_secondary(Arc::new(skin_tm::TmMarket::with_timeout(
                config.http_timeout(),
            )))
            .with_secondary(Arc::new(skin_lis::LisSkinsMarket::with_timeout(
                config.http_timeout(),
            )));

        for catalog in Catalog::ALL {
            if let Some(path) = config.model_path(catalog) {
                let model = skin_forecast::LinearModel::from_path(path)?;
                info!(catalog = %catalog, path = %path.display(), "Loaded scoring function");
                engine = engine.with_model(catalog, Arc::new(model));
            }
        }
        Ok(engine)
    }

    /// Applies the TTL and listing sizes of a configuration.
    ///
    /// # Errors
    /// Returns [`MarketError::InvalidParameter`] if the recommendation TTL is
    /// out of range.
    pub fn with_settings(mut self, config: &EngineConfig) -> Result<Self> {
        self.recommendations =
            RecommendationCache::with_ttl(self.cache.clone(), config.recommendation_ttl()?);
        self.popular_items_count = config.popular_items_count;
        self.search_results_count = config.search_results_count;
        Ok(self)
    }

    /// Sets the primary live-quote source.
    #[must_use]
    pub fn with_primary(mut self, source: Arc<dyn LiveQuoteSource>) -> Self {
        self.prices.set_primary(source);
        self
    }

    /// Adds a secondary bulk price source.
    #[must_use]
    pub fn with_secondary(mut self, source: Arc<dyn BulkPriceSource>) -> Self {
        self.prices.register_secondary(source);
        self
    }

    /// Sets the sale-history source.
    #[must_use]
    pub fn with_history_source(mut self, source: Arc<dyn HistorySource>) -> Self {
        self.history.set_source(source);
        self
    }

    /// Sets the popular-items and search source.
    #[must_use]
    pub fn with_listing_source(mut self, source: Arc<dyn ListingSource>) -> Self {
        debug!(source = source.name(), "Registering listing source");
        self.listings = Some(source);
        self
    }

    /// Uses the Steam Community Market for quotes, history and listings.
    #[cfg(feature = "steam")]
    #[must_use]
    pub fn with_steam(self, steam: skin_steam::SteamMarket) -> Self {
        let steam = Arc::new(steam);
        self.with_primary(steam.clone())
            .with_history_source(steam.clone())
            .with_listing_source(steam)
    }

    /// Sets the scoring function of a catalog.
    #[must_use]
    pub fn with_model(mut self, catalog: Catalog, model: Arc<dyn ScoringFunction>) -> Self {
        self.models.insert(catalog, model);
        self
    }

    /// Returns the composite price of an item.
    ///
    /// # Errors
    /// Returns an error for an unknown app id, an empty name or a cache failure.
    /// Marketplace failures show up as `"N/A"` fields instead.
    pub async fn get_price(
        &self,
        name: &str,
        app_id: u32,
        force_refresh: bool,
    ) -> Result<PriceQuote> {
        let (item, catalog) = item_request(name, app_id)?;
        self.prices.get_price(&item, catalog, force_refresh).await
    }

    /// Returns the sale history of an item.
    ///
    /// # Errors
    /// Returns an error for an unknown app id, an empty name or a cache failure.
    pub async fn get_history(&self, name: &str, app_id: u32) -> Result<HistorySeries> {
        let (item, catalog) = item_request(name, app_id)?;
        self.history.get_history(&item, catalog, &self.prices).await
    }

    /// Returns the sale history of an item as a DataFrame.
    ///
    /// # Errors
    /// Same as [`get_history`](Self::get_history).
    pub async fn get_history_frame(&self, name: &str, app_id: u32) -> Result<DataFrame> {
        self.get_history(name, app_id).await?.to_dataframe()
    }

    /// Forecasts an item's price `horizon` days ahead.
    ///
    /// # Errors
    /// - [`MarketError::InvalidParameter`] for a horizon outside `1..=14`, an
    ///   unknown app id or an empty name
    /// - [`MarketError::ProviderNotConfigured`] if the catalog has no model
    /// - [`MarketError::InsufficientData`] if the history is too short
    #[instrument(skip(self))]
    pub async fn predict(&self, name: &str, app_id: u32, horizon: usize) -> Result<ForecastResult> {
        if !(1..=MAX_HORIZON).contains(&horizon) {
            return Err(MarketError::InvalidParameter(format!(
                "horizon must be between 1 and {MAX_HORIZON} days, got {horizon}"
            )));
        }
        let (item, catalog) = item_request(name, app_id)?;
        let model = self.models.get(&catalog).cloned().ok_or_else(|| {
            MarketError::ProviderNotConfigured(format!("no scoring function for {catalog}"))
        })?;

        let history = self.history.get_history(&item, catalog, &self.prices).await?;
        ForecastEngine::new(model).forecast(&history, horizon)
    }

    /// Clears every cached record of every domain.
    ///
    /// # Errors
    /// Returns an error if the cache fails.
    pub async fn reset_all_caches(&self) -> Result<()> {
        info!("Clearing all caches");
        self.cache.clear_all().await
    }

    fn listing_source(&self) -> Result<&Arc<dyn ListingSource>> {
        self.listings.as_ref().ok_or_else(|| {
            MarketError::ProviderNotConfigured("No listing source registered".to_string())
        })
    }

    /// Returns the most popular items of a catalog.
    ///
    /// # Errors
    /// Returns an error for an unknown app id, a missing listing source, an
    /// upstream failure or a cache failure.
    #[instrument(skip(self))]
    pub async fn popular_items(&self, app_id: u32, force_refresh: bool) -> Result<Vec<ListingItem>> {
        let catalog = Catalog::try_from(app_id)?;
        let source = self.listing_source()?;
        let key = catalog.app_id().to_string();

        if !force_refresh {
            if let Some(cached) = self
                .cache
                .get_json::<Vec<ListingItem>>(Domain::PopularItems, &key)
                .await?
            {
                debug!("Cache hit for popular items");
                return Ok(cached);
            }
        }

        let items = source.popular(catalog, self.popular_items_count).await?;
        self.cache
            .put_json(Domain::PopularItems, &key, &items)
            .await?;
        Ok(items)
    }

    /// Searches a catalog by free text.
    ///
    /// # Errors
    /// Returns an error for an empty query, an unknown app id, a missing
    /// listing source or an upstream failure.
    pub async fn search_items(&self, app_id: u32, query: &str) -> Result<Vec<ListingItem>> {
        let catalog = Catalog::try_from(app_id)?;
        let query = query.trim();
        if query.is_empty() {
            return Err(MarketError::InvalidParameter(
                "search query must not be empty".to_string(),
            ));
        }
        self.listing_source()?
            .search(catalog, query, self.search_results_count)
            .await
    }

    /// Returns a user's recommendations if they are still fresh.
    ///
    /// # Errors
    /// Returns an error if the cache fails or the stored blob does not parse.
    pub async fn recommendations(&self, user: &str) -> Result<Option<Recommendations>> {
        self.recommendations
            .get(user)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(MarketError::from)
    }

    /// Forecasts every favorite a week ahead and ranks them.
    ///
    /// Favorites without enough history, without a current price or without a
    /// model for their catalog are left out of the ranking.
    ///
    /// # Errors
    /// Returns an error if the cache fails.
    #[instrument(skip(self, favorites), fields(favorites = favorites.len()))]
    pub async fn build_recommendations(
        &self,
        user: &str,
        favorites: &[Favorite],
        force_refresh: bool,
    ) -> Result<Recommendations> {
        if !force_refresh {
            if let Some(fresh) = self.recommendations(user).await? {
                debug!("Recommendations are fresh");
                return Ok(fresh);
            }
        }

        let mut evaluated = Vec::with_capacity(favorites.len());
        for favorite in favorites {
            let name = favorite.market_hash_name.as_str();
            let app_id = favorite.catalog.app_id();

            let forecast = match self.predict(name, app_id, RECOMMENDATION_HORIZON).await {
                Ok(forecast) => forecast,
                Err(
                    e @ (MarketError::InsufficientData(_) | MarketError::ProviderNotConfigured(_)),
                ) => {
                    debug!(item = name, error = %e, "Skipping favorite");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let quote = self.get_price(name, app_id, false).await?;
            let (Some(current), Some(predicted)) = (quote.steam_value(), forecast.final_price())
            else {
                warn!(item = name, "No current price, skipping favorite");
                continue;
            };

            evaluated.push(Recommendation::new(
                name,
                favorite.catalog,
                current,
                predicted,
            ));
        }

        let ranked = Recommendations::rank(evaluated, Utc::now());
        self.recommendations
            .put(user, &serde_json::to_value(&ranked)?)
            .await?;
        Ok(ranked)
    }
}
