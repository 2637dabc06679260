#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/skinmarket/engine/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Steam Community Market source.
//!
//! This crate provides [`SteamMarket`], which implements the
//! [`LiveQuoteSource`], [`HistorySource`] and [`ListingSource`] traits from
//! `skin-core`.
//!
//! # Features
//!
//! - Live quotes from the `priceoverview` endpoint, retried with exponential
//!   backoff on 429/500/502/503/504 only
//! - Sale history scraped from listing pages (see [`history`])
//! - Popular-items and search listings from the `search/render` endpoint
//!
//! # Example
//!
//! ```no_run
//! use skin_steam::SteamMarket;
//! use skin_core::{Catalog, ItemKey, LiveQuoteSource};
//!
//! # async fn example() -> skin_core::Result<()> {
//! let steam = SteamMarket::new();
//! let price = steam
//!     .fetch_quote(&ItemKey::new("Glove Case"), Catalog::Cs2)
//!     .await?;
//! println!("{price:?}");
//! # Ok(())
//! # }
//! ```

/// HTTP clients and the transient-status retry strategy.
pub mod client;
/// Listing-page history extraction.
pub mod history;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use skin_core::{
    Catalog, HistorySeries, HistorySource, ItemKey, ListingItem, ListingSource, LiveQuoteSource,
    MarketError, MarketSource, NOT_AVAILABLE, Result,
};
use tracing::{debug, error, warn};

pub use client::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT, TransientStatusStrategy, is_transient};
pub use history::extract_price_history;

/// Steam Community Market base URL.
const MARKET_URL: &str = "https://steamcommunity.com/market";

/// Base URL of item icons.
const ICON_URL: &str = "https://community.cloudflare.steamstatic.com/economy/image";

/// Steam currency code for USD.
const USD_CURRENCY: u32 = 1;

const SOURCE_NAME: &str = "Steam Community Market";

/// Steam Community Market source.
///
/// Implements [`LiveQuoteSource`], [`HistorySource`] and [`ListingSource`].
/// Only live quotes are retried; pages and listings get a single attempt.
#[derive(Clone)]
pub struct SteamMarket {
    client: reqwest::Client,
    quote_client: reqwest_middleware::ClientWithMiddleware,
    currency: u32,
    login_cookie: Option<String>,
}

impl fmt::Debug for SteamMarket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SteamMarket")
            .field("currency", &self.currency)
            .field(
                "login_cookie",
                &self.login_cookie.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl SteamMarket {
    /// Create a Steam source with default settings.
    ///
    /// 10 second timeout, 3 attempts for live quotes, prices in USD.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT, DEFAULT_MAX_ATTEMPTS)
    }

    /// Create a Steam source with a custom timeout and live-quote attempt budget.
    #[must_use]
    pub fn with_timeout(timeout: Duration, max_attempts: u32) -> Self {
        Self {
            client: client::plain_client(timeout),
            quote_client: client::retrying_client(timeout, max_attempts),
            currency: USD_CURRENCY,
            login_cookie: None,
        }
    }

    /// Sets the Steam currency code used for live quotes.
    #[must_use]
    pub const fn with_currency(mut self, currency: u32) -> Self {
        self.currency = currency;
        self
    }

    /// Sets the `steamLoginSecure` cookie sent with listing-page requests.
    ///
    /// Steam only embeds sale history in pages served to a signed-in session.
    #[must_use]
    pub fn with_login_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.login_cookie = Some(cookie.into());
        self
    }

    /// Build the `priceoverview` URL for an item.
    fn build_quote_url(&self, item: &ItemKey, catalog: Catalog) -> Result<Url> {
        Url::parse_with_params(
            &format!("{MARKET_URL}/priceoverview/"),
            &[
                ("appid", catalog.app_id().to_string()),
                ("currency", self.currency.to_string()),
                ("market_hash_name", item.name().to_string()),
            ],
        )
        .map_err(|e| MarketError::InvalidParameter(e.to_string()))
    }

    /// Build the listing page URL for an item.
    fn build_listing_url(item: &ItemKey, catalog: Catalog) -> Result<Url> {
        let mut url = Url::parse(&format!("{MARKET_URL}/listings"))
            .map_err(|e| MarketError::Other(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| MarketError::Other("listing URL cannot be a base".to_string()))?
            .push(&catalog.app_id().to_string())
            .push(item.name());
        Ok(url)
    }

    /// Build the `search/render` URL.
    fn build_search_url(catalog: Catalog, query: &str, count: usize) -> Result<Url> {
        Url::parse_with_params(
            &format!("{MARKET_URL}/search/render/"),
            &[
                ("query", query.to_string()),
                ("start", "0".to_string()),
                ("count", count.to_string()),
                ("search_descriptions", "0".to_string()),
                ("sort_column", "popular".to_string()),
                ("sort_dir", "desc".to_string()),
                ("appid", catalog.app_id().to_string()),
                ("norender", "1".to_string()),
            ],
        )
        .map_err(|e| MarketError::InvalidParameter(e.to_string()))
    }

    /// Map a non-success status to an error.
    fn status_error(status: StatusCode) -> MarketError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            MarketError::RateLimited {
                source_name: SOURCE_NAME.to_string(),
                retry_after: Some(Duration::from_secs(60)),
            }
        } else {
            MarketError::Upstream {
                source_name: SOURCE_NAME.to_string(),
                status: status.as_u16(),
            }
        }
    }

    /// Fetch a listing from `search/render`.
    async fn fetch_listing(
        &self,
        catalog: Catalog,
        query: &str,
        count: usize,
    ) -> Result<Vec<ListingItem>> {
        let url = Self::build_search_url(catalog, query, count)?;
        debug!("Fetching listing: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response.status()));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        if !search.success {
            return Err(MarketError::Upstream {
                source_name: SOURCE_NAME.to_string(),
                status: StatusCode::OK.as_u16(),
            });
        }

        Ok(search.results.into_iter().map(ListingItem::from).collect())
    }
}

impl Default for SteamMarket {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketSource for SteamMarket {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn catalogs(&self) -> &[Catalog] {
        &Catalog::ALL
    }
}

#[async_trait]
impl LiveQuoteSource for SteamMarket {
    async fn fetch_quote(&self, item: &ItemKey, catalog: Catalog) -> Result<Option<String>> {
        let url = self.build_quote_url(item, catalog)?;
        debug!("Fetching quote: {}", url);

        let response = self
            .quote_client
            .get(url)
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(MarketError::ItemNotFound(item.to_string()));
        }

        if !response.status().is_success() {
            return Err(Self::status_error(response.status()));
        }

        let overview: PriceOverview = response
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        Ok(overview.best_price())
    }
}

#[async_trait]
impl HistorySource for SteamMarket {
    async fn fetch_history(
        &self,
        item: &ItemKey,
        catalog: Catalog,
    ) -> Result<Option<HistorySeries>> {
        let url = Self::build_listing_url(item, catalog)?;
        debug!("Fetching listing page: {}", url);

        let mut request = self.client.get(url);
        if let Some(cookie) = &self.login_cookie {
            request = request.header(reqwest::header::COOKIE, format!("steamLoginSecure={cookie}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response.status()));
        }

        let page = response
            .text()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        match extract_price_history(&page) {
            Ok(series) => Ok(series),
            Err(e) => {
                error!(item = %item, error = %e, "Listing page no longer matches history layout");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ListingSource for SteamMarket {
    async fn popular(&self, catalog: Catalog, count: usize) -> Result<Vec<ListingItem>> {
        self.fetch_listing(catalog, "", count).await
    }

    async fn search(&self, catalog: Catalog, query: &str, count: usize) -> Result<Vec<ListingItem>> {
        let query = query.trim();
        if query.is_empty() {
            warn!("Rejecting empty search query");
            return Err(MarketError::InvalidParameter(
                "search query must not be empty".to_string(),
            ));
        }
        self.fetch_listing(catalog, query, count).await
    }
}

// ============================================================================
// Steam Community Market Response Types
// ============================================================================

/// `priceoverview` response.
#[derive(Debug, Deserialize)]
struct PriceOverview {
    success: bool,
    lowest_price: Option<String>,
    median_price: Option<String>,
}

impl PriceOverview {
    /// Lowest listing price, falling back to the median sale price.
    fn best_price(self) -> Option<String> {
        if !self.success {
            return None;
        }
        self.lowest_price.or(self.median_price)
    }
}

/// `search/render` response.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    success: bool,
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    name: String,
    hash_name: String,
    #[serde(default)]
    sell_listings: u64,
    sell_price_text: Option<String>,
    asset_description: Option<AssetDescription>,
}

#[derive(Debug, Deserialize)]
struct AssetDescription {
    icon_url: Option<String>,
}

impl From<SearchResult> for ListingItem {
    fn from(result: SearchResult) -> Self {
        Self {
            name: result.name,
            market_hash_name: result.hash_name,
            price: result
                .sell_price_text
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            listings: result.sell_listings,
            icon_url: result
                .asset_description
                .and_then(|d| d.icon_url)
                .map(|icon| format!("{ICON_URL}/{icon}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_quote_url() {
        let steam = SteamMarket::new();
        let url = steam
            .build_quote_url(&ItemKey::new("AK-47 | Redline (Field-Tested)"), Catalog::Cs2)
            .unwrap();

        let url = url.as_str();
        assert!(url.starts_with("https://steamcommunity.com/market/priceoverview/?"));
        assert!(url.contains("appid=730"));
        assert!(url.contains("currency=1"));
        assert!(url.contains("market_hash_name=AK-47+%7C+Redline+%28Field-Tested%29"));
    }

    #[test]
    fn test_build_listing_url_encodes_name() {
        let url =
            SteamMarket::build_listing_url(&ItemKey::new("Genuine Dragonclaw Hook"), Catalog::Dota2)
                .unwrap();
        assert_eq!(
            url.as_str(),
            "https://steamcommunity.com/market/listings/570/Genuine%20Dragonclaw%20Hook"
        );
    }

    #[test]
    fn test_build_search_url() {
        let url = SteamMarket::build_search_url(Catalog::Cs2, "case", 50).unwrap();
        let url = url.as_str();
        assert!(url.contains("query=case"));
        assert!(url.contains("count=50"));
        assert!(url.contains("norender=1"));
    }

    #[test]
    fn test_price_overview_prefers_lowest_price() {
        let overview: PriceOverview = serde_json::from_str(
            r#"{"success":true,"lowest_price":"$0.41","volume":"12,345","median_price":"$0.40"}"#,
        )
        .unwrap();
        assert_eq!(overview.best_price().as_deref(), Some("$0.41"));

        let overview: PriceOverview =
            serde_json::from_str(r#"{"success":true,"median_price":"$0.40"}"#).unwrap();
        assert_eq!(overview.best_price().as_deref(), Some("$0.40"));

        let overview: PriceOverview = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert_eq!(overview.best_price(), None);
    }

    #[test]
    fn test_search_result_conversion() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"success":true,"start":0,"pagesize":1,"total_count":1,"results":[
                {"name":"Glove Case","hash_name":"Glove Case","sell_listings":84211,
                 "sell_price":41,"sell_price_text":"$0.41",
                 "asset_description":{"appid":730,"icon_url":"abc123"}}]}"#,
        )
        .unwrap();

        let items: Vec<ListingItem> = response.results.into_iter().map(ListingItem::from).collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].price, "$0.41");
        assert_eq!(items[0].listings, 84211);
        assert_eq!(
            items[0].icon_url.as_deref(),
            Some("https://community.cloudflare.steamstatic.com/economy/image/abc123")
        );
    }

    #[tokio::test]
    async fn test_empty_search_is_rejected_before_io() {
        let steam = SteamMarket::new();
        let result = steam.search(Catalog::Cs2, "   ", 10).await;
        assert!(matches!(result, Err(MarketError::InvalidParameter(_))));
    }

    #[test]
    fn test_provider_info() {
        let steam = SteamMarket::default().with_login_cookie("secret");
        assert_eq!(steam.name(), "Steam Community Market");
        assert!(steam.supports(Catalog::Dota2));
        assert!(!format!("{steam:?}").contains("secret"));
    }
}
