#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/skinmarket/engine/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! TM marketplace bulk price source.
//!
//! This crate implements the skin-core [`BulkPriceSource`] trait for the two
//! TM storefronts, which share one API:
//!
//! | Catalog | Host | Quote field |
//! |---------|------|-------------|
//! | CS2 | market.csgo.com | `market_csgo_price` |
//! | Dota 2 | market.dota2.net | `market_dota2_price` |
//!
//! # Usage
//!
//! ```rust,ignore
//! use skin_tm::TmMarket;
//! use skin_core::{BulkPriceSource, Catalog};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tm = TmMarket::new();
//!     let snapshot = tm.fetch_snapshot(Catalog::Cs2).await?;
//!     println!("{} prices", snapshot.len());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use skin_core::{
    BulkPriceSource, Catalog, MarketError, MarketSource, PriceField, PriceSnapshot, Result,
    format_usd,
};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Price list path shared by both storefronts.
const PRICES_PATH: &str = "api/v2/prices/USD.json";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const SOURCE_NAME: &str = "TM Market";

/// market.csgo.com / market.dota2.net bulk price source.
///
/// Provides the whole-market USD price list of a catalog in one request.
/// Failures are returned as errors; the caller decides how to degrade.
#[derive(Clone)]
pub struct TmMarket {
    client: Client,
}

impl fmt::Debug for TmMarket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmMarket").finish_non_exhaustive()
    }
}

impl TmMarket {
    /// Create a TM source with a 10 second timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a TM source with a custom timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Create a TM source with a custom HTTP client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Returns the storefront host for a catalog.
    #[must_use]
    pub const fn host(catalog: Catalog) -> &'static str {
        match catalog {
            Catalog::Cs2 => "market.csgo.com",
            Catalog::Dota2 => "market.dota2.net",
        }
    }

    /// Build the price list URL for a catalog.
    fn url(catalog: Catalog) -> String {
        format!("https://{}/{PRICES_PATH}", Self::host(catalog))
    }

    /// Parse a price list body into a snapshot.
    fn parse_snapshot(text: &str) -> Result<PriceSnapshot> {
        let prices: TmPriceList =
            serde_json::from_str(text).map_err(|e| MarketError::Parse(e.to_string()))?;

        if !prices.success {
            return Err(MarketError::Upstream {
                source_name: SOURCE_NAME.to_string(),
                status: StatusCode::OK.as_u16(),
            });
        }

        Ok(prices
            .items
            .into_iter()
            .filter_map(|item| {
                let price = item.price.value()?;
                Some((item.market_hash_name, format_usd(price)))
            })
            .collect())
    }
}

impl Default for TmMarket {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketSource for TmMarket {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn catalogs(&self) -> &[Catalog] {
        &Catalog::ALL
    }
}

#[async_trait]
impl BulkPriceSource for TmMarket {
    fn field(&self, catalog: Catalog) -> PriceField {
        match catalog {
            Catalog::Cs2 => PriceField::MarketCsgo,
            Catalog::Dota2 => PriceField::MarketDota2,
        }
    }

    async fn fetch_snapshot(&self, catalog: Catalog) -> Result<PriceSnapshot> {
        let url = Self::url(catalog);
        debug!("TM request: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketError::RateLimited {
                source_name: SOURCE_NAME.to_string(),
                retry_after: None,
            });
        }

        if !response.status().is_success() {
            return Err(MarketError::Upstream {
                source_name: SOURCE_NAME.to_string(),
                status: response.status().as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        let snapshot = Self::parse_snapshot(&text)?;
        debug!(host = Self::host(catalog), items = snapshot.len(), "TM snapshot loaded");
        Ok(snapshot)
    }
}

/// TM price list response.
#[derive(Debug, Deserialize)]
struct TmPriceList {
    success: bool,
    #[serde(default)]
    items: Vec<TmItem>,
}

/// TM price list entry.
#[derive(Debug, Deserialize)]
struct TmItem {
    market_hash_name: String,
    price: TmPrice,
}

/// Prices arrive as decimal strings; older dumps used numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TmPrice {
    Text(String),
    Number(f64),
}

impl TmPrice {
    fn value(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        };
        value.filter(|v: &f64| v.is_finite())
    }
}
