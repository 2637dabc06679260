#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/skinmarket/engine/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! lis-skins.com bulk price source.
//!
//! The export lists every open offer separately, so one item name can appear
//! many times. The snapshot keeps the lowest offer per item.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use skin_core::{
    BulkPriceSource, Catalog, MarketError, MarketSource, PriceField, PriceSnapshot, Result,
    canonical_key, format_usd,
};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Base URL of the JSON exports.
const EXPORT_URL: &str = "https://lis-skins.com/market_export_json";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const SOURCE_NAME: &str = "LIS-SKINS";

/// Catalogs traded on lis-skins.com.
const CATALOGS: &[Catalog] = &[Catalog::Cs2];

/// lis-skins.com bulk price source.
#[derive(Clone)]
pub struct LisSkinsMarket {
    client: Client,
}

impl fmt::Debug for LisSkinsMarket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LisSkinsMarket").finish_non_exhaustive()
    }
}

impl LisSkinsMarket {
    /// Create a lis-skins source with a 10 second timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a lis-skins source with a custom timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Create a lis-skins source with a custom HTTP client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Build the export URL for a catalog.
    fn url(catalog: Catalog) -> Result<String> {
        match catalog {
            Catalog::Cs2 => Ok(format!("{EXPORT_URL}/csgo.json")),
            Catalog::Dota2 => Err(MarketError::ProviderNotConfigured(format!(
                "{SOURCE_NAME} does not trade {catalog}"
            ))),
        }
    }

    /// Reduce the offer export to the lowest price per item.
    fn parse_snapshot(text: &str) -> Result<PriceSnapshot> {
        let offers: Vec<LisOffer> =
            serde_json::from_str(text).map_err(|e| MarketError::Parse(e.to_string()))?;

        let mut lowest: HashMap<String, (String, f64)> = HashMap::new();
        for offer in offers {
            if !offer.price.is_finite() || offer.price < 0.0 {
                continue;
            }
            lowest
                .entry(canonical_key(&offer.name))
                .and_modify(|(_, price)| *price = price.min(offer.price))
                .or_insert((offer.name, offer.price));
        }

        Ok(lowest
            .into_values()
            .map(|(name, price)| (name, format_usd(price)))
            .collect())
    }
}

impl Default for LisSkinsMarket {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketSource for LisSkinsMarket {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn catalogs(&self) -> &[Catalog] {
        CATALOGS
    }
}

#[async_trait]
impl BulkPriceSource for LisSkinsMarket {
    fn field(&self, _catalog: Catalog) -> PriceField {
        PriceField::LisSkins
    }

    async fn fetch_snapshot(&self, catalog: Catalog) -> Result<PriceSnapshot> {
        let url = Self::url(catalog)?;
        debug!("LIS-SKINS request: {}", url);

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

        Self::parse_snapshot(&text)
    }
}

/// One open offer of the export.
#[derive(Debug, Deserialize)]
struct LisOffer {
    name: String,
    price: f64,
}
