//! Source traits for fetching marketplace data.
//!
//! This module defines the core source traits:
//!
//! - [`MarketSource`] - Base trait for all marketplaces
//! - [`LiveQuoteSource`] - Per-item live price (the primary marketplace)
//! - [`BulkPriceSource`] - Whole-market price list (secondary marketplaces)
//! - [`HistorySource`] - Listing pages carrying embedded sale history
//! - [`ListingSource`] - Popular-items and search listings

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    catalog::{Catalog, PriceField},
    error::Result,
    types::{HistorySeries, ItemKey, ListingItem, PriceSnapshot},
};

/// Base trait for all marketplace sources.
pub trait MarketSource: Send + Sync + Debug {
    /// Returns the name of this marketplace (e.g., "Steam Community Market").
    fn name(&self) -> &str;

    /// Returns the catalogs this marketplace trades.
    fn catalogs(&self) -> &[Catalog];

    /// Returns true if this marketplace trades the catalog.
    fn supports(&self, catalog: Catalog) -> bool {
        self.catalogs().contains(&catalog)
    }
}

/// Source of per-item live prices.
#[async_trait]
pub trait LiveQuoteSource: MarketSource {
    /// Fetches the current price text of an item (e.g. `"$1.23"`).
    ///
    /// Returns `Ok(None)` when the marketplace answered but has no price.
    async fn fetch_quote(&self, item: &ItemKey, catalog: Catalog) -> Result<Option<String>>;
}

/// Source of whole-market price lists.
#[async_trait]
pub trait BulkPriceSource: MarketSource {
    /// Returns the quote field this marketplace fills for a catalog.
    fn field(&self, catalog: Catalog) -> PriceField;

    /// Fetches the full price list for a catalog.
    async fn fetch_snapshot(&self, catalog: Catalog) -> Result<PriceSnapshot>;
}

/// Source of sale history.
#[async_trait]
pub trait HistorySource: MarketSource {
    /// Fetches and extracts the sale history embedded in an item's listing page.
    ///
    /// Returns `Ok(None)` when the page carries no history. Pages whose
    /// embedded history no longer parses yield
    /// [`MarketError::FormatDrift`](crate::MarketError::FormatDrift).
    async fn fetch_history(&self, item: &ItemKey, catalog: Catalog)
    -> Result<Option<HistorySeries>>;
}

/// Source of item listings.
#[async_trait]
pub trait ListingSource: MarketSource {
    /// Fetches the most popular items of a catalog.
    async fn popular(&self, catalog: Catalog, count: usize) -> Result<Vec<ListingItem>>;

    /// Searches a catalog by free text.
    async fn search(&self, catalog: Catalog, query: &str, count: usize)
    -> Result<Vec<ListingItem>>;
}
