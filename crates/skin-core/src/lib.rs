#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/skinmarket/engine/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the skin market engine.
//!
//! This crate provides the foundational abstractions:
//!
//! - [`CacheStore`](cache::CacheStore) - Domain-partitioned key/value cache
//! - [`LiveQuoteSource`](source::LiveQuoteSource) - Primary per-item prices
//! - [`BulkPriceSource`](source::BulkPriceSource) - Secondary bulk price lists
//! - [`HistorySource`](source::HistorySource) - Embedded sale history
//! - [`ListingSource`](source::ListingSource) - Popular and search listings

/// Cache trait and types for storing fetched data.
pub mod cache;
/// Catalog and quote field definitions.
pub mod catalog;
/// Error types for market operations.
pub mod error;
/// Source traits for fetching marketplace data.
pub mod source;
/// Core data types (ItemKey, PriceQuote, HistorySeries, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::{CacheRecord, CacheStore, CacheStoreExt, Domain};
pub use catalog::{Catalog, PriceField};
pub use error::{MarketError, Result};
pub use source::{BulkPriceSource, HistorySource, ListingSource, LiveQuoteSource, MarketSource};
pub use types::{
    HistoryPoint, HistorySeries, ItemKey, ListingItem, NOT_AVAILABLE, PriceQuote, PriceSnapshot,
    canonical_key, format_usd, parse_price,
};
