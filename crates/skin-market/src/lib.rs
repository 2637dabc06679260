#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/skinmarket/engine/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Price caching and forecasting engine.
//!
//! This crate ties the marketplace sources, the cache stores and the
//! forecaster together behind [`MarketEngine`]. It re-exports the core types
//! and, depending on features, the source implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use skin_market::{EngineConfig, Favorite, Catalog, MarketEngine};
//!
//! #[tokio::main]
//! async fn main() -> skin_market::Result<()> {
//!     let engine = MarketEngine::from_config(&EngineConfig::from_env()?)?;
//!
//!     let history = engine.get_history("Glove Case", 730).await?;
//!     println!("{} points", history.len());
//!
//!     let favorites = [Favorite::new("Glove Case", Catalog::Cs2)];
//!     let ranked = engine.build_recommendations("76561198000000001", &favorites, false).await?;
//!     println!("{:?}", ranked.risers);
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use skin_core::*;

// Cache implementations
#[cfg(feature = "cache-sqlite")]
pub use skin_cache::SqliteCache;
pub use skin_cache::{InMemoryCache, NoopCache, RecommendationCache};

// Forecasting
pub use skin_forecast::{
    FeatureFrame, ForecastEngine, ForecastPoint, ForecastResult, LinearModel, ScoringFunction,
};

// Sources
#[cfg(feature = "lis")]
pub use skin_lis::LisSkinsMarket;
#[cfg(feature = "steam")]
pub use skin_steam::SteamMarket;
#[cfg(feature = "tm")]
pub use skin_tm::TmMarket;

mod aggregator;
mod config;
mod engine;
mod history;
mod recommend;

#[cfg(test)]
mod testing;

pub use aggregator::{PriceAggregator, snapshot_key};
pub use config::EngineConfig;
pub use engine::MarketEngine;
pub use history::HistoryIngester;
pub use recommend::{Favorite, RECOMMENDATION_HORIZON, Recommendation, Recommendations, TOP_N};
