#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/skinmarket/engine/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Cache store implementations for the skin market engine.
//!
//! This crate provides implementations of the [`CacheStore`] trait from `skin-core`:
//!
//! - [`SqliteCache`] - Persistent SQLite-based store (default, requires `sqlite` feature)
//! - [`InMemoryCache`] - Simple in-memory store for testing
//! - [`NoopCache`] - No-op store that doesn't keep anything
//!
//! and [`RecommendationCache`], a TTL-gated view over any store.

/// In-memory cache implementation.
pub mod memory;
/// No-op cache implementation.
pub mod noop;
/// TTL-gated recommendation blobs.
pub mod recommendations;

/// SQLite-based cache implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the trait for convenience
pub use skin_core::CacheStore;

// Re-export implementations
pub use memory::InMemoryCache;
pub use noop::NoopCache;
pub use recommendations::{DEFAULT_RECOMMENDATION_TTL_HOURS, RecommendationCache};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCache;
