#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/skinmarket/engine/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Feature building and forecasting.
//!
//! - [`prepare`] - Daily, gap-filled [`FeatureFrame`] from a raw history series
//! - [`predict`] - Recursive day-by-day forecast against a [`ScoringFunction`]
//! - [`ForecastEngine`] - Both steps bound to one shared scoring function

/// Recursive forecasting.
pub mod engine;
/// Daily feature frames.
pub mod features;
/// Scoring functions.
pub mod model;

pub use engine::{ForecastEngine, ForecastPoint, ForecastResult, MAX_HORIZON, predict};
pub use features::{
    DailyBar, FEATURE_COUNT, FEATURE_NAMES, FeatureFrame, FeatureRow, MIN_FEATURE_ROWS,
    MIN_HISTORY_POINTS, WARMUP_ROWS, pct_change, prepare, resample_daily,
};
pub use model::{LinearModel, ScoringFunction};
