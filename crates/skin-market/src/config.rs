//! Engine configuration.
//!
//! Loaded from `SKIN_*` environment variables (a `.env` file is read first
//! when present) or assembled with the `with_*` methods.

use chrono::TimeDelta;
use serde::Deserialize;
use skin_core::{Catalog, MarketError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Settings of a [`MarketEngine`](crate::MarketEngine).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Timeout of every outbound request, in milliseconds.
    pub http_timeout_ms: u64,
    /// Attempts per live quote.
    pub max_attempts: u32,
    /// Steam currency code of live quotes (1 = USD).
    pub steam_currency: u32,
    /// `steamLoginSecure` cookie for listing pages.
    pub steam_login_cookie: Option<String>,
    /// Linear model of CS2 items.
    pub cs2_model_path: Option<PathBuf>,
    /// Linear model of Dota 2 items.
    pub dota2_model_path: Option<PathBuf>,
    /// Freshness of recommendation blobs, in hours.
    pub recommendation_ttl_hours: i64,
    /// Items per popular-items listing.
    pub popular_items_count: usize,
    /// Items per search listing.
    pub search_results_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("skin_market.db"),
            http_timeout_ms: 10_000,
            max_attempts: 3,
            steam_currency: 1,
            steam_login_cookie: None,
            cs2_model_path: None,
            dota2_model_path: None,
            recommendation_ttl_hours: 24,
            popular_items_count: 50,
            search_results_count: 20,
        }
    }
}

impl EngineConfig {
    /// Reads the configuration from the environment.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `SKIN_DATABASE_PATH` | `database_path` |
    /// | `SKIN_HTTP_TIMEOUT_MS` | `http_timeout_ms` |
    /// | `SKIN_MAX_ATTEMPTS` | `max_attempts` |
    /// | `SKIN_STEAM_CURRENCY` | `steam_currency` |
    /// | `SKIN_STEAM_LOGIN_SECURE` | `steam_login_cookie` |
    /// | `SKIN_CS2_MODEL` | `cs2_model_path` |
    /// | `SKIN_DOTA2_MODEL` | `dota2_model_path` |
    /// | `SKIN_RECOMMENDATION_TTL_HOURS` | `recommendation_ttl_hours` |
    /// | `SKIN_POPULAR_ITEMS_COUNT` | `popular_items_count` |
    /// | `SKIN_SEARCH_RESULTS_COUNT` | `search_results_count` |
    ///
    /// # Errors
    /// Returns [`MarketError::InvalidParameter`] if a numeric variable does not
    /// parse or the recommendation TTL is out of range.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns [`MarketError::InvalidParameter`] if a numeric variable does not
    /// parse or the recommendation TTL is out of range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            database_path: text("SKIN_DATABASE_PATH")
                .map_or(defaults.database_path, PathBuf::from),
            http_timeout_ms: parse_var(&lookup, "SKIN_HTTP_TIMEOUT_MS")?
                .unwrap_or(defaults.http_timeout_ms),
            max_attempts: parse_var(&lookup, "SKIN_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts),
            steam_currency: parse_var(&lookup, "SKIN_STEAM_CURRENCY")?
                .unwrap_or(defaults.steam_currency),
            steam_login_cookie: text("SKIN_STEAM_LOGIN_SECURE"),
            cs2_model_path: text("SKIN_CS2_MODEL").map(PathBuf::from),
            dota2_model_path: text("SKIN_DOTA2_MODEL").map(PathBuf::from),
            recommendation_ttl_hours: parse_var(&lookup, "SKIN_RECOMMENDATION_TTL_HOURS")?
                .unwrap_or(defaults.recommendation_ttl_hours),
            popular_items_count: parse_var(&lookup, "SKIN_POPULAR_ITEMS_COUNT")?
                .unwrap_or(defaults.popular_items_count),
            search_results_count: parse_var(&lookup, "SKIN_SEARCH_RESULTS_COUNT")?
                .unwrap_or(defaults.search_results_count),
        };
        config.recommendation_ttl()?;
        Ok(config)
    }

    /// Sets the SQLite database file.
    #[must_use]
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the attempts per live quote.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the Steam login cookie.
    #[must_use]
    pub fn with_steam_login_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.steam_login_cookie = Some(cookie.into());
        self
    }

    /// Sets the model file of a catalog.
    #[must_use]
    pub fn with_model_path(mut self, catalog: Catalog, path: impl Into<PathBuf>) -> Self {
        let path = Some(path.into());
        match catalog {
            Catalog::Cs2 => self.cs2_model_path = path,
            Catalog::Dota2 => self.dota2_model_path = path,
        }
        self
    }

    /// Sets the recommendation freshness, in hours.
    #[must_use]
    pub fn with_recommendation_ttl_hours(mut self, hours: i64) -> Self {
        self.recommendation_ttl_hours = hours;
        self
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Returns the recommendation freshness.
    ///
    /// # Errors
    /// Returns [`MarketError::InvalidParameter`] for a negative hour count or
    /// one too large for a time span.
    pub fn recommendation_ttl(&self) -> Result<TimeDelta> {
        let hours = self.recommendation_ttl_hours;
        TimeDelta::try_hours(hours)
            .filter(|_| hours >= 0)
            .ok_or_else(|| {
                MarketError::InvalidParameter(format!(
                    "recommendation TTL of {hours} hours is out of range"
                ))
            })
    }

    /// Returns the model file of a catalog, if configured.
    #[must_use]
    pub const fn model_path(&self, catalog: Catalog) -> Option<&PathBuf> {
        match catalog {
            Catalog::Cs2 => self.cs2_model_path.as_ref(),
            Catalog::Dota2 => self.dota2_model_path.as_ref(),
        }
    }
}

fn parse_var<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| MarketError::InvalidParameter(format!("{key}={value:?} is not a valid number")))
}
