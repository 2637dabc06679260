//! Core data types for marketplace data.
//!
//! This module defines the fundamental data structures:
//!
//! - [`ItemKey`] - Display name plus canonical key of a tradable item
//! - [`PriceQuote`] - Composite price record across marketplaces
//! - [`PriceSnapshot`] - Bulk price list of one secondary marketplace
//! - [`HistoryPoint`] - Individual sale-history observation
//! - [`HistorySeries`] - Sale history in upstream order
//! - [`ListingItem`] - Entry of a popular-items or search listing

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::catalog::{Catalog, PriceField};
use crate::error::{MarketError, Result};

/// Placeholder for a price no marketplace could supply.
pub const NOT_AVAILABLE: &str = "N/A";

/// Collapses runs of whitespace and lowercases an item display name.
#[must_use]
pub fn canonical_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Extracts the numeric value of a price text in any Steam currency format,
/// such as `"$1,234.56"`, `"1,23€"` or `"1 234,56 pуб."`.
///
/// Currency symbols and spaces are dropped. The last `.` or `,` is the decimal
/// separator unless it groups thousands.
/// Returns `None` for `"N/A"` and anything without digits.
#[must_use]
pub fn parse_price(text: &str) -> Option<f64> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ','))
        .collect();
    // "pуб." ends in a separator
    let kept = kept.trim_end_matches(['.', ',']);
    if !kept.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let decimal = decimal_separator(kept);
    let normalized: String = kept
        .chars()
        .filter_map(|c| match c {
            '0'..='9' => Some(c),
            _ if Some(c) == decimal => Some('.'),
            _ => None,
        })
        .collect();
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Picks the decimal separator of a price made of digits, `.` and `,`.
///
/// The last separator is decimal when the other kind precedes it
/// (`1.234,56`), and grouping when it repeats (`1,234,567`). A lone separator
/// followed by exactly three digits groups thousands (`$1,234`) unless the
/// integer part is zero (`0.050`).
fn decimal_separator(text: &str) -> Option<char> {
    let pos = text.rfind(['.', ','])?;
    let (integer, rest) = text.split_at(pos);
    let separator = if rest.starts_with('.') { '.' } else { ',' };
    let other = if separator == '.' { ',' } else { '.' };

    if integer.contains(other) {
        return Some(separator);
    }
    if integer.contains(separator) {
        return None;
    }
    let fraction_digits = rest.len() - 1;
    if fraction_digits == 3 && integer != "0" {
        None
    } else {
        Some(separator)
    }
}

/// Formats a USD amount the way Steam prints it.
#[must_use]
pub fn format_usd(value: f64) -> String {
    format!("${value:.2}")
}

/// A tradable item.
///
/// Keeps the display name (Steam's `market_hash_name`) for upstream requests and
/// a canonical key for cache keys and cross-source lookups. Equality and hashing
/// use the canonical key only.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ItemKey {
    name: String,
    canonical: String,
}

impl ItemKey {
    /// Creates an item key from a display name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into().trim().to_string();
        let canonical = canonical_key(&name);
        Self { name, canonical }
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the canonical key.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Returns the cache key for this item within a catalog.
    #[must_use]
    pub fn cache_key(&self, catalog: Catalog) -> String {
        format!("{}:{}", catalog.app_id(), self.canonical)
    }
}

impl PartialEq for ItemKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for ItemKey {}

impl Hash for ItemKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for ItemKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ItemKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Composite price of one item across marketplaces.
///
/// Replaced wholesale on every refresh; fields are never merged across calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Canonical item key.
    pub item: String,
    /// Catalog the item belongs to.
    pub catalog: Catalog,
    /// Primary (Steam) price text, or `"N/A"`.
    pub steam_price: String,
    /// Secondary marketplace prices keyed by field.
    #[serde(default)]
    pub marketplaces: BTreeMap<PriceField, String>,
}

impl PriceQuote {
    /// Creates a quote with every field `"N/A"`.
    #[must_use]
    pub fn unavailable(item: &ItemKey, catalog: Catalog) -> Self {
        Self {
            item: item.canonical().to_string(),
            catalog,
            steam_price: NOT_AVAILABLE.to_string(),
            marketplaces: catalog
                .secondary_fields()
                .iter()
                .map(|field| (*field, NOT_AVAILABLE.to_string()))
                .collect(),
        }
    }

    /// Sets the price of a field.
    #[must_use]
    pub fn with_price(mut self, field: PriceField, price: impl Into<String>) -> Self {
        match field {
            PriceField::Steam => self.steam_price = price.into(),
            other => {
                self.marketplaces.insert(other, price.into());
            }
        }
        self
    }

    /// Returns the price text of a field, `"N/A"` when absent.
    #[must_use]
    pub fn price(&self, field: PriceField) -> &str {
        match field {
            PriceField::Steam => &self.steam_price,
            other => self
                .marketplaces
                .get(&other)
                .map_or(NOT_AVAILABLE, String::as_str),
        }
    }

    /// Returns the numeric primary price, if there is one.
    #[must_use]
    pub fn steam_value(&self) -> Option<f64> {
        parse_price(&self.steam_price)
    }
}

/// Full price list of one secondary marketplace, keyed by canonical item key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    prices: HashMap<String, String>,
}

impl PriceSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a price, canonicalizing the item name. Later entries win.
    pub fn insert(&mut self, name: &str, price: impl Into<String>) {
        self.prices.insert(canonical_key(name), price.into());
    }

    /// Looks an item up.
    #[must_use]
    pub fn get(&self, item: &ItemKey) -> Option<&str> {
        self.prices.get(item.canonical()).map(String::as_str)
    }

    /// Returns the number of priced items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Returns true if the snapshot holds no prices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl<S: AsRef<str>, P: Into<String>> FromIterator<(S, P)> for PriceSnapshot {
    fn from_iter<I: IntoIterator<Item = (S, P)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (name, price) in iter {
            snapshot.insert(name.as_ref(), price);
        }
        snapshot
    }
}

/// A single sale-history observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// When the sales were recorded.
    pub timestamp: DateTime<Utc>,
    /// Median sale price.
    pub price: f64,
    /// Number of items sold.
    pub volume: u64,
}

impl HistoryPoint {
    /// Creates a new history point.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, price: f64, volume: u64) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }
}

/// Sale history of an item in upstream order.
///
/// The series is never re-sorted; callers that need chronological order must
/// sort explicitly. An empty series means "no usable data", not an error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySeries {
    points: Vec<HistoryPoint>,
}

impl HistorySeries {
    /// Creates an empty series.
    #[must_use]
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Creates a series from a vector of points.
    #[must_use]
    pub const fn from_points(points: Vec<HistoryPoint>) -> Self {
        Self { points }
    }

    /// Adds a point to the end of the series.
    pub fn push(&mut self, point: HistoryPoint) {
        self.points.push(point);
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns an iterator over the points.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    /// Returns the points as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[HistoryPoint] {
        &self.points
    }

    /// Consumes the series and returns the underlying vector.
    #[must_use]
    pub fn into_inner(self) -> Vec<HistoryPoint> {
        self.points
    }

    /// Returns the time range covered by the series.
    #[must_use]
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let min = self.points.iter().map(|p| p.timestamp).min()?;
        let max = self.points.iter().map(|p| p.timestamp).max()?;
        Some((min, max))
    }

    /// Converts the series into a DataFrame with columns timestamp, price, volume.
    ///
    /// # Errors
    /// Returns an error if the DataFrame cannot be assembled.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let timestamps: Vec<i64> = self
            .points
            .iter()
            .map(|p| p.timestamp.timestamp_millis())
            .collect();
        let prices: Vec<f64> = self.points.iter().map(|p| p.price).collect();
        let volumes: Vec<u64> = self.points.iter().map(|p| p.volume).collect();

        let timestamp_col = Column::new("timestamp".into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| MarketError::Other(e.to_string()))?;

        DataFrame::new(vec![
            timestamp_col,
            Column::new("price".into(), prices),
            Column::new("volume".into(), volumes),
        ])
        .map_err(|e| MarketError::Other(e.to_string()))
    }
}

impl IntoIterator for HistorySeries {
    type Item = HistoryPoint;
    type IntoIter = std::vec::IntoIter<HistoryPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl FromIterator<HistoryPoint> for HistorySeries {
    fn from_iter<I: IntoIterator<Item = HistoryPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// An entry of a popular-items or search listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingItem {
    /// Localized display name.
    pub name: String,
    /// Name used to address the item on the market.
    pub market_hash_name: String,
    /// Cheapest listing price text, or `"N/A"`.
    pub price: String,
    /// Number of active sell listings.
    pub listings: u64,
    /// Icon URL, when the market provided one.
    pub icon_url: Option<String>,
}
