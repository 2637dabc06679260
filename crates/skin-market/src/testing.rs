//! Stub sources and stores for engine tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::Value;

use skin_core::{
    BulkPriceSource, CacheRecord, CacheStore, Catalog, Domain, HistoryPoint, HistorySeries,
    HistorySource, ItemKey, ListingItem, ListingSource, LiveQuoteSource, MarketError, MarketSource,
    PriceField, PriceSnapshot, Result,
};

fn network_error() -> MarketError {
    MarketError::Network("connection refused".to_string())
}

/// Live quote source returning a fixed price.
#[derive(Debug)]
pub(crate) struct StubQuote {
    price: Mutex<Option<String>>,
    fail: bool,
    calls: AtomicUsize,
}

impl StubQuote {
    pub(crate) fn price(price: &str) -> Self {
        Self {
            price: Mutex::new(Some(price.to_string())),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            price: Mutex::new(None),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set_price(&self, price: Option<&str>) {
        *self.price.lock().unwrap() = price.map(str::to_string);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MarketSource for StubQuote {
    fn name(&self) -> &str {
        "stub-quote"
    }

    fn catalogs(&self) -> &[Catalog] {
        &Catalog::ALL
    }
}

#[async_trait]
impl LiveQuoteSource for StubQuote {
    async fn fetch_quote(&self, _item: &ItemKey, _catalog: Catalog) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MarketError::Upstream {
                source_name: "stub-quote".to_string(),
                status: 503,
            });
        }
        Ok(self.price.lock().unwrap().clone())
    }
}

/// Bulk source serving a fixed snapshot.
#[derive(Debug)]
pub(crate) struct StubBulk {
    field: PriceField,
    prices: Vec<(String, String)>,
    fail: bool,
    calls: AtomicUsize,
}

impl StubBulk {
    pub(crate) fn new(field: PriceField, prices: &[(&str, &str)]) -> Self {
        Self {
            field,
            prices: prices
                .iter()
                .map(|(n, p)| ((*n).to_string(), (*p).to_string()))
                .collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(field: PriceField) -> Self {
        Self {
            fail: true,
            ..Self::new(field, &[])
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MarketSource for StubBulk {
    fn name(&self) -> &str {
        self.field.field_name()
    }

    fn catalogs(&self) -> &[Catalog] {
        &Catalog::ALL
    }
}

#[async_trait]
impl BulkPriceSource for StubBulk {
    fn field(&self, _catalog: Catalog) -> PriceField {
        self.field
    }

    async fn fetch_snapshot(&self, _catalog: Catalog) -> Result<PriceSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(network_error());
        }
        Ok(self.prices.iter().cloned().collect())
    }
}

/// What a [`StubHistory`] answers.
#[derive(Debug, Clone)]
pub(crate) enum HistoryReply {
    Series(HistorySeries),
    Nothing,
    Drift,
    Offline,
}

/// History source with a scripted reply.
#[derive(Debug)]
pub(crate) struct StubHistory {
    reply: HistoryReply,
    calls: AtomicUsize,
}

impl StubHistory {
    pub(crate) fn new(reply: HistoryReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MarketSource for StubHistory {
    fn name(&self) -> &str {
        "stub-history"
    }

    fn catalogs(&self) -> &[Catalog] {
        &Catalog::ALL
    }
}

#[async_trait]
impl HistorySource for StubHistory {
    async fn fetch_history(
        &self,
        _item: &ItemKey,
        _catalog: Catalog,
    ) -> Result<Option<HistorySeries>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            HistoryReply::Series(series) => Ok(Some(series.clone())),
            HistoryReply::Nothing => Ok(None),
            HistoryReply::Drift => Err(MarketError::FormatDrift {
                source_name: "stub-history".to_string(),
                detail: "payload changed".to_string(),
            }),
            HistoryReply::Offline => Err(network_error()),
        }
    }
}

/// Listing source returning numbered items.
#[derive(Debug)]
pub(crate) struct StubListing {
    fail: bool,
    calls: AtomicUsize,
}

impl StubListing {
    pub(crate) fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn items(&self, prefix: &str, count: usize) -> Result<Vec<ListingItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(network_error());
        }
        Ok((0..count)
            .map(|i| ListingItem {
                name: format!("{prefix} {i}"),
                market_hash_name: format!("{prefix} {i}"),
                price: "$1.00".to_string(),
                listings: 10,
                icon_url: None,
            })
            .collect())
    }
}

impl MarketSource for StubListing {
    fn name(&self) -> &str {
        "stub-listing"
    }

    fn catalogs(&self) -> &[Catalog] {
        &Catalog::ALL
    }
}

#[async_trait]
impl ListingSource for StubListing {
    async fn popular(&self, _catalog: Catalog, count: usize) -> Result<Vec<ListingItem>> {
        self.items("Popular", count)
    }

    async fn search(
        &self,
        _catalog: Catalog,
        query: &str,
        count: usize,
    ) -> Result<Vec<ListingItem>> {
        self.items(query, count.min(3))
    }
}

/// Store whose every operation fails.
#[derive(Debug)]
pub(crate) struct FailingCache;

#[async_trait]
impl CacheStore for FailingCache {
    async fn get(&self, _domain: Domain, _key: &str) -> Result<Option<CacheRecord>> {
        Err(MarketError::Cache("disk I/O error".to_string()))
    }

    async fn put_at(
        &self,
        _domain: Domain,
        _key: &str,
        _payload: &Value,
        _written_at: DateTime<Utc>,
    ) -> Result<()> {
        Err(MarketError::Cache("disk I/O error".to_string()))
    }

    async fn clear(&self, _domain: Domain) -> Result<()> {
        Err(MarketError::Cache("disk I/O error".to_string()))
    }
}

/// Daily series of `days` points from 2024-01-01 with prices from `price`.
pub(crate) fn daily_series(days: i64, price: impl Fn(i64) -> f64) -> HistorySeries {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
    (0..days)
        .map(|i| HistoryPoint::new(start + TimeDelta::days(i), price(i), 5))
        .collect()
}
