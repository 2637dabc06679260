//! Daily feature frames built from raw sale history.
//!
//! [`prepare`] is pure: the same series always yields the same frame.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Timelike, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use skin_core::{HistorySeries, MarketError, Result};
use std::collections::BTreeMap;

/// Fewest raw points a series needs before features are built.
pub const MIN_HISTORY_POINTS: usize = 50;

/// Leading rows dropped because their 7-day change is undefined.
pub const WARMUP_ROWS: usize = 7;

/// Fewest rows a frame keeps after the warm-up rows are dropped.
pub const MIN_FEATURE_ROWS: usize = 10;

/// Number of model inputs.
pub const FEATURE_COUNT: usize = 6;

/// Names of the model inputs, in [`FeatureRow::vector`] order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "pct_change_1d",
    "pct_change_7d",
    "day_of_week",
    "hour",
    "event",
    "volume",
];

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// One calendar day of resampled history.
#[derive(Clone, Debug, PartialEq)]
pub struct DailyBar {
    /// Calendar date (UTC).
    pub date: NaiveDate,
    /// Last observed timestamp of the day.
    pub last_timestamp: DateTime<Utc>,
    /// Last observed price of the day.
    pub price: f64,
    /// Summed volume of the day.
    pub volume: u64,
}

/// Features of one day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Calendar date (UTC).
    pub date: NaiveDate,
    /// Last observed timestamp of the day.
    pub timestamp: DateTime<Utc>,
    /// Last observed price of the day.
    pub price: f64,
    /// Summed volume of the day.
    pub volume: u64,
    /// Change against the previous day, in percent.
    pub pct_change_1d: f64,
    /// Change against seven days earlier, in percent.
    pub pct_change_7d: f64,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: u32,
    /// Hour of the day's last observation.
    pub hour: u32,
    /// Event marker, always zero.
    pub event: f64,
}

impl FeatureRow {
    /// Returns the model inputs in [`FEATURE_NAMES`] order.
    #[must_use]
    pub fn vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.pct_change_1d,
            self.pct_change_7d,
            f64::from(self.day_of_week),
            f64::from(self.hour),
            self.event,
            self.volume as f64,
        ]
    }
}

/// Contiguous daily feature rows, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrame {
    rows: Vec<FeatureRow>,
}

impl FeatureFrame {
    /// Creates a frame from rows that are already contiguous and ordered.
    #[must_use]
    pub const fn from_rows(rows: Vec<FeatureRow>) -> Self {
        Self { rows }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the rows.
    #[must_use]
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Returns the most recent row.
    #[must_use]
    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    /// Converts the frame into a DataFrame, one column per field.
    ///
    /// # Errors
    /// Returns an error if the DataFrame cannot be assembled.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates: Vec<i32> = self
            .rows
            .iter()
            .map(|r| r.date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            .collect();
        let timestamps: Vec<i64> = self
            .rows
            .iter()
            .map(|r| r.timestamp.timestamp_millis())
            .collect();

        let date_col = Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| MarketError::Other(e.to_string()))?;
        let timestamp_col = Column::new("timestamp".into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| MarketError::Other(e.to_string()))?;

        DataFrame::new(vec![
            date_col,
            timestamp_col,
            Column::new(
                "price".into(),
                self.rows.iter().map(|r| r.price).collect::<Vec<_>>(),
            ),
            Column::new(
                "volume".into(),
                self.rows.iter().map(|r| r.volume).collect::<Vec<_>>(),
            ),
            Column::new(
                "pct_change_1d".into(),
                self.rows.iter().map(|r| r.pct_change_1d).collect::<Vec<_>>(),
            ),
            Column::new(
                "pct_change_7d".into(),
                self.rows.iter().map(|r| r.pct_change_7d).collect::<Vec<_>>(),
            ),
            Column::new(
                "day_of_week".into(),
                self.rows.iter().map(|r| r.day_of_week).collect::<Vec<_>>(),
            ),
            Column::new(
                "hour".into(),
                self.rows.iter().map(|r| r.hour).collect::<Vec<_>>(),
            ),
            Column::new(
                "event".into(),
                self.rows.iter().map(|r| r.event).collect::<Vec<_>>(),
            ),
        ])
        .map_err(|e| MarketError::Other(e.to_string()))
    }
}

/// Percent change of `current` against `reference`; zero when the reference is zero.
#[must_use]
pub fn pct_change(current: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        0.0
    } else {
        (current - reference) / reference * 100.0
    }
}

/// Groups a series by UTC calendar day and fills calendar gaps.
///
/// Within a day the last point in upstream order sets price and timestamp;
/// volumes are summed. Missing days repeat the previous day's price, volume
/// and timestamp.
#[must_use]
pub fn resample_daily(history: &HistorySeries) -> Vec<DailyBar> {
    let mut days: BTreeMap<NaiveDate, DailyBar> = BTreeMap::new();
    for point in history.iter() {
        let date = point.timestamp.date_naive();
        days.entry(date)
            .and_modify(|bar| {
                bar.last_timestamp = point.timestamp;
                bar.price = point.price;
                bar.volume = bar.volume.saturating_add(point.volume);
            })
            .or_insert_with(|| DailyBar {
                date,
                last_timestamp: point.timestamp,
                price: point.price,
                volume: point.volume,
            });
    }

    let mut bars: Vec<DailyBar> = Vec::with_capacity(days.len());
    for (date, bar) in days {
        if let Some(prev) = bars.last().cloned() {
            let mut day = prev.date + TimeDelta::days(1);
            while day < date {
                bars.push(DailyBar { date: day, ..prev.clone() });
                day += TimeDelta::days(1);
            }
        }
        bars.push(bar);
    }
    bars
}

/// Builds the feature frame of a series.
///
/// Returns `None` when the series has fewer than [`MIN_HISTORY_POINTS`] points
/// or fewer than [`MIN_FEATURE_ROWS`] rows survive the warm-up drop.
#[must_use]
pub fn prepare(history: &HistorySeries) -> Option<FeatureFrame> {
    if history.len() < MIN_HISTORY_POINTS {
        tracing::debug!(points = history.len(), "Not enough history for features");
        return None;
    }

    let bars = resample_daily(history);
    let rows: Vec<FeatureRow> = bars
        .iter()
        .enumerate()
        .skip(WARMUP_ROWS)
        .map(|(i, bar)| FeatureRow {
            date: bar.date,
            timestamp: bar.last_timestamp,
            price: bar.price,
            volume: bar.volume,
            pct_change_1d: pct_change(bar.price, bars[i - 1].price),
            pct_change_7d: pct_change(bar.price, bars[i - WARMUP_ROWS].price),
            day_of_week: bar.last_timestamp.weekday().num_days_from_monday(),
            hour: bar.last_timestamp.hour(),
            event: 0.0,
        })
        .collect();

    if rows.len() < MIN_FEATURE_ROWS {
        tracing::debug!(rows = rows.len(), "Too few daily rows after warm-up");
        return None;
    }

    Some(FeatureFrame::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use skin_core::HistoryPoint;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn daily_series(days: i64, price: impl Fn(i64) -> f64) -> HistorySeries {
        let start = at(2024, 1, 1, 1);
        (0..days)
            .map(|i| HistoryPoint::new(start + TimeDelta::days(i), price(i), 2))
            .collect()
    }

    #[test]
    fn test_resample_fills_gaps_forward() {
        let series = HistorySeries::from_points(vec![
            HistoryPoint::new(at(2024, 1, 1, 5), 10.0, 3),
            HistoryPoint::new(at(2024, 1, 3, 7), 12.0, 5),
        ]);

        let bars = resample_daily(&series);
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[1].price, bars[0].price);
        assert_eq!(bars[1].volume, bars[0].volume);
        assert_eq!(bars[1].last_timestamp, bars[0].last_timestamp);
        assert_eq!(bars[2].price, 12.0);
    }

    #[test]
    fn test_resample_keeps_upstream_order_within_day() {
        let series = HistorySeries::from_points(vec![
            HistoryPoint::new(at(2024, 1, 1, 9), 4.0, 1),
            HistoryPoint::new(at(2024, 1, 1, 3), 5.0, 2),
        ]);

        let bars = resample_daily(&series);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].price, 5.0);
        assert_eq!(bars[0].volume, 3);
        assert_eq!(bars[0].last_timestamp.hour(), 3);
    }

    #[test]
    fn test_prepare_rejects_short_history() {
        assert!(prepare(&daily_series(49, |_| 1.0)).is_none());

        // 50 points packed into 10 days leave only 3 rows after warm-up
        let start = at(2024, 1, 1, 0);
        let packed: HistorySeries = (0..50)
            .map(|i| HistoryPoint::new(start + TimeDelta::hours(i * 4), 1.0, 1))
            .collect();
        assert!(prepare(&packed).is_none());
    }

    #[test]
    fn test_prepare_features() {
        let frame = prepare(&daily_series(60, |i| 100.0 + i as f64)).unwrap();
        assert_eq!(frame.len(), 60 - WARMUP_ROWS);

        let first = &frame.rows()[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert!((first.pct_change_1d - pct_change(107.0, 106.0)).abs() < 1e-12);
        assert!((first.pct_change_7d - 7.0).abs() < 1e-12);
        // 2024-01-08 is a Monday
        assert_eq!(first.day_of_week, 0);
        assert_eq!(first.hour, 1);
        assert_eq!(first.event, 0.0);
        assert_eq!(first.vector()[5], 2.0);

        for pair in frame.rows().windows(2) {
            assert_eq!(pair[1].date, pair[0].date + TimeDelta::days(1));
        }
    }

    #[test]
    fn test_zero_reference_price_gives_zero_change() {
        let frame = prepare(&daily_series(60, |i| if i < 30 { 0.0 } else { 2.0 })).unwrap();
        let row = frame.rows().iter().find(|r| r.price == 2.0).unwrap();
        assert_eq!(row.pct_change_1d, 0.0);
        assert_eq!(row.pct_change_7d, 0.0);
    }

    #[test]
    fn test_prepare_is_deterministic() {
        let series = daily_series(80, |i| 3.0 + (i as f64 * 0.7).sin());
        assert_eq!(prepare(&series), prepare(&series));
    }

    #[test]
    fn test_frame_to_dataframe() {
        let frame = prepare(&daily_series(60, |_| 1.5)).unwrap();
        let df = frame.to_dataframe().unwrap();
        assert_eq!(df.height(), frame.len());
        assert_eq!(df.width(), 9);
        assert!(df.column("pct_change_7d").is_ok());
    }
}
