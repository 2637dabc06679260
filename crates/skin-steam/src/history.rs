//! Extraction of the sale history embedded in listing pages.
//!
//! Listing pages assign the history to a script variable:
//!
//! ```text
//! var line1=[["Nov 27 2013 01: +0",5.293,"1"],["Nov 28 2013 01: +0",4.892,"2"]];
//! ```
//!
//! Everything that depends on that shape lives here. A missing assignment means
//! the page has no history; an assignment that no longer parses is reported as
//! [`MarketError::FormatDrift`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use skin_core::{HistoryPoint, HistorySeries, MarketError, Result};

/// Marker preceding the embedded JSON array.
const HISTORY_MARKER: &str = "var line1=";

/// Source name used in drift errors.
const SOURCE_NAME: &str = "Steam Community Market";

/// Raw `[date, price, volume]` triple.
#[derive(Debug, Deserialize)]
struct RawPoint(String, f64, RawVolume);

/// Steam sends volumes as strings, occasionally as numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawVolume {
    Text(String),
    Number(u64),
}

impl RawVolume {
    fn parse(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.replace(',', "").trim().parse().ok(),
        }
    }
}

fn drift(detail: impl Into<String>) -> MarketError {
    MarketError::FormatDrift {
        source_name: SOURCE_NAME.to_string(),
        detail: detail.into(),
    }
}

/// Extracts the embedded sale history from a listing page.
///
/// Returns `Ok(None)` when the page has no history assignment or it is empty.
/// Points keep the order they appear in on the page.
///
/// # Errors
/// Returns [`MarketError::FormatDrift`] when the assignment exists but its
/// payload does not match the expected triples.
pub fn extract_price_history(page: &str) -> Result<Option<HistorySeries>> {
    let Some(start) = page.find(HISTORY_MARKER) else {
        return Ok(None);
    };
    let rest = &page[start + HISTORY_MARKER.len()..];
    let end = rest
        .find(';')
        .ok_or_else(|| drift("history assignment is not terminated"))?;

    let raw: Vec<RawPoint> = serde_json::from_str(rest[..end].trim())
        .map_err(|e| drift(format!("history payload: {e}")))?;

    if raw.is_empty() {
        return Ok(None);
    }

    raw.iter()
        .map(|RawPoint(date, price, volume)| {
            let timestamp = parse_steam_timestamp(date)
                .ok_or_else(|| drift(format!("unrecognized date {date:?}")))?;
            let volume = volume
                .parse()
                .ok_or_else(|| drift(format!("unrecognized volume {volume:?}")))?;
            Ok(HistoryPoint::new(timestamp, *price, volume))
        })
        .collect::<Result<HistorySeries>>()
        .map(Some)
}

/// Parses Steam's `"Nov 27 2013 01: +0"` timestamps (UTC, hour resolution).
#[must_use]
pub fn parse_steam_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let (stamp, _offset) = text.split_once(':')?;
    let (date, hour) = stamp.trim().rsplit_once(' ')?;
    let date = NaiveDate::parse_from_str(date.trim(), "%b %d %Y").ok()?;
    let hour: u32 = hour.parse().ok()?;
    Some(date.and_hms_opt(hour, 0, 0)?.and_utc())
}
