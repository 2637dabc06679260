//! Favorite-based recommendations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skin_core::Catalog;

/// Items kept per side of the ranking.
pub const TOP_N: usize = 5;

/// Forecast horizon of recommendations, in days.
pub const RECOMMENDATION_HORIZON: usize = 7;

/// A user's favorite item, as handed over by the favorites store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    /// Market hash name of the item.
    pub market_hash_name: String,
    /// Catalog of the item.
    #[serde(rename = "appid")]
    pub catalog: Catalog,
}

impl Favorite {
    /// Creates a favorite.
    #[must_use]
    pub fn new(market_hash_name: impl Into<String>, catalog: Catalog) -> Self {
        Self {
            market_hash_name: market_hash_name.into(),
            catalog,
        }
    }
}

/// One scored favorite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Market hash name of the item.
    pub item: String,
    /// Catalog of the item.
    pub catalog: Catalog,
    /// Current primary price.
    pub current_price: f64,
    /// Price predicted for the end of the horizon.
    pub predicted_price: f64,
    /// Expected change over the horizon, in percent.
    pub overall_change_pct: f64,
}

impl Recommendation {
    /// Scores an item from its current and predicted price.
    #[must_use]
    pub fn new(
        item: impl Into<String>,
        catalog: Catalog,
        current_price: f64,
        predicted_price: f64,
    ) -> Self {
        let change = if current_price == 0.0 {
            0.0
        } else {
            (predicted_price - current_price) / current_price * 100.0
        };
        Self {
            item: item.into(),
            catalog,
            current_price,
            predicted_price,
            overall_change_pct: (change * 100.0).round() / 100.0,
        }
    }
}

/// Ranked recommendations of one user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    /// When the ranking was built.
    pub generated_at: DateTime<Utc>,
    /// Largest expected gains, best first.
    pub risers: Vec<Recommendation>,
    /// Largest expected losses (or flat), worst first.
    pub fallers: Vec<Recommendation>,
    /// Every favorite that could be scored.
    pub evaluated: Vec<Recommendation>,
}

impl Recommendations {
    /// Ranks scored favorites.
    ///
    /// Positive changes are risers, everything else is a faller.
    #[must_use]
    pub fn rank(evaluated: Vec<Recommendation>, generated_at: DateTime<Utc>) -> Self {
        let mut risers: Vec<Recommendation> = evaluated
            .iter()
            .filter(|r| r.overall_change_pct > 0.0)
            .cloned()
            .collect();
        risers.sort_by(|a, b| b.overall_change_pct.total_cmp(&a.overall_change_pct));
        risers.truncate(TOP_N);

        let mut fallers: Vec<Recommendation> = evaluated
            .iter()
            .filter(|r| r.overall_change_pct <= 0.0)
            .cloned()
            .collect();
        fallers.sort_by(|a, b| a.overall_change_pct.total_cmp(&b.overall_change_pct));
        fallers.truncate(TOP_N);

        Self {
            generated_at,
            risers,
            fallers,
            evaluated,
        }
    }
}
