//! Recursive day-by-day forecasting.

use chrono::{Datelike, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use skin_core::{HistorySeries, MarketError, Result};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::features::{FeatureFrame, pct_change, prepare};
use crate::model::ScoringFunction;

/// Longest forecast horizon, in days.
pub const MAX_HORIZON: usize = 14;

/// Rows back to the reference price of the weekly change.
const WEEK_ROWS: usize = 7;

/// One forecast day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Forecast date.
    pub date: NaiveDate,
    /// Predicted price, rounded to cents.
    pub predicted_price: f64,
    /// Predicted change against the previous day in percent, 3 decimals.
    pub predicted_pct_change: f64,
}

/// Forecast of one item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Last observed daily price.
    pub last_known_price: f64,
    /// Date of the last observed day.
    pub last_known_date: NaiveDate,
    /// One point per horizon day, oldest first.
    pub predictions: Vec<ForecastPoint>,
}

impl ForecastResult {
    /// Returns the price predicted for the final horizon day.
    #[must_use]
    pub fn final_price(&self) -> Option<f64> {
        self.predictions.last().map(|p| p.predicted_price)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Runs the forecast recurrence for `horizon` days.
///
/// Each step feeds the model's own prediction back in as the next day's
/// 1-day change. The 7-day change is measured against the price 7 rows from
/// the end of `frame`, or repeats the prediction when that price is missing
/// or zero.
///
/// # Errors
/// - [`MarketError::InvalidParameter`] if `horizon` is outside `1..=14`
/// - [`MarketError::InsufficientData`] if `frame` is empty
/// - [`MarketError::Model`] if the model returns a non-finite value
pub fn predict(
    model: &dyn ScoringFunction,
    frame: &FeatureFrame,
    horizon: usize,
) -> Result<ForecastResult> {
    if !(1..=MAX_HORIZON).contains(&horizon) {
        return Err(MarketError::InvalidParameter(format!(
            "horizon must be between 1 and {MAX_HORIZON} days, got {horizon}"
        )));
    }
    let Some(last) = frame.last() else {
        return Err(MarketError::InsufficientData(
            "feature frame is empty".to_string(),
        ));
    };

    let rows = frame.rows();
    let week_ago_price = rows
        .len()
        .checked_sub(WEEK_ROWS)
        .map(|i| rows[i].price)
        .filter(|price| *price != 0.0);

    let mut features = last.vector();
    let mut last_price = last.price;
    let mut predictions = Vec::with_capacity(horizon);

    for step in 1..=horizon {
        let pct = model.score(&features);
        if !pct.is_finite() {
            return Err(MarketError::Model(format!(
                "scoring function returned {pct} at step {step}"
            )));
        }

        let new_price = last_price * (1.0 + pct / 100.0);
        let new_date = last.date + TimeDelta::days(step as i64);
        predictions.push(ForecastPoint {
            date: new_date,
            predicted_price: round_to(new_price, 2),
            predicted_pct_change: round_to(pct, 3),
        });

        features[0] = pct;
        features[1] = week_ago_price.map_or(pct, |reference| pct_change(new_price, reference));
        features[2] = f64::from(new_date.weekday().num_days_from_monday());
        features[3] = 0.0;
        last_price = new_price;
    }

    Ok(ForecastResult {
        last_known_price: last.price,
        last_known_date: last.date,
        predictions,
    })
}

/// Forecasting with one scoring function.
#[derive(Clone)]
pub struct ForecastEngine {
    model: Arc<dyn ScoringFunction>,
}

impl fmt::Debug for ForecastEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForecastEngine").finish_non_exhaustive()
    }
}

impl ForecastEngine {
    /// Creates an engine around a scoring function.
    #[must_use]
    pub fn new(model: Arc<dyn ScoringFunction>) -> Self {
        Self { model }
    }

    /// Forecasts from a prepared frame. See [`predict`].
    ///
    /// # Errors
    /// Same as [`predict`].
    pub fn predict(&self, frame: &FeatureFrame, horizon: usize) -> Result<ForecastResult> {
        predict(self.model.as_ref(), frame, horizon)
    }

    /// Builds features from raw history and forecasts from them.
    ///
    /// # Errors
    /// Returns [`MarketError::InsufficientData`] if the history is too short
    /// for a feature frame, otherwise the same errors as [`predict`].
    #[instrument(skip(self, history), fields(points = history.len()))]
    pub fn forecast(&self, history: &HistorySeries, horizon: usize) -> Result<ForecastResult> {
        if !(1..=MAX_HORIZON).contains(&horizon) {
            return Err(MarketError::InvalidParameter(format!(
                "horizon must be between 1 and {MAX_HORIZON} days, got {horizon}"
            )));
        }
        let frame = prepare(history).ok_or_else(|| {
            MarketError::InsufficientData(format!(
                "{} history points do not make a feature frame",
                history.len()
            ))
        })?;
        debug!(rows = frame.len(), "Feature frame ready");
        self.predict(&frame, horizon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureRow;
    use crate::model::LinearModel;
    use chrono::{DateTime, TimeZone, Utc};
    use skin_core::HistoryPoint;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    /// 60 daily points alternating between 100 and 105.
    fn oscillating_history() -> HistorySeries {
        (0..60)
            .map(|i| {
                let price = if i % 2 == 0 { 100.0 } else { 105.0 };
                HistoryPoint::new(start() + TimeDelta::days(i), price, 10)
            })
            .collect()
    }

    fn frame() -> FeatureFrame {
        prepare(&oscillating_history()).unwrap()
    }

    /// Rises after a fall, falls after a rise.
    fn mean_reverting(features: &[f64]) -> f64 {
        if features[0] < 0.0 { 1.25 } else { -0.75 }
    }

    #[test]
    fn test_rejects_horizon_outside_range() {
        let calls = AtomicUsize::new(0);
        let model = |_: &[f64]| {
            calls.fetch_add(1, Ordering::SeqCst);
            1.0
        };

        for horizon in [0, 15] {
            assert!(matches!(
                predict(&model, &frame(), horizon),
                Err(MarketError::InvalidParameter(_))
            ));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_output_length_matches_horizon() {
        let frame = frame();
        for horizon in 1..=MAX_HORIZON {
            let result = predict(&mean_reverting, &frame, horizon).unwrap();
            assert_eq!(result.predictions.len(), horizon);
        }
    }

    #[test]
    fn test_empty_frame_is_insufficient_data() {
        let result = predict(&mean_reverting, &FeatureFrame::default(), 3);
        assert!(matches!(result, Err(MarketError::InsufficientData(_))));
    }

    #[test]
    fn test_non_finite_score_is_model_error() {
        let result = predict(&|_: &[f64]| f64::NAN, &frame(), 3);
        assert!(matches!(result, Err(MarketError::Model(_))));
    }

    #[test]
    fn test_recurrence_compounds_prices() {
        let frame = frame();
        let result = predict(&mean_reverting, &frame, 5).unwrap();

        let last = frame.last().unwrap();
        assert_eq!(result.last_known_price, last.price);
        assert_eq!(result.last_known_date, last.date);

        let mut prev = last.price;
        for (step, point) in result.predictions.iter().enumerate() {
            let pct = point.predicted_pct_change;
            assert!(pct == 1.25 || pct == -0.75);

            let next = prev * (1.0 + pct / 100.0);
            assert_eq!(point.predicted_price, (next * 100.0).round() / 100.0);
            assert_eq!(point.date, last.date + TimeDelta::days(step as i64 + 1));
            prev = next;
        }

        // Predictions alternate once the model sees its own output
        assert_eq!(result.predictions[1].predicted_pct_change, 1.25);
        assert_eq!(result.predictions[2].predicted_pct_change, -0.75);
    }

    #[test]
    fn test_features_fed_back_between_steps() {
        let frame = frame();
        let seen = Mutex::new(Vec::new());
        let model = |features: &[f64]| {
            seen.lock().unwrap().push(features.to_vec());
            2.0
        };

        let result = predict(&model, &frame, 2).unwrap();
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], frame.last().unwrap().vector().to_vec());

        let rows = frame.rows();
        let reference = rows[rows.len() - 7].price;
        let new_price = frame.last().unwrap().price * 1.02;
        let first_date = result.predictions[0].date;

        assert_eq!(seen[1][0], 2.0);
        assert!((seen[1][1] - pct_change(new_price, reference)).abs() < 1e-9);
        assert_eq!(
            seen[1][2],
            f64::from(first_date.weekday().num_days_from_monday())
        );
        assert_eq!(seen[1][3], 0.0);
        assert_eq!(seen[1][4], 0.0);
        assert_eq!(seen[1][5], frame.last().unwrap().volume as f64);
    }

    #[test]
    fn test_short_frame_repeats_prediction_as_weekly_change() {
        let row = FeatureRow {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            timestamp: start(),
            price: 10.0,
            volume: 4,
            pct_change_1d: 0.0,
            pct_change_7d: 0.0,
            day_of_week: 4,
            hour: 12,
            event: 0.0,
        };
        let frame = FeatureFrame::from_rows(vec![row]);
        let seen = Mutex::new(Vec::new());
        let model = |features: &[f64]| {
            seen.lock().unwrap().push(features[1]);
            -1.5
        };

        predict(&model, &frame, 2).unwrap();
        assert_eq!(seen.into_inner().unwrap(), vec![0.0, -1.5]);
    }

    #[test]
    fn test_engine_forecasts_from_history() {
        let engine = ForecastEngine::new(Arc::new(LinearModel::new([0.0; 6], 0.5)));
        let result = engine.forecast(&oscillating_history(), 7).unwrap();
        assert_eq!(result.predictions.len(), 7);
        assert!(result.final_price().unwrap() > result.last_known_price);

        let short: HistorySeries = oscillating_history().into_iter().take(20).collect();
        assert!(matches!(
            engine.forecast(&short, 7),
            Err(MarketError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_result_json_shape() {
        let result = predict(&mean_reverting, &frame(), 1).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["predictions"][0]["date"].is_string());
        assert!(json["predictions"][0]["predicted_price"].is_number());
    }
}
