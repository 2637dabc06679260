//! Scoring functions.

use serde::{Deserialize, Serialize};
use skin_core::{MarketError, Result};
use std::path::Path;

use crate::features::FEATURE_COUNT;

/// Externally trained predictor of the next day's percentage change.
///
/// Receives the inputs in [`FEATURE_NAMES`](crate::features::FEATURE_NAMES) order.
pub trait ScoringFunction: Send + Sync {
    /// Predicts the next-step percentage change.
    fn score(&self, features: &[f64]) -> f64;
}

impl<F> ScoringFunction for F
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn score(&self, features: &[f64]) -> f64 {
        self(features)
    }
}

/// Linear scoring function serialized as JSON.
///
/// ```json
/// {"weights": [0.4, 0.1, 0.0, 0.0, 0.0, 0.001], "intercept": -0.05}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    /// One weight per input.
    pub weights: [f64; FEATURE_COUNT],
    /// Constant term.
    #[serde(default)]
    pub intercept: f64,
}

impl LinearModel {
    /// Creates a linear model.
    #[must_use]
    pub const fn new(weights: [f64; FEATURE_COUNT], intercept: f64) -> Self {
        Self { weights, intercept }
    }

    /// Parses a model from its JSON form.
    ///
    /// # Errors
    /// Returns an error if the JSON does not describe a model with finite
    /// coefficients.
    pub fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        if model.weights.iter().chain([&model.intercept]).any(|w| !w.is_finite()) {
            return Err(MarketError::Model(
                "model coefficients must be finite".to_string(),
            ));
        }
        Ok(model)
    }

    /// Loads a model from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| MarketError::Model(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }
}

impl ScoringFunction for LinearModel {
    fn score(&self, features: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_a_scoring_function() {
        let model = |features: &[f64]| features[0] * 2.0;
        assert_eq!(model.score(&[1.5, 0.0, 0.0, 0.0, 0.0, 0.0]), 3.0);
    }

    #[test]
    fn test_linear_model_score() {
        let model = LinearModel::new([1.0, 0.5, 0.0, 0.0, 0.0, 0.01], -0.25);
        let score = model.score(&[2.0, 4.0, 3.0, 12.0, 0.0, 100.0]);
        assert!((score - 4.75).abs() < 1e-12);
    }

    #[test]
    fn test_linear_model_from_json() {
        let model =
            LinearModel::from_json(r#"{"weights":[0.4,0.1,0,0,0,0.001],"intercept":-0.05}"#)
                .unwrap();
        assert_eq!(model.weights[0], 0.4);
        assert_eq!(model.intercept, -0.05);

        let no_intercept = LinearModel::from_json(r#"{"weights":[1,1,1,1,1,1]}"#).unwrap();
        assert_eq!(no_intercept.intercept, 0.0);

        assert!(matches!(
            LinearModel::from_json(r#"{"weights":[1,2]}"#),
            Err(MarketError::Parse(_))
        ));
    }

    #[test]
    fn test_linear_model_from_path() {
        let path = std::env::temp_dir().join(format!("skin-model-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"weights":[1,0,0,0,0,0],"intercept":0.5}"#).unwrap();

        let model = LinearModel::from_path(&path).unwrap();
        assert_eq!(model.score(&[1.0; 6]), 1.5);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            LinearModel::from_path(&path),
            Err(MarketError::Model(_))
        ));
    }
}
