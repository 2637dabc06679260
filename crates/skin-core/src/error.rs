//! Error types for market operations.
//!
//! This module defines [`MarketError`] which covers every failure that can occur
//! when fetching quotes, scraping history, caching payloads or forecasting.

use thiserror::Error;

/// Errors that can occur during market operations.
#[derive(Error, Debug)]
pub enum MarketError {
    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// An upstream marketplace answered with a non-success status.
    #[error("{source_name} returned HTTP {status}")]
    Upstream {
        /// The marketplace that failed.
        source_name: String,
        /// HTTP status code of the response.
        status: u16,
    },

    /// Rate limit exceeded by a marketplace.
    #[error("Rate limited by {source_name}: retry after {retry_after:?}")]
    RateLimited {
        /// The marketplace that rate limited the request.
        source_name: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The requested item was not found upstream.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Not enough data to build features or run a forecast.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// An upstream page no longer matches the structure the scraper expects.
    #[error("Format drift in {source_name}: {detail}")]
    FormatDrift {
        /// The marketplace whose payload changed shape.
        source_name: String,
        /// What did not match.
        detail: String,
    },

    /// Error parsing data from a marketplace.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// The scoring function produced an unusable value.
    #[error("Model error: {0}")]
    Model(String),

    /// The catalog id is not one of the supported item universes.
    #[error("Unknown catalog: {0}")]
    UnknownCatalog(u32),

    /// The requested component is not configured.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Identity verification failed in the authentication collaborator.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl MarketError {
    /// Returns true if this error means an upstream marketplace could not be used.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Upstream { .. } | Self::RateLimited { .. }
        )
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Result type alias using [`MarketError`].
pub type Result<T> = std::result::Result<T, MarketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        assert!(MarketError::Network("timeout".into()).is_upstream());
        assert!(
            MarketError::Upstream {
                source_name: "Steam".into(),
                status: 502
            }
            .is_upstream()
        );
        assert!(!MarketError::Cache("disk full".into()).is_upstream());
        assert!(!MarketError::InsufficientData("12 points".into()).is_upstream());
    }

    #[test]
    fn test_display() {
        let err = MarketError::FormatDrift {
            source_name: "Steam Community Market".into(),
            detail: "line1 is not an array".into(),
        };
        assert_eq!(
            err.to_string(),
            "Format drift in Steam Community Market: line1 is not an array"
        );
    }
}
