/// Core type definitions for the price analytics core
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PriceError, Result};
use crate::time::delta;

/// One observed price for a ticker.
///
/// Samples are immutable once created and disappear from every query once
/// `expires_at` has been reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub id: Uuid,
    pub ticker: String,
    pub price: f64,
    pub observed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Sample {
    /// Build a validated sample with a fresh opaque id
    pub fn new(
        ticker: impl Into<String>,
        price: f64,
        observed_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self> {
        let sample = Sample {
            id: Uuid::new_v4(),
            ticker: ticker.into(),
            price,
            observed_at,
            expires_at,
        };
        sample.validate()?;
        Ok(sample)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ticker.is_empty() {
            return Err(PriceError::InvalidSample("ticker is empty".to_string()));
        }

        if !self.price.is_finite() {
            return Err(PriceError::InvalidSample(format!(
                "price for {} is not finite: {}",
                self.ticker, self.price
            )));
        }

        if self.expires_at <= self.observed_at {
            return Err(PriceError::InvalidSample(format!(
                "expiresAt {} is not after observedAt {} for {}",
                self.expires_at, self.observed_at, self.ticker
            )));
        }

        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Two samples from different series matched by nearest timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedPair {
    pub a: Sample,
    pub b: Sample,
}

impl AlignedPair {
    /// Absolute timestamp distance between the two samples
    pub fn delta(&self) -> Duration {
        (self.a.observed_at - self.b.observed_at).abs()
    }
}

/// Supported single-ticker aggregations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Average,
}

impl Aggregation {
    pub fn as_str(&self) -> &str {
        match self {
            Aggregation::Average => "average",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "average" => Ok(Aggregation::Average),
            other => Err(PriceError::UnsupportedOperation(format!(
                "Unsupported aggregation type: {}",
                other
            ))),
        }
    }
}

/// Average price over a window, with the samples it was computed from
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AveragePrice {
    pub ticker: String,
    pub average_stock_price: f64,
    pub price_history: Vec<Sample>,
}

/// Per-ticker part of a correlation response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerSummary {
    pub ticker: String,
    /// Mean of the prices that took part in the alignment (0 when none did)
    pub average_price: f64,
    /// Full window history, aligned or not
    pub price_history: Vec<Sample>,
}

/// Result of correlating two tickers over a window
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlation {
    pub correlation: f64,
    pub paired_a: Vec<Sample>,
    pub paired_b: Vec<Sample>,
    pub stocks: [TickerSummary; 2],
}

impl Correlation {
    pub fn pair_count(&self) -> usize {
        self.paired_a.len()
    }
}

/// Runtime configuration (loaded from TOML)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    // Store
    pub retention_secs: i64,
    pub journal_path: Option<String>,
    pub sweep_interval_secs: u64,
    pub seed_on_startup: bool,

    // Queries
    pub alignment_tolerance_secs: i64,
    pub default_window_minutes: i64,

    // Logging
    pub log_level: String,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            retention_secs: 3600,
            journal_path: None,
            sweep_interval_secs: 30,
            seed_on_startup: false,
            alignment_tolerance_secs: 60,
            default_window_minutes: 60,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    pub fn retention(&self) -> Result<Duration> {
        delta::seconds(self.retention_secs).map_err(config_range_error("retention_secs"))
    }

    pub fn alignment_tolerance(&self) -> Result<Duration> {
        delta::seconds(self.alignment_tolerance_secs)
            .map_err(config_range_error("alignment_tolerance_secs"))
    }

    pub fn default_window(&self) -> Result<Duration> {
        delta::minutes(self.default_window_minutes)
            .map_err(config_range_error("default_window_minutes"))
    }
}

fn config_range_error(field: &'static str) -> impl Fn(PriceError) -> PriceError {
    move |e| PriceError::ConfigError(format!("{}: {}", field, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_validation() {
        let now = Utc::now();
        let later = now + Duration::hours(1);

        assert!(Sample::new("NVDA", 231.95, now, later).is_ok());
        assert!(Sample::new("NVDA", -5.0, now, later).is_ok());

        assert!(matches!(
            Sample::new("", 1.0, now, later),
            Err(PriceError::InvalidSample(_))
        ));
        assert!(matches!(
            Sample::new("NVDA", f64::NAN, now, later),
            Err(PriceError::InvalidSample(_))
        ));
        assert!(matches!(
            Sample::new("NVDA", f64::INFINITY, now, later),
            Err(PriceError::InvalidSample(_))
        ));
        assert!(matches!(
            Sample::new("NVDA", 1.0, now, now),
            Err(PriceError::InvalidSample(_))
        ));
    }

    #[test]
    fn test_sample_wire_shape() {
        let now = Utc::now();
        let sample = Sample::new("PYPL", 680.59766, now, now + Duration::minutes(10)).unwrap();
        let json = serde_json::to_value(&sample).unwrap();

        assert_eq!(json["ticker"], "PYPL");
        assert_eq!(json["price"], 680.59766);
        assert!(json.get("observedAt").is_some());
        assert!(json.get("expiresAt").is_some());

        let back: Sample = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_config_durations_out_of_range() {
        let config = Config {
            retention_secs: i64::MAX,
            default_window_minutes: i64::MAX,
            ..Config::default()
        };
        assert!(matches!(config.retention(), Err(PriceError::ConfigError(_))));
        assert!(matches!(config.default_window(), Err(PriceError::ConfigError(_))));
        assert_eq!(config.alignment_tolerance().unwrap(), Duration::seconds(60));
    }

    #[test]
    fn test_aggregation_parse() {
        assert_eq!(Aggregation::parse("average").unwrap(), Aggregation::Average);
        assert!(matches!(
            Aggregation::parse("median"),
            Err(PriceError::UnsupportedOperation(_))
        ));
    }
}
