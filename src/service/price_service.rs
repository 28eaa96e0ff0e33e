/// Ingestion, average-price and correlation queries over a sample store
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analytics::{align, mean, mean_or_zero, stats, unzip_pairs};
use crate::data::history;
use crate::error::{PriceError, Result};
use crate::store::SampleStore;
use crate::time::Clock;
use crate::types::{Aggregation, AveragePrice, Config, Correlation, Sample, TickerSummary};

pub struct PriceService {
    store: Arc<dyn SampleStore>,
    clock: Arc<dyn Clock>,

    /// Lifetime given to samples ingested without an explicit expiry
    retention: Duration,

    /// Tolerance used by `correlate_tickers`
    tolerance: Duration,
}

impl PriceService {
    pub fn new(store: Arc<dyn SampleStore>, clock: Arc<dyn Clock>, config: &Config) -> Result<Self> {
        Ok(PriceService::with_settings(
            store,
            clock,
            config.retention()?,
            config.alignment_tolerance()?,
        ))
    }

    pub fn with_settings(
        store: Arc<dyn SampleStore>,
        clock: Arc<dyn Clock>,
        retention: Duration,
        tolerance: Duration,
    ) -> Self {
        PriceService {
            store,
            clock,
            retention,
            tolerance,
        }
    }

    pub fn store(&self) -> &Arc<dyn SampleStore> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Record a price; it expires one retention period after `observed_at`
    pub async fn ingest(&self, ticker: &str, price: f64, observed_at: DateTime<Utc>) -> Result<Sample> {
        let expires_at = observed_at.checked_add_signed(self.retention).ok_or_else(|| {
            PriceError::InvalidSample(format!(
                "expiry of {} sample observed at {} is out of range",
                ticker, observed_at
            ))
        })?;
        self.ingest_with_expiry(ticker, price, observed_at, expires_at).await
    }

    /// Record a price with a caller-chosen expiry
    pub async fn ingest_with_expiry(
        &self,
        ticker: &str,
        price: f64,
        observed_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Sample> {
        let sample = Sample::new(ticker, price, observed_at, expires_at).map_err(|e| {
            warn!("Rejected sample for '{}': {}", ticker, e);
            e
        })?;

        self.store.put(sample.clone()).await?;
        debug!("Ingested {} @ {} observed {}", sample.ticker, sample.price, sample.observed_at);
        Ok(sample)
    }

    /// Store pre-built samples in order, stopping at the first failure
    pub async fn ingest_batch(&self, samples: Vec<Sample>) -> Result<usize> {
        let total = samples.len();
        for sample in samples {
            self.store.put(sample).await?;
        }
        info!("Ingested batch of {} samples into {} store", total, self.store.backend_type());
        Ok(total)
    }

    pub async fn history(&self, ticker: &str, window: Duration) -> Result<Vec<Sample>> {
        history(self.store.as_ref(), self.clock.now(), ticker, window).await
    }

    /// Mean price over the window; an empty window is `NoDataAvailable`
    pub async fn average_price(&self, ticker: &str, window: Duration) -> Result<AveragePrice> {
        let price_history = self.history(ticker, window).await?;
        if price_history.is_empty() {
            return Err(PriceError::NoDataAvailable(format!(
                "No price history available for ticker: {}",
                ticker
            )));
        }

        let prices: Vec<f64> = price_history.iter().map(|s| s.price).collect();
        let average = mean(&prices)?;

        Ok(AveragePrice {
            ticker: ticker.to_string(),
            average_stock_price: average,
            price_history,
        })
    }

    /// Single-ticker aggregation by name; only "average" exists
    pub async fn aggregate(&self, ticker: &str, window: Duration, aggregation: &str) -> Result<AveragePrice> {
        match Aggregation::parse(aggregation)? {
            Aggregation::Average => self.average_price(ticker, window).await,
        }
    }

    /// Correlate two tickers over the window after nearest-timestamp alignment.
    ///
    /// No aligned pairs is not an error: the correlation is 0 and both paired
    /// sequences are empty.
    pub async fn correlate(
        &self,
        ticker_a: &str,
        ticker_b: &str,
        window: Duration,
        tolerance: Duration,
    ) -> Result<Correlation> {
        if tolerance < Duration::zero() {
            return Err(PriceError::InvalidParameter(format!(
                "tolerance must not be negative: {}ms",
                tolerance.num_milliseconds()
            )));
        }

        let now = self.clock.now();
        let history_a = history(self.store.as_ref(), now, ticker_a, window).await?;
        let history_b = history(self.store.as_ref(), now, ticker_b, window).await?;

        let (paired_a, paired_b) = unzip_pairs(align(&history_a, &history_b, tolerance));

        let prices_a: Vec<f64> = paired_a.iter().map(|s| s.price).collect();
        let prices_b: Vec<f64> = paired_b.iter().map(|s| s.price).collect();
        let correlation = stats::correlation(&prices_a, &prices_b)?;

        info!(
            "Correlation {} vs {} over {} minutes: {:.6} from {} aligned pairs",
            ticker_a,
            ticker_b,
            window.num_minutes(),
            correlation,
            paired_a.len()
        );

        Ok(Correlation {
            correlation,
            stocks: [
                TickerSummary {
                    ticker: ticker_a.to_string(),
                    average_price: mean_or_zero(&prices_a),
                    price_history: history_a,
                },
                TickerSummary {
                    ticker: ticker_b.to_string(),
                    average_price: mean_or_zero(&prices_b),
                    price_history: history_b,
                },
            ],
            paired_a,
            paired_b,
        })
    }

    /// Correlate a caller-supplied ticker list, which must hold exactly two
    pub async fn correlate_tickers(&self, tickers: &[String], window: Duration) -> Result<Correlation> {
        match tickers {
            [a, b] => self.correlate(a, b, window, self.tolerance).await,
            _ => Err(PriceError::UnsupportedOperation(format!(
                "Exactly two tickers required, got {}",
                tickers.len()
            ))),
        }
    }

    /// Physically remove everything expired as of now
    pub async fn sweep(&self) -> Result<usize> {
        let removed = self.store.expire(self.clock.now()).await?;
        if removed > 0 {
            info!("Swept {} expired samples", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySampleStore;
    use crate::time::ManualClock;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn service() -> (PriceService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let service = PriceService::new(
            Arc::new(MemorySampleStore::new()),
            clock.clone(),
            &Config::default(),
        )
        .unwrap();
        (service, clock)
    }

    #[tokio::test]
    async fn test_ingest_applies_retention() {
        let (service, _) = service();
        let sample = service.ingest("NVDA", 100.0, start()).await.unwrap();
        assert_eq!(sample.expires_at, start() + Duration::hours(1));
        assert!(sample.expires_at > sample.observed_at);
    }

    #[tokio::test]
    async fn test_ingest_expiry_overflow_is_invalid_sample() {
        let clock = Arc::new(ManualClock::new(start()));
        let service = PriceService::with_settings(
            Arc::new(MemorySampleStore::new()),
            clock,
            Duration::MAX,
            Duration::seconds(60),
        );

        assert!(matches!(
            service.ingest("NVDA", 1.0, start()).await,
            Err(PriceError::InvalidSample(_))
        ));
        assert_eq!(service.store().count().await, 0);
    }

    #[tokio::test]
    async fn test_correlate_huge_window() {
        let (service, _) = service();
        service.ingest("AAA", 1.0, start()).await.unwrap();
        service.ingest("BBB", 2.0, start()).await.unwrap();

        let result = service
            .correlate("AAA", "BBB", Duration::days(100_000_000), Duration::seconds(60))
            .await
            .unwrap();
        assert_eq!(result.pair_count(), 1);
        assert_eq!(result.correlation, 0.0);
    }

    #[tokio::test]
    async fn test_new_rejects_out_of_range_config() {
        let config = Config {
            retention_secs: i64::MAX,
            ..Config::default()
        };
        let result = PriceService::new(
            Arc::new(MemorySampleStore::new()),
            Arc::new(ManualClock::new(start())),
            &config,
        );
        assert!(matches!(result, Err(PriceError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_ingest_rejects_invalid_and_stores_nothing() {
        let (service, _) = service();
        assert!(matches!(
            service.ingest("", 100.0, start()).await,
            Err(PriceError::InvalidSample(_))
        ));
        assert!(matches!(
            service.ingest("NVDA", f64::NAN, start()).await,
            Err(PriceError::InvalidSample(_))
        ));
        assert_eq!(service.store().count().await, 0);
    }

    #[tokio::test]
    async fn test_retention_hides_old_samples() {
        let (service, clock) = service();
        service.ingest("NVDA", 100.0, start()).await.unwrap();

        clock.advance(Duration::minutes(59));
        assert_eq!(service.history("NVDA", Duration::hours(2)).await.unwrap().len(), 1);

        clock.advance(Duration::minutes(1));
        assert!(service.history("NVDA", Duration::hours(2)).await.unwrap().is_empty());
        assert_eq!(service.sweep().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_average_price_and_no_data() {
        let (service, _) = service();
        service.ingest("PYPL", 10.0, start() - Duration::minutes(5)).await.unwrap();
        service.ingest("PYPL", 20.0, start() - Duration::minutes(1)).await.unwrap();

        let avg = service.average_price("PYPL", Duration::minutes(10)).await.unwrap();
        assert_eq!(avg.average_stock_price, 15.0);
        assert_eq!(avg.price_history.len(), 2);

        assert!(matches!(
            service.average_price("MISSING", Duration::minutes(10)).await,
            Err(PriceError::NoDataAvailable(_))
        ));
    }

    #[tokio::test]
    async fn test_aggregate_rejects_unknown_kind() {
        let (service, _) = service();
        service.ingest("PYPL", 10.0, start()).await.unwrap();

        assert!(service.aggregate("PYPL", Duration::minutes(10), "average").await.is_ok());
        assert!(matches!(
            service.aggregate("PYPL", Duration::minutes(10), "max").await,
            Err(PriceError::UnsupportedOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_correlate_tickers_requires_two() {
        let (service, _) = service();
        let one = vec!["NVDA".to_string()];
        let three = vec!["NVDA".to_string(), "GOOGL".to_string(), "PYPL".to_string()];

        assert!(matches!(
            service.correlate_tickers(&one, Duration::minutes(60)).await,
            Err(PriceError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            service.correlate_tickers(&three, Duration::minutes(60)).await,
            Err(PriceError::UnsupportedOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_correlate_aligned_series() {
        let (service, _) = service();
        for (i, (a, b)) in [(1.0, 2.0), (2.0, 4.1), (3.0, 5.9), (4.0, 8.0)].iter().enumerate() {
            let t = start() - Duration::minutes(10 - i as i64);
            service.ingest("AAA", *a, t).await.unwrap();
            service.ingest("BBB", *b, t + Duration::seconds(20)).await.unwrap();
        }

        let result = service
            .correlate("AAA", "BBB", Duration::minutes(30), Duration::seconds(60))
            .await
            .unwrap();
        assert_eq!(result.pair_count(), 4);
        assert!(result.correlation > 0.99);
        assert_eq!(result.stocks[0].average_price, 2.5);

        let swapped = service
            .correlate("BBB", "AAA", Duration::minutes(30), Duration::seconds(60))
            .await
            .unwrap();
        assert!((swapped.correlation - result.correlation).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_correlate_rejects_negative_tolerance() {
        let (service, _) = service();
        assert!(matches!(
            service
                .correlate("AAA", "BBB", Duration::minutes(30), Duration::seconds(-1))
                .await,
            Err(PriceError::InvalidParameter(_))
        ));
    }
}
