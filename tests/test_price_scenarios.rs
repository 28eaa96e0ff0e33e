//! End-to-end scenarios over the public API with a synthetic clock

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use pricecorr::{
    analytics::{align, default_tolerance},
    data::seed_demo_data,
    store::{JournalSampleStore, MemorySampleStore, SampleStore},
    time::{Clock, ManualClock},
    Config, PriceError, PriceService,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 14, 0, 0).unwrap()
}

fn memory_service() -> (PriceService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(now()));
    let service = PriceService::new(
        Arc::new(MemorySampleStore::new()),
        clock.clone(),
        &Config::default(),
    )
    .unwrap();
    (service, clock)
}

#[tokio::test]
async fn test_nvda_history_and_average() {
    let (service, _) = memory_service();
    for (minutes_ago, price) in [(50, 231.95296), (40, 124.95156), (30, 459.09558)] {
        service
            .ingest("NVDA", price, now() - Duration::minutes(minutes_ago))
            .await
            .unwrap();
    }

    let history = service.history("NVDA", Duration::minutes(60)).await.unwrap();
    let prices: Vec<f64> = history.iter().map(|s| s.price).collect();
    assert_eq!(prices, vec![231.95296, 124.95156, 459.09558]);
    assert!(history.windows(2).all(|w| w[0].observed_at < w[1].observed_at));

    let avg = service.average_price("NVDA", Duration::minutes(60)).await.unwrap();
    assert!((avg.average_stock_price - 272.0000333).abs() < 1e-6);
    assert_eq!(avg.price_history.len(), 3);
}

#[tokio::test]
async fn test_disjoint_series_correlate_to_zero() {
    let (service, _) = memory_service();
    seed_demo_data(&service).await.unwrap();

    let nvda = service.history("NVDA", Duration::minutes(60)).await.unwrap();
    let googl = service.history("GOOGL", Duration::minutes(60)).await.unwrap();
    assert!(align(&nvda, &googl, default_tolerance()).is_empty());

    let tickers = vec!["NVDA".to_string(), "GOOGL".to_string()];
    let result = service
        .correlate_tickers(&tickers, Duration::minutes(60))
        .await
        .unwrap();

    assert_eq!(result.correlation, 0.0);
    assert!(result.paired_a.is_empty());
    assert!(result.paired_b.is_empty());
    assert_eq!(result.stocks[0].average_price, 0.0);
    assert_eq!(result.stocks[0].price_history.len(), 3);
    assert_eq!(result.stocks[1].price_history.len(), 2);
}

#[tokio::test]
async fn test_missing_ticker() {
    let (service, _) = memory_service();
    seed_demo_data(&service).await.unwrap();

    assert!(service
        .history("MISSING", Duration::minutes(60))
        .await
        .unwrap()
        .is_empty());
    assert!(matches!(
        service.average_price("MISSING", Duration::minutes(60)).await,
        Err(PriceError::NoDataAvailable(_))
    ));
}

#[tokio::test]
async fn test_constant_series_correlates_to_zero() {
    let (service, _) = memory_service();
    for i in 0..5 {
        let t = now() - Duration::minutes(10 - i);
        service.ingest("FLAT", 100.0, t).await.unwrap();
        service.ingest("MOVE", 100.0 + i as f64, t + Duration::seconds(5)).await.unwrap();
    }

    let result = service
        .correlate("FLAT", "MOVE", Duration::minutes(30), default_tolerance())
        .await
        .unwrap();
    assert_eq!(result.pair_count(), 5);
    assert_eq!(result.correlation, 0.0);
}

#[tokio::test]
async fn test_correlation_is_symmetric_and_repeatable() {
    let (service, _) = memory_service();
    let a_prices = [10.0, 12.5, 11.0, 14.0, 13.2, 15.9];
    let b_prices = [200.0, 210.0, 205.5, 230.0, 228.0, 241.0];
    for (i, (a, b)) in a_prices.iter().zip(b_prices.iter()).enumerate() {
        let t = now() - Duration::minutes(20) + Duration::minutes(3 * i as i64);
        service.ingest("AAA", *a, t).await.unwrap();
        service.ingest("BBB", *b, t - Duration::seconds(15)).await.unwrap();
    }

    let window = Duration::minutes(30);
    let ab = service.correlate("AAA", "BBB", window, default_tolerance()).await.unwrap();
    let ba = service.correlate("BBB", "AAA", window, default_tolerance()).await.unwrap();
    let again = service.correlate("AAA", "BBB", window, default_tolerance()).await.unwrap();

    assert_eq!(ab.pair_count(), 6);
    assert!(ab.correlation > 0.9);
    assert!((ab.correlation - ba.correlation).abs() < 1e-12);
    assert_eq!(ab.correlation.to_bits(), again.correlation.to_bits());
    assert!(ab
        .paired_a
        .iter()
        .zip(&ab.paired_b)
        .all(|(a, b)| (a.observed_at - b.observed_at).abs() <= default_tolerance()));
}

#[tokio::test]
async fn test_expiry_is_invisible_for_any_now() {
    let (service, clock) = memory_service();
    seed_demo_data(&service).await.unwrap();

    for step in 0..15 {
        let current = clock.now();
        for ticker in ["NVDA", "GOOGL", "PYPL"] {
            let history = service.history(ticker, Duration::minutes(120)).await.unwrap();
            assert!(history.iter().all(|s| s.expires_at > current), "step {}", step);
        }
        clock.advance(Duration::minutes(1));
    }
}

#[tokio::test]
async fn test_journal_backed_service_round_trip() {
    let path = std::env::temp_dir().join(format!("pricecorr_it_{}.jsonl", uuid::Uuid::new_v4()));
    let clock = Arc::new(ManualClock::new(now()));

    {
        let store = Arc::new(JournalSampleStore::open(&path, now()).await.unwrap());
        let service = PriceService::new(store, clock.clone(), &Config::default()).unwrap();
        seed_demo_data(&service).await.unwrap();
    }

    let store = Arc::new(JournalSampleStore::open(&path, now()).await.unwrap());
    assert_eq!(store.count().await, 7);
    let service = PriceService::new(store, clock.clone(), &Config::default()).unwrap();
    let avg = service.average_price("NVDA", Duration::minutes(60)).await.unwrap();
    assert!((avg.average_stock_price - 272.0000333).abs() < 1e-6);

    let _ = std::fs::remove_file(path);
}
