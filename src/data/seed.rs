/// Demo data for local runs
use chrono::Duration;
use tracing::info;

use crate::error::Result;
use crate::service::PriceService;
use crate::types::Sample;

/// (ticker, price, minutes before now)
const DEMO_SAMPLES: [(&str, f64, i64); 7] = [
    ("NVDA", 231.95296, 50),
    ("NVDA", 124.95156, 40),
    ("NVDA", 459.09558, 30),
    ("GOOGL", 150.23456, 45),
    ("GOOGL", 152.78901, 35),
    ("PYPL", 680.59766, 15),
    ("PYPL", 652.6387, 10),
];

/// Insert the demo samples relative to the service clock. They all expire
/// ten minutes from now regardless of the configured retention.
pub async fn seed_demo_data(service: &PriceService) -> Result<usize> {
    let now = service.now();
    let expires_at = now + Duration::minutes(10);

    let samples = DEMO_SAMPLES
        .iter()
        .map(|(ticker, price, minutes_ago)| {
            Sample::new(*ticker, *price, now - Duration::minutes(*minutes_ago), expires_at)
        })
        .collect::<Result<Vec<_>>>()?;

    let inserted = service.ingest_batch(samples).await?;
    info!("Inserted {} demo stock price entries", inserted);
    Ok(inserted)
}
