/// Bounded-lookback history queries
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::{PriceError, Result};
use crate::store::SampleStore;
use crate::types::Sample;

/// Every live sample of `ticker` observed within `window` before `now`,
/// ascending by observedAt. An empty result is not an error.
pub async fn history(
    store: &dyn SampleStore,
    now: DateTime<Utc>,
    ticker: &str,
    window: Duration,
) -> Result<Vec<Sample>> {
    if window < Duration::zero() {
        return Err(PriceError::InvalidParameter(format!(
            "window must not be negative: {}s",
            window.num_seconds()
        )));
    }

    // a window reaching past the representable range covers everything live
    let cutoff = now
        .checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let entries = store.scan_by_key_range(ticker, cutoff, now).await?;

    debug!(
        "Retrieved {} entries for ticker {} within {} minutes",
        entries.len(),
        ticker,
        window.num_minutes()
    );

    Ok(entries)
}
