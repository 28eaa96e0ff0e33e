//! Sample storage backends
//!
//! Expired samples are filtered out by every read, so callers never see a
//! sample at or past its `expiresAt`. Physical removal happens separately,
//! either on demand through `expire` or from the background sweeper.

pub mod journal;
pub mod memory;

pub use journal::JournalSampleStore;
pub use memory::MemorySampleStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::error::Result;
use crate::time::Clock;
use crate::types::Sample;

/// Storage seam for the query core
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Insert one sample. No uniqueness constraint on (ticker, observedAt).
    async fn put(&self, sample: Sample) -> Result<()>;

    /// Samples of `ticker` with observedAt >= `from` and expiresAt > `now`,
    /// ascending by observedAt
    async fn scan_by_key_range(
        &self,
        ticker: &str,
        from: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Sample>>;

    /// Remove every sample with expiresAt <= `now`, returning how many went
    async fn expire(&self, now: DateTime<Utc>) -> Result<usize>;

    /// Physically stored samples, expired-but-unswept ones included
    async fn count(&self) -> usize;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}

/// Periodically sweep expired samples out of `store`
pub fn spawn_expiry_sweeper(
    store: Arc<dyn SampleStore>,
    clock: Arc<dyn Clock>,
    every: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match store.expire(clock.now()).await {
                Ok(0) => {}
                Ok(removed) => debug!(
                    "Sweeper removed {} expired samples from {} store",
                    removed,
                    store.backend_type()
                ),
                Err(e) => error!("Expiry sweep failed: {} ({})", e, e.error_code()),
            }
        }
    })
}
