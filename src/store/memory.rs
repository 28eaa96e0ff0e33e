/// In-memory sample store with (ticker, observedAt) and expiresAt indexes
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use super::SampleStore;
use crate::error::Result;
use crate::types::Sample;

/// Index shared by the in-memory and journal-backed stores.
///
/// `seq` is an insertion counter: it keeps repeated observations at the same
/// instant distinct and ordered by arrival.
#[derive(Debug, Default)]
pub(crate) struct SampleIndex {
    by_ticker: HashMap<String, BTreeMap<(DateTime<Utc>, u64), Sample>>,
    by_expiry: BTreeMap<(DateTime<Utc>, u64), (String, DateTime<Utc>)>,
    next_seq: u64,
}

impl SampleIndex {
    pub(crate) fn insert(&mut self, sample: Sample) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.by_expiry.insert(
            (sample.expires_at, seq),
            (sample.ticker.clone(), sample.observed_at),
        );
        self.by_ticker
            .entry(sample.ticker.clone())
            .or_default()
            .insert((sample.observed_at, seq), sample);
    }

    /// Live samples for `ticker` with observedAt >= `from`, ascending
    pub(crate) fn scan(&self, ticker: &str, from: DateTime<Utc>, now: DateTime<Utc>) -> Vec<Sample> {
        match self.by_ticker.get(ticker) {
            Some(series) => series
                .range((from, 0)..)
                .map(|(_, sample)| sample)
                .filter(|sample| !sample.is_expired(now))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Physically drop every sample with expiresAt <= now
    pub(crate) fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;

        while let Some(entry) = self.by_expiry.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let ((_, seq), (ticker, observed_at)) = entry.remove_entry();

            if let Some(series) = self.by_ticker.get_mut(&ticker) {
                series.remove(&(observed_at, seq));
                if series.is_empty() {
                    self.by_ticker.remove(&ticker);
                }
            }
            removed += 1;
        }

        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.by_expiry.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.by_ticker.values().flat_map(|series| series.values())
    }
}

/// Volatile store; contents are lost on restart
#[derive(Debug, Default)]
pub struct MemorySampleStore {
    index: RwLock<SampleIndex>,
}

impl MemorySampleStore {
    pub fn new() -> Self {
        MemorySampleStore::default()
    }
}

#[async_trait]
impl SampleStore for MemorySampleStore {
    async fn put(&self, sample: Sample) -> Result<()> {
        sample.validate()?;

        let mut index = self.index.write().await;
        index.insert(sample);
        Ok(())
    }

    async fn scan_by_key_range(
        &self,
        ticker: &str,
        from: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Sample>> {
        let index = self.index.read().await;
        Ok(index.scan(ticker, from, now))
    }

    async fn expire(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut index = self.index.write().await;
        let removed = index.expire(now);
        if removed > 0 {
            debug!("Expired {} samples, {} remaining", removed, index.len());
        }
        Ok(removed)
    }

    async fn count(&self) -> usize {
        self.index.read().await.len()
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
