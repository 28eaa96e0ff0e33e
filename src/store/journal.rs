/// Durable sample store - in-memory index + append-only JSONL journal
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::memory::SampleIndex;
use super::SampleStore;
use crate::error::{PriceError, Result};
use crate::types::Sample;

/// Journal-backed store.
///
/// Every accepted sample is appended as one JSON line and synced before it
/// becomes visible to queries. Expired records stay in the file until
/// `compact` rewrites it; they are skipped on replay.
pub struct JournalSampleStore {
    path: PathBuf,
    index: RwLock<SampleIndex>,
}

impl JournalSampleStore {
    /// Open (or create) a journal, replaying every record still live at `now`
    pub async fn open<P: AsRef<Path>>(path: P, now: DateTime<Utc>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut index = SampleIndex::default();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(storage_failure)?;
            }
        }

        if path.exists() {
            let (loaded, skipped_expired, corrupt) = replay(&path, now, &mut index).await?;
            info!(
                "Replayed journal {}: {} live samples, {} expired, {} corrupt lines",
                path.display(),
                loaded,
                skipped_expired,
                corrupt
            );
        } else {
            debug!("No existing journal at {}", path.display());
        }

        Ok(JournalSampleStore {
            path,
            index: RwLock::new(index),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the journal with live samples only, archiving the old file.
    /// Returns the number of samples kept.
    ///
    /// The replacement is fully written and synced next to the journal before
    /// the old file is moved aside, so a failure at any step leaves a complete
    /// journal at `path` (or, between the two renames, a complete `.compact`
    /// file that the next `compact` overwrites).
    pub async fn compact(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut index = self.index.write().await;
        index.expire(now);

        let mut lines = String::new();
        for sample in index.iter() {
            lines.push_str(&serde_json::to_string(sample)?);
            lines.push('\n');
        }

        let staging = self.staging_path();
        let mut file = tokio::fs::File::create(&staging).await.map_err(storage_failure)?;
        file.write_all(lines.as_bytes()).await.map_err(storage_failure)?;
        file.sync_all().await.map_err(storage_failure)?;
        drop(file);

        if self.path.exists() {
            tokio::fs::rename(&self.path, self.archive_path(now))
                .await
                .map_err(storage_failure)?;
        }
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(storage_failure)?;

        let kept = index.len();
        info!("Compacted journal {} - {} live samples kept", self.path.display(), kept);
        Ok(kept)
    }

    pub fn archive_path(&self, now: DateTime<Utc>) -> PathBuf {
        PathBuf::from(format!(
            "{}.{}.archive",
            self.path.display(),
            now.format("%Y%m%d_%H%M%S")
        ))
    }

    fn staging_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.compact", self.path.display()))
    }

    /// Append one line and sync. On failure the file is cut back to its
    /// previous length so a rejected sample cannot reappear on replay.
    async fn append_to_disk(&self, sample: &Sample) -> Result<()> {
        let json_line = serde_json::to_string(sample)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(storage_failure)?;
        let previous_len = file.metadata().await.map_err(storage_failure)?.len();

        let written = match file.write_all(format!("{}\n", json_line).as_bytes()).await {
            Ok(()) => file.sync_all().await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            rollback_append(&file, previous_len).await;
            return Err(storage_failure(e));
        }

        Ok(())
    }
}

async fn rollback_append(file: &tokio::fs::File, previous_len: u64) {
    if let Err(e) = file.set_len(previous_len).await {
        warn!("Failed to roll back partial journal append: {}", e);
    }
}

async fn replay(
    path: &Path,
    now: DateTime<Utc>,
    index: &mut SampleIndex,
) -> Result<(usize, usize, usize)> {
    let file = tokio::fs::File::open(path).await.map_err(storage_failure)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let (mut loaded, mut expired, mut corrupt) = (0, 0, 0);
    while let Some(line) = lines.next_line().await.map_err(storage_failure)? {
        if line.trim().is_empty() {
            continue;
        }
        let sample = match serde_json::from_str::<Sample>(&line) {
            Ok(sample) if sample.validate().is_ok() => sample,
            _ => {
                warn!("Skipping corrupt journal line in {}", path.display());
                corrupt += 1;
                continue;
            }
        };
        if sample.is_expired(now) {
            expired += 1;
            continue;
        }
        index.insert(sample);
        loaded += 1;
    }

    Ok((loaded, expired, corrupt))
}

fn storage_failure(e: std::io::Error) -> PriceError {
    PriceError::StorageFailure(format!("journal I/O failed: {}", e))
}

#[async_trait]
impl SampleStore for JournalSampleStore {
    async fn put(&self, sample: Sample) -> Result<()> {
        sample.validate()?;

        // held across the append so file order matches index order
        let mut index = self.index.write().await;
        self.append_to_disk(&sample).await?;
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
        Ok(index.expire(now))
    }

    async fn count(&self) -> usize {
        self.index.read().await.len()
    }

    fn backend_type(&self) -> &'static str {
        "journal"
    }
}
