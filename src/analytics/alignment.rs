//! Nearest-timestamp alignment of two sample series

use chrono::Duration;

use crate::types::{AlignedPair, Sample};

/// Default maximum timestamp distance for two samples to pair up
pub const DEFAULT_TOLERANCE_SECS: i64 = 60;

pub fn default_tolerance() -> Duration {
    Duration::seconds(DEFAULT_TOLERANCE_SECS)
}

/// Pair every sample of `a` with its nearest neighbour in `b`.
///
/// Both inputs must already be ascending by observedAt; nothing is re-sorted.
/// Each `a` scans the whole of `b` and keeps the first sample at minimal
/// distance (millisecond resolution). The pair is emitted only when that
/// distance is within `tolerance`; otherwise `a` is dropped. Samples of `b`
/// may appear in several pairs.
pub fn align(a: &[Sample], b: &[Sample], tolerance: Duration) -> Vec<AlignedPair> {
    let tolerance_ms = tolerance.num_milliseconds();
    let mut pairs = Vec::new();

    for left in a {
        let mut closest: Option<(i64, &Sample)> = None;

        for right in b {
            let diff = (left.observed_at - right.observed_at).num_milliseconds().abs();
            match closest {
                Some((best, _)) if diff >= best => {}
                _ => closest = Some((diff, right)),
            }
        }

        if let Some((diff, right)) = closest {
            if diff <= tolerance_ms {
                pairs.push(AlignedPair {
                    a: left.clone(),
                    b: right.clone(),
                });
            }
        }
    }

    pairs
}

/// Split pairs back into the two paired sequences
pub fn unzip_pairs(pairs: Vec<AlignedPair>) -> (Vec<Sample>, Vec<Sample>) {
    pairs.into_iter().map(|pair| (pair.a, pair.b)).unzip()
}
