/// Checked construction of durations from caller-supplied counts
use chrono::Duration;

use crate::error::{PriceError, Result};

pub fn minutes(count: i64) -> Result<Duration> {
    Duration::try_minutes(count)
        .ok_or_else(|| PriceError::InvalidParameter(format!("{} minutes is out of range", count)))
}

pub fn seconds(count: i64) -> Result<Duration> {
    Duration::try_seconds(count)
        .ok_or_else(|| PriceError::InvalidParameter(format!("{} seconds is out of range", count)))
}
