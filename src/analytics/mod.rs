pub mod alignment;
pub mod stats;

pub use alignment::{align, default_tolerance, unzip_pairs, DEFAULT_TOLERANCE_SECS};
pub use stats::{correlation, covariance, mean, mean_or_zero, std_dev};
