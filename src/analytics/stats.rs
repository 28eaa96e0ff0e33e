/// Sample statistics over price sequences
///
/// Covariance and standard deviation use the n-1 (sample) denominator. With
/// fewer than two values that denominator is zero or negative, so both return
/// `0.0` instead of NaN; `correlation` then also yields `0.0`.
use crate::error::{PriceError, Result};

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(PriceError::EmptyInput("mean of zero values".to_string()));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Arithmetic mean, `0.0` for an empty sequence
pub fn mean_or_zero(values: &[f64]) -> f64 {
    mean(values).unwrap_or(0.0)
}

/// Sample covariance around the supplied means
pub fn covariance(xs: &[f64], ys: &[f64], mean_x: f64, mean_y: f64) -> Result<f64> {
    check_lengths(xs, ys)?;

    let n = xs.len();
    if n < 2 {
        return Ok(0.0);
    }

    let sum: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();

    Ok(sum / (n - 1) as f64)
}

/// Sample standard deviation around the supplied mean
pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let sum: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum / (n - 1) as f64).sqrt()
}

/// Pearson correlation of two equally long sequences.
///
/// Returns `0.0` when either side has zero spread. Not clamped to [-1, 1].
pub fn correlation(xs: &[f64], ys: &[f64]) -> Result<f64> {
    check_lengths(xs, ys)?;

    let mean_x = mean_or_zero(xs);
    let mean_y = mean_or_zero(ys);

    let cov = covariance(xs, ys, mean_x, mean_y)?;
    let std_x = std_dev(xs, mean_x);
    let std_y = std_dev(ys, mean_y);

    if std_x == 0.0 || std_y == 0.0 {
        return Ok(0.0);
    }

    Ok(cov / (std_x * std_y))
}

fn check_lengths(xs: &[f64], ys: &[f64]) -> Result<()> {
    if xs.len() != ys.len() {
        return Err(PriceError::InvalidParameter(format!(
            "sequence lengths differ: {} vs {}",
            xs.len(),
            ys.len()
        )));
    }
    Ok(())
}
