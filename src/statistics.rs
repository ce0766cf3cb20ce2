//! Sample statistics over pooled simulation outputs.
//!
//! Thin wrappers over [`statrs`] that turn an empty or too-short sample into an [`Error`] instead of a `NaN`.

use crate::{Error, Result};

use statrs::statistics::Statistics;

/// # Errors
///
/// Returns [`Error::EmptySample`] if `values` is empty.
pub fn mean(values: &[f64]) -> Result<f64> {
    non_empty(values)?;
    Ok(values.iter().mean())
}

/// Standard deviation with divisor `n`.
///
/// # Errors
///
/// Returns [`Error::EmptySample`] if `values` is empty.
pub fn population_std_dev(values: &[f64]) -> Result<f64> {
    non_empty(values)?;
    Ok(values.iter().population_std_dev())
}

/// # Errors
///
/// Returns [`Error::EmptySample`] if `values` is empty.
pub fn max(values: &[f64]) -> Result<f64> {
    non_empty(values)?;
    Ok(values.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Unbiased variance with divisor `n - 1`, or `None` for fewer than two values.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    (values.len() >= 2).then(|| values.iter().variance())
}

/// Unbiased covariance with divisor `n - 1`, or `None` for fewer than two pairs or unequal lengths.
pub fn sample_covariance(xs: &[f64], ys: &[f64]) -> Option<f64> {
    (xs.len() >= 2 && xs.len() == ys.len()).then(|| xs.iter().covariance(ys.iter()))
}

/// Pearson correlation, or `None` when it is undefined because a sample is too short or has no spread.
pub fn correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let covariance = sample_covariance(xs, ys)?;
    let spread = (sample_variance(xs)? * sample_variance(ys)?).sqrt();
    (spread > 0.0).then(|| covariance / spread)
}

/// The `q`-th percentile with linear interpolation between the two nearest ranks.
///
/// # Errors
///
/// Returns [`Error::EmptySample`] if `values` is empty, and [`Error::InvalidConfig`] if `q` lies outside `[0, 100]`.
pub fn percentile(values: &[f64], q: f64) -> Result<f64> {
    non_empty(values)?;
    if !(0.0..=100.0).contains(&q) {
        return Err(Error::config("percentile", format!("must lie in [0, 100], got {q}")));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let (below, above) = (rank.floor() as usize, rank.ceil() as usize);
    Ok(sorted[below] + (sorted[above] - sorted[below]) * (rank - below as f64))
}

fn non_empty(values: &[f64]) -> Result {
    if values.is_empty() {
        Err(Error::EmptySample)
    } else {
        Ok(())
    }
}
