use super::{seeded_rng, Sampler};
use crate::{Error, Result};

use rand_distr::{Distribution as _, Exp};

/// Exponential distribution with the given rate, i.e. mean `1 / rate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exponential {
    rate: f64,
    inner: Exp<f64>,
}

impl Exponential {
    /// # Errors
    ///
    /// Returns [`Error::InvalidDistribution`] unless `rate` is finite and strictly positive.
    pub fn new(rate: f64) -> Result<Self> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(Error::InvalidDistribution(format!("exponential rate must be positive, got {rate}")));
        }
        let inner = Exp::new(rate).map_err(|e| Error::InvalidDistribution(e.to_string()))?;
        Ok(Self { rate, inner })
    }

    /// Exponential distribution with the given mean.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDistribution`] unless `mean` is finite and strictly positive.
    pub fn with_mean(mean: f64) -> Result<Self> {
        if !(mean.is_finite() && mean > 0.0) {
            return Err(Error::InvalidDistribution(format!("exponential mean must be positive, got {mean}")));
        }
        Self::new(1.0 / mean)
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl Sampler for Exponential {
    fn sample(&self, size: usize, seed: Option<u64>) -> Vec<f64> {
        let mut rng = seeded_rng(seed);
        (0..size).map(|_| self.inner.sample(&mut rng)).collect()
    }

    fn mean(&self) -> f64 {
        1.0 / self.rate
    }

    fn variance(&self) -> f64 {
        1.0 / (self.rate * self.rate)
    }
}
