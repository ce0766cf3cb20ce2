use super::{seeded_rng, Sampler};
use crate::{Error, Result};

use rand_distr::{Distribution as _, LogNormal};

/// Lognormal distribution: `exp(N(mu, sigma))`.
///
/// Service durations are usually specified by their mean and spread rather than by the parameters of the underlying
/// normal, so [`from_mean_cv()`] and [`from_mean_std()`] derive `mu` and `sigma` from those instead:
///
/// ```text
/// sigma = sqrt(ln(1 + cv^2))
/// mu    = ln(mean) - sigma^2 / 2
/// ```
///
/// [`from_mean_cv()`]: Lognormal::from_mean_cv
/// [`from_mean_std()`]: Lognormal::from_mean_std
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lognormal {
    mu: f64,
    sigma: f64,
    inner: LogNormal<f64>,
}

impl Lognormal {
    /// # Errors
    ///
    /// Returns [`Error::InvalidDistribution`] unless `mu` is finite and `sigma` is finite and strictly positive.
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        if !mu.is_finite() {
            return Err(Error::InvalidDistribution(format!("lognormal mu must be finite, got {mu}")));
        }
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(Error::InvalidDistribution(format!("lognormal sigma must be positive, got {sigma}")));
        }
        let inner = LogNormal::new(mu, sigma).map_err(|e| Error::InvalidDistribution(e.to_string()))?;
        Ok(Self { mu, sigma, inner })
    }

    /// Lognormal distribution with the given mean and coefficient of variation (standard deviation over mean).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDistribution`] unless both arguments are finite and strictly positive.
    pub fn from_mean_cv(mean: f64, cv: f64) -> Result<Self> {
        if !(mean.is_finite() && mean > 0.0) {
            return Err(Error::InvalidDistribution(format!("lognormal mean must be positive, got {mean}")));
        }
        if !(cv.is_finite() && cv > 0.0) {
            return Err(Error::InvalidDistribution(format!(
                "lognormal coefficient of variation must be positive, got {cv}"
            )));
        }
        let sigma = (cv * cv).ln_1p().sqrt();
        Self::new(mean.ln() - sigma * sigma / 2.0, sigma)
    }

    /// Lognormal distribution with the given mean and standard deviation.
    ///
    /// # Errors
    ///
    /// Same as [`from_mean_cv()`](Lognormal::from_mean_cv).
    pub fn from_mean_std(mean: f64, std: f64) -> Result<Self> {
        if !(mean.is_finite() && mean > 0.0) {
            return Err(Error::InvalidDistribution(format!("lognormal mean must be positive, got {mean}")));
        }
        Self::from_mean_cv(mean, std / mean)
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl Sampler for Lognormal {
    fn sample(&self, size: usize, seed: Option<u64>) -> Vec<f64> {
        let mut rng = seeded_rng(seed);
        (0..size).map(|_| self.inner.sample(&mut rng)).collect()
    }

    fn mean(&self) -> f64 {
        (self.mu + self.sigma * self.sigma / 2.0).exp()
    }

    fn variance(&self) -> f64 {
        let s2 = self.sigma * self.sigma;
        s2.exp_m1() * (2.0 * self.mu + s2).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_and_cv_round_trip_through_parameters() {
        let d = Lognormal::from_mean_cv(25.0, 0.325).unwrap();
        assert_relative_eq!(25.0, d.mean(), max_relative = 1e-12);
        assert_relative_eq!(0.325, d.variance().sqrt() / d.mean(), max_relative = 1e-12);
    }

    #[test]
    fn mean_and_std_constructor_matches_cv_constructor() {
        let by_std = Lognormal::from_mean_std(20.0, 10.0).unwrap();
        let by_cv = Lognormal::from_mean_cv(20.0, 0.5).unwrap();
        assert_relative_eq!(by_std.mu(), by_cv.mu());
        assert_relative_eq!(by_std.sigma(), by_cv.sigma());
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(Lognormal::new(0.0, 0.0).is_err());
        assert!(Lognormal::new(f64::INFINITY, 1.0).is_err());
        assert!(Lognormal::from_mean_cv(-1.0, 0.3).is_err());
        assert!(Lognormal::from_mean_cv(10.0, 0.0).is_err());
    }
}
