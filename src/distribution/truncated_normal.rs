use super::{seeded_rng, Sampler};
use crate::{Error, Result};

use rand_distr::{Distribution as _, StandardNormal};
use statrs::function::erf::erf;
use std::f64::consts::{PI, SQRT_2};

/// Normal distribution `N(mu, sigma)` restricted to `[lower, upper]`.
///
/// Used for patient unpunctuality: how many minutes early (negative) or late (positive) a patient turns up relative
/// to their slot. Draws are rejection-sampled, so their moments match [`mean()`] and [`variance()`] exactly rather
/// than piling up mass on the bounds.
///
/// [`mean()`]: Sampler::mean
/// [`variance()`]: Sampler::variance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedNormal {
    mu: f64,
    sigma: f64,
    lower: f64,
    upper: f64,
}

/// Below this much probability mass inside the bounds, rejection sampling would effectively never terminate.
const MIN_MASS: f64 = 1e-9;

impl TruncatedNormal {
    pub const DEFAULT_LOWER: f64 = -30.0;
    pub const DEFAULT_UPPER: f64 = 30.0;

    /// # Errors
    ///
    /// Returns [`Error::InvalidDistribution`] unless `mu` is finite, `sigma` is finite and strictly positive,
    /// `lower < upper`, and the interval holds a non-negligible share of the untruncated distribution.
    pub fn new(mu: f64, sigma: f64, lower: f64, upper: f64) -> Result<Self> {
        if !mu.is_finite() {
            return Err(Error::InvalidDistribution(format!("truncated normal mu must be finite, got {mu}")));
        }
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(Error::InvalidDistribution(format!(
                "truncated normal sigma must be positive, got {sigma}"
            )));
        }
        if !(lower < upper) {
            return Err(Error::InvalidDistribution(format!(
                "truncation bounds must satisfy lower < upper, got [{lower}, {upper}]"
            )));
        }
        let distribution = Self {
            mu,
            sigma,
            lower,
            upper,
        };
        if distribution.mass() < MIN_MASS {
            return Err(Error::InvalidDistribution(format!(
                "[{lower}, {upper}] holds almost no mass of N({mu}, {sigma})"
            )));
        }
        Ok(distribution)
    }

    /// Truncated to the default bounds of ±30 minutes.
    ///
    /// # Errors
    ///
    /// Same as [`new()`](TruncatedNormal::new).
    pub fn with_default_bounds(mu: f64, sigma: f64) -> Result<Self> {
        Self::new(mu, sigma, Self::DEFAULT_LOWER, Self::DEFAULT_UPPER)
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    fn standardized_bounds(&self) -> (f64, f64) {
        ((self.lower - self.mu) / self.sigma, (self.upper - self.mu) / self.sigma)
    }

    /// Probability that the untruncated normal lands inside the bounds.
    fn mass(&self) -> f64 {
        let (alpha, beta) = self.standardized_bounds();
        0.5 * (erf(beta / SQRT_2) - erf(alpha / SQRT_2))
    }
}

fn standard_pdf(x: f64) -> f64 {
    if x.is_infinite() {
        return 0.0;
    }
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

impl Default for TruncatedNormal {
    fn default() -> Self {
        Self {
            mu: 0.0,
            sigma: 10.0,
            lower: Self::DEFAULT_LOWER,
            upper: Self::DEFAULT_UPPER,
        }
    }
}

impl Sampler for TruncatedNormal {
    fn sample(&self, size: usize, seed: Option<u64>) -> Vec<f64> {
        let mut rng = seeded_rng(seed);
        let mut draws = Vec::with_capacity(size);
        while draws.len() < size {
            let z: f64 = StandardNormal.sample(&mut rng);
            let x = self.mu + self.sigma * z;
            if (self.lower..=self.upper).contains(&x) {
                draws.push(x);
            }
        }
        draws
    }

    fn mean(&self) -> f64 {
        let (alpha, beta) = self.standardized_bounds();
        self.mu + self.sigma * (standard_pdf(alpha) - standard_pdf(beta)) / self.mass()
    }

    fn variance(&self) -> f64 {
        let (alpha, beta) = self.standardized_bounds();
        let z = self.mass();
        let (phi_a, phi_b) = (standard_pdf(alpha), standard_pdf(beta));
        // x * phi(x) vanishes at infinite bounds
        let edge = |x: f64, phi: f64| if x.is_finite() { x * phi } else { 0.0 };
        let tail = edge(alpha, phi_a) - edge(beta, phi_b);
        let shift = (phi_a - phi_b) / z;
        self.sigma * self.sigma * (1.0 + tail / z - shift * shift)
    }
}
