use super::{seeded_rng, Sampler};
use crate::{Error, Result};

use rand_distr::{Distribution as _, Triangular as TriangularDistr};

/// Triangular distribution on `[lower, upper]` peaking at `mode`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangular {
    lower: f64,
    mode: f64,
    upper: f64,
    inner: TriangularDistr<f64>,
}

impl Triangular {
    /// # Errors
    ///
    /// Returns [`Error::InvalidDistribution`] unless all bounds are finite, `lower <= mode <= upper`, and
    /// `lower < upper`.
    pub fn new(lower: f64, mode: f64, upper: f64) -> Result<Self> {
        if !(lower.is_finite() && mode.is_finite() && upper.is_finite()) {
            return Err(Error::InvalidDistribution("triangular bounds must be finite".into()));
        }
        if !(lower <= mode && mode <= upper && lower < upper) {
            return Err(Error::InvalidDistribution(format!(
                "triangular bounds must satisfy lower <= mode <= upper with lower < upper, got \
                 ({lower}, {mode}, {upper})"
            )));
        }
        let inner = TriangularDistr::new(lower, upper, mode).map_err(|e| Error::InvalidDistribution(e.to_string()))?;
        Ok(Self {
            lower,
            mode,
            upper,
            inner,
        })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn mode(&self) -> f64 {
        self.mode
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }
}

impl Sampler for Triangular {
    fn sample(&self, size: usize, seed: Option<u64>) -> Vec<f64> {
        let mut rng = seeded_rng(seed);
        (0..size).map(|_| self.inner.sample(&mut rng)).collect()
    }

    fn mean(&self) -> f64 {
        (self.lower + self.mode + self.upper) / 3.0
    }

    fn variance(&self) -> f64 {
        let (a, c, b) = (self.lower, self.mode, self.upper);
        (a * a + b * b + c * c - a * b - a * c - b * c) / 18.0
    }
}
