use super::Sampler;
use crate::{Error, Result};

/// A distribution that always returns the same value.
///
/// Useful for deterministic what-if runs: a degenerate service time of 15 minutes turns the simulation into a
/// fixed-duration queue, and a degenerate deviation of zero makes every patient perfectly punctual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Degenerate {
    value: f64,
}

impl Degenerate {
    /// # Errors
    ///
    /// Returns [`Error::InvalidDistribution`] if `value` is not finite.
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::InvalidDistribution(format!("degenerate value must be finite, got {value}")));
        }
        Ok(Self { value })
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Sampler for Degenerate {
    fn sample(&self, size: usize, _seed: Option<u64>) -> Vec<f64> {
        vec![self.value; size]
    }

    fn mean(&self) -> f64 {
        self.value
    }

    fn variance(&self) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_its_value_regardless_of_seed() {
        let d = Degenerate::new(15.0).unwrap();
        assert_eq!(vec![15.0; 3], d.sample(3, None));
        assert_eq!(vec![15.0; 3], d.sample(3, Some(1)));
        assert_eq!(0.0, d.variance());
    }

    #[test]
    fn rejects_nan() {
        assert!(matches!(Degenerate::new(f64::NAN), Err(Error::InvalidDistribution(_))));
    }
}
