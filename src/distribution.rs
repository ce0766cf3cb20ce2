//! Probability distributions that feed a simulation with interarrival deviations and service durations.
//!
//! The simulation only ever needs three things from a distribution: a reproducible batch of draws, its mean, and
//! its variance. The [`Sampler`] trait captures exactly that capability, and [`Distribution`] is the closed set of
//! families a [`SimulationConfig`] can carry.
//!
//! [`SimulationConfig`]: crate::SimulationConfig

mod degenerate;
mod exponential;
mod lognormal;
mod triangular;
mod truncated_normal;

pub use degenerate::Degenerate;
pub use exponential::Exponential;
pub use lognormal::Lognormal;
pub use triangular::Triangular;
pub use truncated_normal::TruncatedNormal;

use rand::SeedableRng;
use rand_pcg::Pcg64;

/// The capability a simulation consumes from a probability distribution.
///
/// Implementations must be reproducible: two calls to [`sample()`] with the same `size` and `Some(seed)` return the
/// same values, and distinct seeds produce statistically independent batches. Passing `None` for the seed draws a
/// fresh seed, so the batch is not reproducible.
///
/// [`sample()`]: Sampler::sample
pub trait Sampler {
    /// Draw `size` independent variates, seeding the generator with `seed` when one is given.
    fn sample(&self, size: usize, seed: Option<u64>) -> Vec<f64>;

    /// The theoretical mean of the distribution.
    fn mean(&self) -> f64;

    /// The theoretical variance of the distribution.
    fn variance(&self) -> f64;
}

/// Build the generator every family samples from.
pub(crate) fn seeded_rng(seed: Option<u64>) -> Pcg64 {
    Pcg64::seed_from_u64(seed.unwrap_or_else(rand::random))
}

/// One of the distribution families a simulation can be configured with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    Degenerate(Degenerate),
    Exponential(Exponential),
    Lognormal(Lognormal),
    Triangular(Triangular),
    TruncatedNormal(TruncatedNormal),
}

impl Distribution {
    /// A tag plus the defining parameters of the distribution, used to build value-based memo keys.
    pub(crate) fn parameters(&self) -> (u8, Vec<f64>) {
        match self {
            Self::Degenerate(d) => (0, vec![d.value()]),
            Self::Exponential(d) => (1, vec![d.rate()]),
            Self::Lognormal(d) => (2, vec![d.mu(), d.sigma()]),
            Self::Triangular(d) => (3, vec![d.lower(), d.mode(), d.upper()]),
            Self::TruncatedNormal(d) => (4, vec![d.mu(), d.sigma(), d.lower(), d.upper()]),
        }
    }
}

impl Default for Distribution {
    /// Patient unpunctuality of N(0, 10) minutes truncated to [-30, 30].
    fn default() -> Self {
        Self::TruncatedNormal(TruncatedNormal::default())
    }
}

impl Sampler for Distribution {
    fn sample(&self, size: usize, seed: Option<u64>) -> Vec<f64> {
        match self {
            Self::Degenerate(d) => d.sample(size, seed),
            Self::Exponential(d) => d.sample(size, seed),
            Self::Lognormal(d) => d.sample(size, seed),
            Self::Triangular(d) => d.sample(size, seed),
            Self::TruncatedNormal(d) => d.sample(size, seed),
        }
    }

    fn mean(&self) -> f64 {
        match self {
            Self::Degenerate(d) => d.mean(),
            Self::Exponential(d) => d.mean(),
            Self::Lognormal(d) => d.mean(),
            Self::Triangular(d) => d.mean(),
            Self::TruncatedNormal(d) => d.mean(),
        }
    }

    fn variance(&self) -> f64 {
        match self {
            Self::Degenerate(d) => d.variance(),
            Self::Exponential(d) => d.variance(),
            Self::Lognormal(d) => d.variance(),
            Self::Triangular(d) => d.variance(),
            Self::TruncatedNormal(d) => d.variance(),
        }
    }
}

macro_rules! impl_from_family {
    ($($family:ident),*) => {
        $(
            impl From<$family> for Distribution {
                fn from(family: $family) -> Self {
                    Self::$family(family)
                }
            }
        )*
    };
}

impl_from_family!(Degenerate, Exponential, Lognormal, Triangular, TruncatedNormal);
