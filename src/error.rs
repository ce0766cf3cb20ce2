use crate::optimizer::Parameter;

use serde::Serialize;

/// Errors that may be encountered while configuring, running, or summarizing a simulation.
///
/// The variants fall into two groups. Configuration errors ([`InvalidConfig`], [`InvalidDistribution`],
/// [`UnknownParameter`], [`UnsupportedParameter`], [`SameParameter`], [`InvalidRange`], [`LengthMismatch`]) are
/// raised at construction or call time and are never silently clamped. Degenerate-data errors ([`NoRealizations`],
/// [`NoAdmittedPatients`], [`EmptySample`], [`NotEnoughRuns`], [`NoFeasiblePoint`]) mean that a statistic was asked
/// for before there was anything to compute it from; the caller should run at least one replication first.
///
/// An arrival dropped because the system is full is not an error. It is recorded on the [`Schedule`] instead.
///
/// Every variant is [`Clone`] and [`Serialize`] so that a failed grid point can be stored, and reported, next to the
/// successful ones in a sweep.
///
/// [`InvalidConfig`]: Error::InvalidConfig
/// [`InvalidDistribution`]: Error::InvalidDistribution
/// [`UnknownParameter`]: Error::UnknownParameter
/// [`UnsupportedParameter`]: Error::UnsupportedParameter
/// [`SameParameter`]: Error::SameParameter
/// [`InvalidRange`]: Error::InvalidRange
/// [`LengthMismatch`]: Error::LengthMismatch
/// [`NoRealizations`]: Error::NoRealizations
/// [`NoAdmittedPatients`]: Error::NoAdmittedPatients
/// [`EmptySample`]: Error::EmptySample
/// [`NotEnoughRuns`]: Error::NotEnoughRuns
/// [`NoFeasiblePoint`]: Error::NoFeasiblePoint
/// [`Schedule`]: crate::Schedule
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
pub enum Error {
    /// A configuration field is out of its valid domain.
    #[error("invalid {parameter}: {reason}")]
    InvalidConfig { parameter: &'static str, reason: String },

    /// A distribution was constructed with parameters it cannot be sampled with.
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),

    /// A parameter name did not match any tunable parameter.
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    /// The parameter exists but the requested operation does not apply to it, e.g. sweeping the cost weights over
    /// an integer grid.
    #[error("{0} cannot be used for this operation")]
    UnsupportedParameter(Parameter),

    /// A two-way sweep was asked to fix and optimize the same parameter.
    #[error("the fixed and optimized parameters must differ, both were {0}")]
    SameParameter(Parameter),

    /// An offset range whose lower end lies above its upper end.
    #[error("invalid offset range [{lo}, {hi}]")]
    InvalidRange { lo: i64, hi: i64 },

    /// Fewer service durations than requested arrivals were handed to the simulator.
    #[error("{services} service durations provided for {arrivals} arrivals")]
    LengthMismatch { arrivals: usize, services: usize },

    /// Summary statistics were requested before any realization completed.
    #[error("no realizations to summarize, run at least one replication first")]
    NoRealizations,

    /// Every realization dropped or never requested all of its patients, so waiting-time statistics are undefined.
    #[error("no admitted patients across {realizations} realizations")]
    NoAdmittedPatients { realizations: usize },

    /// A percentile or moment of an empty sample.
    #[error("cannot compute a statistic of an empty sample")]
    EmptySample,

    /// A cross-run variance needs at least two runs.
    #[error("at least {required} runs are needed, got {actual}")]
    NotEnoughRuns { required: usize, actual: usize },

    /// Every grid point of a sweep failed.
    #[error("no grid point of the sweep produced a summary")]
    NoFeasiblePoint,
}

/// [`std::result::Result`]`<T, `[`clinicsim::Error`]`>`, defaulting to `T = ()`.
///
/// A type alias that simplifies the signatures of fallible functions across the crate.
///
/// [`clinicsim::Error`]: Error
pub type Result<T = (), E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn config(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            parameter,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_parameter() {
        let error = Error::config("servers", "must be at least 1");
        assert_eq!("invalid servers: must be at least 1", error.to_string());
    }

    #[test]
    fn errors_compare_by_value() {
        assert_eq!(Error::NoRealizations, Error::NoRealizations.clone());
        assert_ne!(
            Error::NotEnoughRuns { required: 2, actual: 1 },
            Error::NotEnoughRuns { required: 2, actual: 0 },
        );
    }
}
