use crate::config::SimulationConfig;
use crate::{Error, Result};

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A tunable input of a [`SimulationConfig`].
///
/// The first three are scalars that can be moved along an integer grid. [`CostWeights`] is only tunable through
/// cost-weight sensitivity, which rescales one weight at a time.
///
/// [`CostWeights`]: Parameter::CostWeights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Parameter {
    ScheduledSpacing,
    MeanServiceTime,
    WorkingHours,
    CostWeights,
}

impl Parameter {
    /// Parameters with a scalar value that a grid sweep can move.
    pub const SCALARS: [Parameter; 3] = [Self::ScheduledSpacing, Self::MeanServiceTime, Self::WorkingHours];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ScheduledSpacing => "scheduled_spacing",
            Self::MeanServiceTime => "mean_service_time",
            Self::WorkingHours => "working_hours",
            Self::CostWeights => "cost_weights",
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::CostWeights)
    }

    /// # Errors
    ///
    /// Returns [`Error::UnsupportedParameter`] for [`Parameter::CostWeights`].
    pub fn value(&self, config: &SimulationConfig) -> Result<f64> {
        match self {
            Self::ScheduledSpacing => Ok(config.scheduled_spacing()),
            Self::MeanServiceTime => Ok(config.mean_service_time()),
            Self::WorkingHours => Ok(config.working_hours()),
            Self::CostWeights => Err(Error::UnsupportedParameter(*self)),
        }
    }

    /// A copy of `config` with this parameter set to `value` and every dependent field re-derived.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedParameter`] for [`Parameter::CostWeights`], and [`Error::InvalidConfig`] if
    /// `value` is out of the parameter's domain.
    pub fn apply(&self, config: &SimulationConfig, value: f64) -> Result<SimulationConfig> {
        match self {
            Self::ScheduledSpacing => config.with_scheduled_spacing(value),
            Self::MeanServiceTime => config.with_mean_service_time(value),
            Self::WorkingHours => config.with_working_hours(value),
            Self::CostWeights => Err(Error::UnsupportedParameter(*self)),
        }
    }

    /// A copy of `config` with `offset` added to this parameter.
    ///
    /// # Errors
    ///
    /// See [`apply()`](Self::apply).
    pub fn offset(&self, config: &SimulationConfig, offset: f64) -> Result<SimulationConfig> {
        self.apply(config, self.value(config)? + offset)
    }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = Error;

    /// Accepts the snake-case names, plus `scheduled_arrival` and `cost_params` as aliases.
    fn from_str(name: &str) -> Result<Self> {
        match name.trim() {
            "scheduled_spacing" | "scheduled_arrival" => Ok(Self::ScheduledSpacing),
            "mean_service_time" => Ok(Self::MeanServiceTime),
            "working_hours" => Ok(Self::WorkingHours),
            "cost_weights" | "cost_params" => Ok(Self::CostWeights),
            other => Err(Error::UnknownParameter(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!(Ok(Parameter::ScheduledSpacing), "scheduled_arrival".parse());
        assert_eq!(Ok(Parameter::ScheduledSpacing), "scheduled_spacing".parse());
        assert_eq!(Ok(Parameter::CostWeights), "cost_params".parse());
        for parameter in Parameter::SCALARS {
            assert_eq!(Ok(parameter), parameter.name().parse());
        }
        assert_eq!(
            Err(Error::UnknownParameter("doctors".to_owned())),
            "doctors".parse::<Parameter>()
        );
    }

    #[test]
    fn offset_moves_one_field() {
        let config = SimulationConfig::builder().build().unwrap();
        let moved = Parameter::MeanServiceTime.offset(&config, -0.5).unwrap();
        assert_eq!(15.0, moved.mean_service_time());
        assert_eq!(32, moved.patients_per_run());
        assert_eq!(config.scheduled_spacing(), moved.scheduled_spacing());
    }

    #[test]
    fn cost_weights_have_no_scalar_value() {
        let config = SimulationConfig::builder().build().unwrap();
        assert_eq!(
            Err(Error::UnsupportedParameter(Parameter::CostWeights)),
            Parameter::CostWeights.value(&config)
        );
        assert!(Parameter::WorkingHours.offset(&config, -8.0).is_err());
    }
}
