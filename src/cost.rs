use crate::{Error, Result};

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Per-minute weights of the four cost components a clinic day is charged for.
///
/// All weights are finite and non-negative. The total cost of a configuration is
///
/// ```text
/// idle * mean idle time per run
///     + waiting * mean patient waiting time * patients per run
///     + overtime * mean overtime per run
///     + labor * servers * working minutes
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostWeights {
    idle: f64,
    waiting: f64,
    overtime: f64,
    labor: f64,
}

/// Names one of the four weights in [`CostWeights`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CostWeight {
    Idle,
    Waiting,
    Overtime,
    Labor,
}

impl CostWeight {
    pub const ALL: [CostWeight; 4] = [Self::Idle, Self::Waiting, Self::Overtime, Self::Labor];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Waiting => "waiting",
            Self::Overtime => "overtime",
            Self::Labor => "labor",
        }
    }
}

impl Display for CostWeight {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The per-run averages the cost function is evaluated on.
///
/// Kept on every [`Summary`] so that changing only the weights never needs a new simulation.
///
/// [`Summary`]: crate::Summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBasis {
    pub mean_idle_time: f64,
    pub mean_waiting_time: f64,
    pub mean_overtime: f64,
    pub patients_per_run: usize,
    pub servers: usize,
    pub working_minutes: f64,
}

impl CostWeights {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any weight is negative or not finite.
    pub fn new(idle: f64, waiting: f64, overtime: f64, labor: f64) -> Result<Self> {
        for (weight, value) in CostWeight::ALL.into_iter().zip([idle, waiting, overtime, labor]) {
            check_weight(weight, value)?;
        }
        Ok(Self {
            idle,
            waiting,
            overtime,
            labor,
        })
    }

    pub fn weight(&self, weight: CostWeight) -> f64 {
        match weight {
            CostWeight::Idle => self.idle,
            CostWeight::Waiting => self.waiting,
            CostWeight::Overtime => self.overtime,
            CostWeight::Labor => self.labor,
        }
    }

    /// A copy of these weights with one of them multiplied by `factor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the scaled weight is negative or not finite.
    pub fn scaled(&self, weight: CostWeight, factor: f64) -> Result<Self> {
        let value = self.weight(weight) * factor;
        check_weight(weight, value)?;
        let mut scaled = *self;
        match weight {
            CostWeight::Idle => scaled.idle = value,
            CostWeight::Waiting => scaled.waiting = value,
            CostWeight::Overtime => scaled.overtime = value,
            CostWeight::Labor => scaled.labor = value,
        }
        Ok(scaled)
    }

    pub fn total_cost(&self, basis: &CostBasis) -> f64 {
        self.idle * basis.mean_idle_time
            + self.waiting * basis.mean_waiting_time * basis.patients_per_run as f64
            + self.overtime * basis.mean_overtime
            + self.labor * basis.servers as f64 * basis.working_minutes
    }

    pub(crate) fn as_array(&self) -> [f64; 4] {
        [self.idle, self.waiting, self.overtime, self.labor]
    }
}

fn check_weight(weight: CostWeight, value: f64) -> Result {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::config(
            "cost weight",
            format!("{weight} weight must be finite and non-negative, got {value}"),
        ))
    }
}

impl Default for CostWeights {
    /// Idle 1.0, waiting 0.2, overtime 1.5, and no labor cost.
    fn default() -> Self {
        Self {
            idle: 1.0,
            waiting: 0.2,
            overtime: 1.5,
            labor: 0.0,
        }
    }
}
