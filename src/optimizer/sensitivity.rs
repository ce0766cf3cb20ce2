use super::{Optimizer, Optimum, Parameter};
use crate::cost::CostWeight;
use crate::summary::{Metric, Summary};
use crate::{Error, Result};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

/// Offsets applied to a scalar parameter around the optimum unless others are given.
pub const DEFAULT_OFFSETS: [f64; 6] = [-3.0, -2.0, -1.0, 1.0, 2.0, 3.0];

/// Factors each cost weight is scaled by unless others are given.
pub const DEFAULT_MULTIPLIERS: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// How the optimum was moved for one row of a [`SensitivityTable`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Perturbation {
    /// A scalar parameter moved by this many units.
    Offset(f64),
    /// One cost weight scaled by `multiplier`.
    Weight { weight: CostWeight, multiplier: f64 },
}

/// A metric at the optimum and at a perturbed configuration. `delta` is perturbed minus optimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricDelta {
    pub metric: Metric,
    pub optimum: f64,
    pub perturbed: f64,
    pub delta: f64,
}

impl MetricDelta {
    fn between(metric: Metric, optimum: &Summary, perturbed: &Summary) -> Self {
        let (at_optimum, at_perturbed) = (optimum.metric(metric), perturbed.metric(metric));
        Self {
            metric,
            optimum: at_optimum,
            perturbed: at_perturbed,
            delta: at_perturbed - at_optimum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityRow {
    pub perturbation: Perturbation,
    /// The perturbed parameter's value, or the scaled weight's value.
    pub value: f64,
    pub deltas: Vec<MetricDelta>,
}

impl SensitivityRow {
    pub fn delta(&self, metric: Metric) -> Option<&MetricDelta> {
        self.deltas.iter().find(|d| d.metric == metric)
    }
}

/// A perturbation that could not be evaluated, for instance because it left the parameter's domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedPerturbation {
    pub perturbation: Perturbation,
    pub error: Error,
}

/// One-at-a-time sensitivity of the summary metrics around an optimum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityTable {
    pub parameter: Parameter,
    /// The parameter's value at the optimum, absent for cost weights.
    pub optimum_value: Option<f64>,
    pub rows: Vec<SensitivityRow>,
    pub skipped: Vec<SkippedPerturbation>,
}

impl Optimizer {
    /// Perturb `optimum` along `parameter` with the default offsets, or, for [`Parameter::CostWeights`], rescale
    /// each weight by the default multipliers.
    ///
    /// # Errors
    ///
    /// See [`sensitivity_with_offsets()`](Self::sensitivity_with_offsets).
    ///
    /// # Panics
    ///
    /// This function will panic if the memo table's mutex has been poisoned.
    pub fn sensitivity(&self, optimum: &Optimum, parameter: Parameter) -> Result<SensitivityTable> {
        if parameter.is_scalar() {
            self.sensitivity_with_offsets(optimum, parameter, &DEFAULT_OFFSETS)
        } else {
            Ok(self.cost_sensitivity(optimum, &DEFAULT_MULTIPLIERS))
        }
    }

    /// Simulate the optimum's configuration with `parameter` moved by each offset and tabulate how every summary
    /// metric changes. Configurations already simulated, including the sweep's own grid points, are reused.
    ///
    /// Perturbations that fail are listed under [`SensitivityTable::skipped`] rather than failing the table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedParameter`] for [`Parameter::CostWeights`].
    ///
    /// # Panics
    ///
    /// This function will panic if the memo table's mutex has been poisoned.
    pub fn sensitivity_with_offsets(
        &self,
        optimum: &Optimum,
        parameter: Parameter,
        offsets: &[f64],
    ) -> Result<SensitivityTable> {
        let optimum_value = parameter.value(optimum.config())?;

        let outcomes: Vec<_> = offsets
            .par_iter()
            .map(|&offset| {
                let value = optimum_value + offset;
                let outcome = parameter
                    .apply(optimum.config(), value)
                    .and_then(|config| self.evaluate(&config));
                (offset, value, outcome)
            })
            .collect();

        let mut rows = Vec::new();
        let mut skipped = Vec::new();
        for (offset, value, outcome) in outcomes {
            let perturbation = Perturbation::Offset(offset);
            match outcome {
                Ok(evaluation) => {
                    let deltas = Metric::ALL
                        .iter()
                        .map(|&metric| MetricDelta::between(metric, optimum.summary(), evaluation.summary()))
                        .collect();
                    info!(%parameter, value, cost = evaluation.total_cost(), "perturbation finished");
                    rows.push(SensitivityRow {
                        perturbation,
                        value,
                        deltas,
                    });
                }
                Err(error) => {
                    warn!(%parameter, value, %error, "perturbation skipped");
                    skipped.push(SkippedPerturbation { perturbation, error });
                }
            }
        }

        Ok(SensitivityTable {
            parameter,
            optimum_value: Some(optimum_value),
            rows,
            skipped,
        })
    }

    /// Rescale each cost weight of the optimum's configuration by each multiplier, one weight at a time, and
    /// tabulate the change in total cost.
    ///
    /// Only the weights change, so cost is recomputed from the optimum's averages without simulating anything.
    /// Multipliers that would make a weight invalid are listed under [`SensitivityTable::skipped`].
    pub fn cost_sensitivity(&self, optimum: &Optimum, multipliers: &[f64]) -> SensitivityTable {
        let weights = optimum.config().cost_weights();
        let mut rows = Vec::new();
        let mut skipped = Vec::new();

        for weight in CostWeight::ALL {
            for &multiplier in multipliers {
                let perturbation = Perturbation::Weight { weight, multiplier };
                match weights.scaled(weight, multiplier) {
                    Ok(scaled) => {
                        let priced = optimum.summary().with_cost(&scaled);
                        rows.push(SensitivityRow {
                            perturbation,
                            value: scaled.weight(weight),
                            deltas: vec![MetricDelta::between(Metric::TotalCost, optimum.summary(), &priced)],
                        });
                    }
                    Err(error) => {
                        warn!(%weight, multiplier, %error, "perturbation skipped");
                        skipped.push(SkippedPerturbation { perturbation, error });
                    }
                }
            }
        }

        SensitivityTable {
            parameter: Parameter::CostWeights,
            optimum_value: None,
            rows,
            skipped,
        }
    }
}
