//! Grid search over one scheduling parameter, and the sensitivity analysis around the optimum it finds.
//!
//! An [`Optimizer`] owns a base [`SimulationConfig`] and an inclusive range of integer offsets. A [`sweep()`] adds
//! every offset in turn to one [`Parameter`] of the base, simulates each resulting configuration, and collects the
//! outcomes into a [`Sweep`]. Grid points are independent and run in parallel. A point that fails, for instance
//! because the offset pushes the parameter out of its domain, records its error and does not stop the others.
//!
//! Every evaluated configuration is memoized by its value-based [`ConfigKey`], so a sensitivity perturbation or a
//! two-way sweep that lands on an already simulated configuration reuses its result.
//!
//! [`sweep()`]: Optimizer::sweep

mod parameter;
mod sensitivity;

pub use parameter::Parameter;
pub use sensitivity::{
    MetricDelta, Perturbation, SensitivityRow, SensitivityTable, SkippedPerturbation, DEFAULT_MULTIPLIERS,
    DEFAULT_OFFSETS,
};

use crate::config::{ConfigKey, SimulationConfig};
use crate::replication::{Realization, Simulation};
use crate::summary::Summary;
use crate::{Error, Result};

use bon::bon;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// A simulated configuration: its summary and the realizations behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    config: SimulationConfig,
    summary: Summary,
    realizations: Vec<Realization>,
}

impl Evaluation {
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn realizations(&self) -> &[Realization] {
        &self.realizations
    }

    pub fn total_cost(&self) -> f64 {
        self.summary.total_cost()
    }
}

/// One offset of a sweep and what came of it.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPoint {
    pub offset: i64,
    /// The parameter's value at this point.
    pub value: f64,
    pub outcome: Result<Arc<Evaluation>>,
}

/// Row of a sweep's output table, for successful grid points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    pub offset: i64,
    pub value: f64,
    pub total_cost: f64,
    pub summary: Summary,
}

/// The outcome of every grid point of a one-parameter sweep, in offset order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    parameter: Parameter,
    points: Vec<GridPoint>,
}

impl Sweep {
    pub fn parameter(&self) -> Parameter {
        self.parameter
    }

    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    /// The grid point with the lowest total cost. Ties go to the smallest offset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFeasiblePoint`] if every grid point failed.
    pub fn optimal(&self) -> Result<Optimum> {
        let mut best: Option<(&GridPoint, &Arc<Evaluation>)> = None;
        for point in &self.points {
            if let Ok(evaluation) = &point.outcome {
                if best.map_or(true, |(_, b)| evaluation.total_cost() < b.total_cost()) {
                    best = Some((point, evaluation));
                }
            }
        }

        let (point, evaluation) = best.ok_or(Error::NoFeasiblePoint)?;
        Ok(Optimum {
            parameter: self.parameter,
            offset: point.offset,
            value: point.value,
            evaluation: Arc::clone(evaluation),
        })
    }

    /// The successful grid points as `(offset, value, cost, summary)` rows.
    pub fn rows(&self) -> Vec<SweepRow> {
        self.points
            .iter()
            .filter_map(|point| {
                let evaluation = point.outcome.as_ref().ok()?;
                Some(SweepRow {
                    offset: point.offset,
                    value: point.value,
                    total_cost: evaluation.total_cost(),
                    summary: evaluation.summary().clone(),
                })
            })
            .collect()
    }
}

/// The cheapest grid point of a [`Sweep`].
#[derive(Debug, Clone, PartialEq)]
pub struct Optimum {
    pub parameter: Parameter,
    pub offset: i64,
    pub value: f64,
    pub evaluation: Arc<Evaluation>,
}

impl Optimum {
    pub fn config(&self) -> &SimulationConfig {
        self.evaluation.config()
    }

    pub fn summary(&self) -> &Summary {
        self.evaluation.summary()
    }

    pub fn total_cost(&self) -> f64 {
        self.evaluation.total_cost()
    }
}

/// For one value of the fixed parameter, the best value of the optimized one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TwoWayPoint {
    pub fixed_value: f64,
    pub optimal_value: f64,
    pub optimal_cost: f64,
}

/// Result of [`Optimizer::sweep_2d()`].
#[derive(Debug, Clone, PartialEq)]
pub struct TwoWaySweep {
    pub fixed: Parameter,
    pub target: Parameter,
    /// One entry per fixed value whose inner sweep found an optimum, in offset order.
    pub points: Vec<TwoWayPoint>,
    /// Every inner sweep, including those without a feasible point, paired with its fixed value.
    pub sweeps: Vec<(f64, Sweep)>,
}

/// Searches an integer grid of offsets around a base configuration for the lowest total cost.
///
/// ```no_run
/// use clinicsim::{Optimizer, Parameter, SimulationConfig};
///
/// let base = SimulationConfig::builder().seed(1).build()?;
/// let optimizer = Optimizer::builder().base(base).lo(-5).hi(5).replications(200).build()?;
/// let sweep = optimizer.sweep(Parameter::ScheduledSpacing)?;
/// let optimum = sweep.optimal()?;
/// let table = optimizer.sensitivity(&optimum, Parameter::ScheduledSpacing)?;
/// println!("{} perturbations, {} skipped", table.rows.len(), table.skipped.len());
/// # Ok::<(), clinicsim::Error>(())
/// ```
#[derive(Debug)]
pub struct Optimizer {
    base: SimulationConfig,
    offsets: RangeInclusive<i64>,
    replications: usize,
    memo: Mutex<HashMap<ConfigKey, Arc<Evaluation>>>,
}

#[bon]
impl Optimizer {
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] if `lo > hi`, and [`Error::InvalidConfig`] if `replications` is zero.
    #[builder]
    pub fn new(
        base: SimulationConfig,
        #[builder(default = -3)] lo: i64,
        #[builder(default = 3)] hi: i64,
        #[builder(default = 100)] replications: usize,
    ) -> Result<Self> {
        if lo > hi {
            return Err(Error::InvalidRange { lo, hi });
        }
        if replications == 0 {
            return Err(Error::config("replications", "must be at least 1"));
        }
        Ok(Self {
            base,
            offsets: lo..=hi,
            replications,
            memo: Mutex::new(HashMap::new()),
        })
    }
}

impl Optimizer {
    pub fn base(&self) -> &SimulationConfig {
        &self.base
    }

    pub fn offsets(&self) -> RangeInclusive<i64> {
        self.offsets.clone()
    }

    pub fn replications(&self) -> usize {
        self.replications
    }

    /// Number of distinct configurations simulated so far.
    ///
    /// # Panics
    ///
    /// This function will panic if the memo table's mutex has been poisoned.
    pub fn evaluated(&self) -> usize {
        self.memo().len()
    }

    /// Simulate `config` with the optimizer's replication count, or return the memoized result for an equal
    /// configuration.
    ///
    /// Two threads racing on the same new configuration may both simulate it; the first to finish is kept.
    ///
    /// # Errors
    ///
    /// Propagates errors from running and summarizing the [`Simulation`].
    ///
    /// # Panics
    ///
    /// This function will panic if the memo table's mutex has been poisoned.
    pub fn evaluate(&self, config: &SimulationConfig) -> Result<Arc<Evaluation>> {
        let key = config.key();
        if let Some(hit) = self.memo().get(&key) {
            debug!(config = %config, "memo hit");
            return Ok(Arc::clone(hit));
        }

        let mut simulation = Simulation::new(config.clone());
        simulation.run(self.replications, None)?;
        let summary = simulation.summarize()?.clone();
        let evaluation = Arc::new(Evaluation {
            config: config.clone(),
            summary,
            realizations: simulation.realizations().to_vec(),
        });

        Ok(Arc::clone(self.memo().entry(key).or_insert(evaluation)))
    }

    /// Sweep `parameter` over the optimizer's offsets around the base configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedParameter`] for [`Parameter::CostWeights`]. Failures of individual grid points
    /// are recorded in the returned [`Sweep`] instead.
    ///
    /// # Panics
    ///
    /// This function will panic if the memo table's mutex has been poisoned.
    pub fn sweep(&self, parameter: Parameter) -> Result<Sweep> {
        self.sweep_around(&self.base, parameter)
    }

    /// For every offset of `fixed` in `fixed_offsets`, sweep `target` over the optimizer's offsets and record where
    /// its cost is lowest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SameParameter`] if both parameters are equal, [`Error::UnsupportedParameter`] if either is
    /// [`Parameter::CostWeights`], [`Error::InvalidRange`] for an empty offset range, and [`Error::NoFeasiblePoint`]
    /// if no inner sweep found an optimum.
    ///
    /// # Panics
    ///
    /// This function will panic if the memo table's mutex has been poisoned.
    pub fn sweep_2d(
        &self,
        fixed: Parameter,
        target: Parameter,
        fixed_offsets: RangeInclusive<i64>,
    ) -> Result<TwoWaySweep> {
        if fixed == target {
            return Err(Error::SameParameter(fixed));
        }
        for parameter in [fixed, target] {
            if !parameter.is_scalar() {
                return Err(Error::UnsupportedParameter(parameter));
            }
        }
        if fixed_offsets.is_empty() {
            return Err(Error::InvalidRange {
                lo: *fixed_offsets.start(),
                hi: *fixed_offsets.end(),
            });
        }

        let base_value = fixed.value(&self.base)?;
        let mut points = Vec::new();
        let mut sweeps = Vec::new();
        for offset in fixed_offsets {
            let fixed_value = base_value + offset as f64;
            let base = match fixed.apply(&self.base, fixed_value) {
                Ok(base) => base,
                Err(error) => {
                    warn!(%fixed, fixed_value, %error, "fixed value skipped");
                    continue;
                }
            };

            let sweep = self.sweep_around(&base, target)?;
            match sweep.optimal() {
                Ok(optimum) => {
                    info!(%fixed, fixed_value, %target, optimal_value = optimum.value, "two-way row finished");
                    points.push(TwoWayPoint {
                        fixed_value,
                        optimal_value: optimum.value,
                        optimal_cost: optimum.total_cost(),
                    });
                }
                Err(error) => warn!(%fixed, fixed_value, %error, "no feasible point"),
            }
            sweeps.push((fixed_value, sweep));
        }

        if points.is_empty() {
            return Err(Error::NoFeasiblePoint);
        }
        Ok(TwoWaySweep {
            fixed,
            target,
            points,
            sweeps,
        })
    }

    fn sweep_around(&self, base: &SimulationConfig, parameter: Parameter) -> Result<Sweep> {
        let base_value = parameter.value(base)?;
        let offsets: Vec<i64> = self.offsets().collect();

        let points = offsets
            .par_iter()
            .map(|&offset| {
                let value = base_value + offset as f64;
                let outcome = parameter.apply(base, value).and_then(|config| self.evaluate(&config));
                match &outcome {
                    Ok(evaluation) => info!(%parameter, value, cost = evaluation.total_cost(), "grid point finished"),
                    Err(error) => warn!(%parameter, value, %error, "grid point failed"),
                }
                GridPoint { offset, value, outcome }
            })
            .collect();

        Ok(Sweep { parameter, points })
    }

    fn memo(&self) -> MutexGuard<'_, HashMap<ConfigKey, Arc<Evaluation>>> {
        self.memo.lock().expect("memo mutex should not have been poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceModel;
    use crate::distribution::Degenerate;

    /// Deterministic single-server day: punctual patients, fixed 20 minute services.
    fn base() -> SimulationConfig {
        SimulationConfig::builder()
            .working_hours(2.0)
            .scheduled_spacing(15.0)
            .mean_service_time(20.0)
            .arrival_deviation(Degenerate::new(0.0).unwrap().into())
            .service_model(ServiceModel::Degenerate)
            .patients(6)
            .seed(0)
            .build()
            .unwrap()
    }

    fn optimizer(lo: i64, hi: i64) -> Optimizer {
        Optimizer::builder().base(base()).lo(lo).hi(hi).replications(2).build().unwrap()
    }

    #[test]
    fn rejects_bad_construction() {
        assert_eq!(
            Err(Error::InvalidRange { lo: 2, hi: 1 }),
            Optimizer::builder().base(base()).lo(2).hi(1).build().map(|_| ())
        );
        assert!(Optimizer::builder().base(base()).replications(0).build().is_err());
    }

    #[test]
    fn sweep_records_every_offset() {
        let sweep = optimizer(-2, 2).sweep(Parameter::ScheduledSpacing).unwrap();
        let values: Vec<f64> = sweep.points().iter().map(|p| p.value).collect();
        assert_eq!(vec![13.0, 14.0, 15.0, 16.0, 17.0], values);
        assert_eq!(5, sweep.rows().len());
    }

    #[test]
    fn optimum_is_cheapest_point() {
        let sweep = optimizer(-3, 3).sweep(Parameter::ScheduledSpacing).unwrap();
        let optimum = sweep.optimal().unwrap();
        for row in sweep.rows() {
            assert!(optimum.total_cost() <= row.total_cost);
        }
    }

    #[test]
    fn failed_points_do_not_stop_sweep() {
        // spacing 15 - 16 is negative
        let sweep = optimizer(-16, -14).sweep(Parameter::ScheduledSpacing).unwrap();
        assert!(sweep.points()[0].outcome.is_err());
        assert!(sweep.points()[1].outcome.is_ok());
        let offset = sweep.optimal().unwrap().offset;
        assert!(offset == -15 || offset == -14);
    }

    #[test]
    fn all_failed_is_no_feasible_point() {
        let sweep = optimizer(-10, -8).sweep(Parameter::WorkingHours).unwrap();
        assert_eq!(Err(Error::NoFeasiblePoint), sweep.optimal().map(|o| o.offset));
    }

    #[test]
    fn ties_go_to_smallest_offset() {
        // nothing is charged, so every point costs zero
        let weights = crate::CostWeights::new(0.0, 0.0, 0.0, 0.0).unwrap();
        let optimizer = Optimizer::builder()
            .base(base().with_cost_weights(weights).unwrap())
            .lo(0)
            .hi(2)
            .replications(1)
            .build()
            .unwrap();
        let optimum = optimizer.sweep(Parameter::WorkingHours).unwrap().optimal().unwrap();
        assert_eq!(0, optimum.offset);
    }

    #[test]
    fn repeated_configs_hit_memo() {
        let optimizer = optimizer(-1, 1);
        optimizer.sweep(Parameter::ScheduledSpacing).unwrap();
        assert_eq!(3, optimizer.evaluated());
        // the centre point of this sweep is the base config again
        optimizer.sweep(Parameter::MeanServiceTime).unwrap();
        assert_eq!(5, optimizer.evaluated());
    }

    #[test]
    fn cost_weights_cannot_be_swept() {
        assert_eq!(
            Err(Error::UnsupportedParameter(Parameter::CostWeights)),
            optimizer(-1, 1).sweep(Parameter::CostWeights).map(|_| ())
        );
    }

    #[test]
    fn two_way_sweep() {
        let optimizer = optimizer(-1, 1);
        assert_eq!(
            Err(Error::SameParameter(Parameter::WorkingHours)),
            optimizer.sweep_2d(Parameter::WorkingHours, Parameter::WorkingHours, 0..=1).map(|_| ())
        );

        let result = optimizer
            .sweep_2d(Parameter::MeanServiceTime, Parameter::ScheduledSpacing, -1..=1)
            .unwrap();
        let fixed: Vec<f64> = result.points.iter().map(|p| p.fixed_value).collect();
        assert_eq!(vec![19.0, 20.0, 21.0], fixed);
        for (point, (_, sweep)) in result.points.iter().zip(&result.sweeps) {
            assert_eq!(point.optimal_cost, sweep.optimal().unwrap().total_cost());
        }
    }
}
