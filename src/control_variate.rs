//! Control-variate variance reduction for the mean waiting time.
//!
//! The mean of the service time `S` is known exactly from the configured service distribution, and long services
//! delay the patients behind them, so a run's mean waiting time `W` moves with its mean service time. Within every
//! run the estimator fits the coefficient
//!
//! ```text
//! c* = -Cov(W, S) / Var(S)
//! ```
//!
//! from that run's own patients and corrects the run's mean waiting time to `W - c* (S - E[S])`.
//!
//! Within a run, waiting and service times are usually weakly negatively correlated, so `c*` is usually positive,
//! and the correction removes part of the run-to-run movement of `W` that follows `S`. What is compared is the
//! variance of the corrected run means across runs. The spread of the corrected values inside one run may widen.
//!
//! [`VarianceReductionEstimator::compare()`] runs the plain and the corrected estimator on the same seeds, so the
//! difference between their cross-run variances is due to the correction alone.

use crate::config::SimulationConfig;
use crate::distribution::Sampler;
use crate::replication::Simulation;
use crate::statistics;
use crate::{Error, Result};

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

/// Base seed when neither the caller nor the configuration provides one.
pub const DEFAULT_BASE_SEED: u64 = 42;

/// Service-time variances at or below this are treated as zero, and the run is left uncorrected.
const MIN_CONTROL_VARIANCE: f64 = 1e-12;

/// Outcome of one run of the corrected estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunEstimate {
    pub seed: u64,
    /// Mean of the raw waiting times.
    pub standard_mean: f64,
    /// Mean of the corrected waiting times.
    pub controlled_mean: f64,
    pub coefficient: f64,
    /// Correlation of waiting and service times, `None` when either has no spread.
    pub correlation: Option<f64>,
    /// Percentage by which the correction shrank the variance of this run's waiting times. Negative when it widened
    /// them.
    pub within_run_reduction: f64,
}

/// Cross-run statistics of the per-run means of one estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EstimatorStatistics {
    pub mean: f64,
    /// Unbiased variance of the run means.
    pub variance: f64,
    pub std_error: f64,
}

impl EstimatorStatistics {
    /// # Errors
    ///
    /// Returns [`Error::NotEnoughRuns`] for fewer than two run means.
    pub fn from_run_means(means: &[f64]) -> Result<Self> {
        let variance = statistics::sample_variance(means).ok_or(Error::NotEnoughRuns {
            required: 2,
            actual: means.len(),
        })?;
        Ok(Self {
            mean: statistics::mean(means)?,
            variance,
            std_error: (variance / means.len() as f64).sqrt(),
        })
    }
}

/// Paired comparison of the plain and the corrected mean-waiting-time estimators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceReductionReport {
    pub runs: usize,
    pub base_seed: u64,
    pub standard: EstimatorStatistics,
    pub controlled: EstimatorStatistics,
    /// `100 (Var_std - Var_cv) / Var_std`, zero when the plain estimator has no variance.
    pub variance_reduction_percent: f64,
    /// `Var_std / Var_cv`: how many plain runs one corrected run is worth. One when the plain estimator has no
    /// variance, infinite when only the corrected one has none.
    pub efficiency_gain: f64,
    pub mean_coefficient: f64,
    /// Average over the runs whose correlation is defined.
    pub mean_correlation: Option<f64>,
    pub negatively_correlated_runs: usize,
    pub per_run: Vec<RunEstimate>,
}

/// Runs single-day simulations of one configuration and estimates their mean waiting time with and without a
/// service-time control variate.
#[derive(Debug, Clone)]
pub struct VarianceReductionEstimator {
    simulation: Simulation,
    expected_service_time: f64,
}

impl VarianceReductionEstimator {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            expected_service_time: config.service_distribution().mean(),
            simulation: Simulation::new(config),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        self.simulation.config()
    }

    /// The seed the `i`-th run is offset from: `base_seed`, else the configured seed, else [`DEFAULT_BASE_SEED`].
    pub fn base_seed(&self, base_seed: Option<u64>) -> u64 {
        base_seed.or(self.config().seed()).unwrap_or(DEFAULT_BASE_SEED)
    }

    /// Mean raw waiting time of each of `runs` runs, in seed order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAdmittedPatients`] if a run admits nobody.
    pub fn standard(&self, runs: usize, base_seed: Option<u64>) -> Result<Vec<f64>> {
        let base = self.base_seed(base_seed);
        (0..runs as u64)
            .into_par_iter()
            .map(|i| {
                let realization = self.simulation.realize(base.wrapping_add(i))?;
                statistics::mean(&realization.schedule().waiting_times())
                    .map_err(|_| Error::NoAdmittedPatients { realizations: 1 })
            })
            .collect()
    }

    /// Corrected estimate of each of `runs` runs, in seed order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAdmittedPatients`] if a run admits nobody.
    pub fn controlled(&self, runs: usize, base_seed: Option<u64>) -> Result<Vec<RunEstimate>> {
        let base = self.base_seed(base_seed);
        (0..runs as u64)
            .into_par_iter()
            .map(|i| self.controlled_run(base.wrapping_add(i)))
            .collect()
    }

    /// Run both estimators on the same `runs` seeds and compare their cross-run variances.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotEnoughRuns`] for fewer than two runs, and [`Error::NoAdmittedPatients`] if a run admits
    /// nobody.
    pub fn compare(&self, runs: usize, base_seed: Option<u64>) -> Result<VarianceReductionReport> {
        if runs < 2 {
            return Err(Error::NotEnoughRuns {
                required: 2,
                actual: runs,
            });
        }
        let base_seed = self.base_seed(base_seed);

        let standard = EstimatorStatistics::from_run_means(&self.standard(runs, Some(base_seed))?)?;
        let per_run = self.controlled(runs, Some(base_seed))?;
        let controlled_means: Vec<f64> = per_run.iter().map(|run| run.controlled_mean).collect();
        let controlled = EstimatorStatistics::from_run_means(&controlled_means)?;

        let (variance_reduction_percent, efficiency_gain) = if standard.variance > 0.0 {
            let gain = if controlled.variance > 0.0 {
                standard.variance / controlled.variance
            } else {
                f64::INFINITY
            };
            (100.0 * (standard.variance - controlled.variance) / standard.variance, gain)
        } else {
            (0.0, 1.0)
        };

        let coefficients: Vec<f64> = per_run.iter().map(|run| run.coefficient).collect();
        let correlations: Vec<f64> = per_run.iter().filter_map(|run| run.correlation).collect();
        debug!(
            config = %self.config(),
            runs,
            base_seed,
            variance_reduction_percent,
            "variance reduction compared"
        );

        Ok(VarianceReductionReport {
            runs,
            base_seed,
            standard,
            controlled,
            variance_reduction_percent,
            efficiency_gain,
            mean_coefficient: statistics::mean(&coefficients)?,
            mean_correlation: statistics::mean(&correlations).ok(),
            negatively_correlated_runs: correlations.iter().filter(|&&rho| rho < 0.0).count(),
            per_run,
        })
    }

    fn controlled_run(&self, seed: u64) -> Result<RunEstimate> {
        let realization = self.simulation.realize(seed)?;
        let waiting_times = realization.schedule().waiting_times();
        let service_times = realization.schedule().service_times();
        let standard_mean =
            statistics::mean(&waiting_times).map_err(|_| Error::NoAdmittedPatients { realizations: 1 })?;
        let service_mean = statistics::mean(&service_times)?;

        let service_variance = statistics::sample_variance(&service_times).unwrap_or(0.0);
        let coefficient = match statistics::sample_covariance(&waiting_times, &service_times) {
            Some(covariance) if service_variance > MIN_CONTROL_VARIANCE => -covariance / service_variance,
            _ => 0.0,
        };

        let corrected: Vec<f64> = waiting_times
            .iter()
            .zip(&service_times)
            .map(|(w, s)| w - coefficient * (s - self.expected_service_time))
            .collect();
        let within_run_reduction = match (
            statistics::sample_variance(&waiting_times),
            statistics::sample_variance(&corrected),
        ) {
            (Some(raw), Some(corrected)) if raw > 0.0 => 100.0 * (raw - corrected) / raw,
            _ => 0.0,
        };

        Ok(RunEstimate {
            seed,
            standard_mean,
            controlled_mean: standard_mean - coefficient * (service_mean - self.expected_service_time),
            coefficient,
            correlation: statistics::correlation(&waiting_times, &service_times),
            within_run_reduction,
        })
    }
}
