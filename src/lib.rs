//! # Overview
//!
//! clinicsim evaluates appointment-scheduling policies for a single-queue, multi-server clinic by Monte Carlo
//! simulation, then searches over the scheduling parameters for the lowest operating cost. The crate is layered the
//! way the data flows through it:
//!
//! * A [`ScheduleSimulator`] runs one day: patients request arrival times around their appointment slots, are
//!   admitted while the waiting room has space, and are served by the first free server. The result is a
//!   [`Schedule`] of start and end times plus the day's idle and overtime totals.
//! * An [`OccupancyTrace`] reconstructs the number-in-system process of a [`Schedule`] from its arrival and
//!   departure times. Time-weighted quantities (idle server time, mean occupancy, queue length, utilization,
//!   overtime) are all read off this trace.
//! * A [`Simulation`] replicates the day many times under one [`SimulationConfig`] and pools the replications into a
//!   [`Summary`] of patient metrics, system metrics, and the total cost under the configured [`CostWeights`].
//! * A [`VarianceReductionEstimator`] compares the plain estimate of the mean waiting time with a control-variate
//!   estimate that exploits the known mean of the service time.
//! * An [`Optimizer`] sweeps one [`Parameter`] over an integer grid of offsets, finds the cheapest grid point, and
//!   tabulates how the summary metrics react when that optimum is perturbed.
//!
//! # Reproducibility
//!
//! Every random draw comes from a [`Pcg64`] generator seeded from a `u64`. A batch of replications started from base
//! seed `s` seeds its `i`-th replication with `s + i`, so identical configurations and seeds reproduce bit-identical
//! summaries no matter how many threads the replications and grid points were spread over. Parallel work runs on the
//! global [`rayon`] pool.
//!
//! # Logging
//!
//! The crate emits [`tracing`] events (finished grid points and perturbations at `info`, replication batches and memo
//! hits at `debug`, failed grid points at `warn`) but never installs a subscriber.
//!
//! [`Pcg64`]: rand_pcg::Pcg64

mod config;
mod control_variate;
mod cost;
pub mod distribution;
mod error;
mod occupancy;
pub mod optimizer;
mod replication;
mod schedule;
mod simulator;
pub mod statistics;
mod summary;

pub use config::{ConfigKey, ServiceModel, SimulationConfig, DEFAULT_SERVICE_CV};
pub use control_variate::{
    EstimatorStatistics, RunEstimate, VarianceReductionEstimator, VarianceReductionReport, DEFAULT_BASE_SEED,
};
pub use cost::{CostBasis, CostWeight, CostWeights};
pub use distribution::{Distribution, Sampler};
pub use error::{Error, Result};
pub use occupancy::{OccupancyTrace, Segment};
pub use optimizer::{Optimizer, Optimum, Parameter, Sweep};
pub use replication::{Realization, Simulation};
pub use schedule::{Patient, PatientRecord, Schedule};
pub use simulator::ScheduleSimulator;
pub use summary::{Averages, Metric, PatientMetrics, Summary, SystemMetrics};
