use crate::config::SimulationConfig;
use crate::cost::{CostBasis, CostWeights};
use crate::schedule::Schedule;
use crate::statistics;
use crate::{Error, Result};

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Waiting-time statistics over every admitted patient of every realization, pooled rather than averaged per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatientMetrics {
    pub mean_waiting_time: f64,
    pub max_waiting_time: f64,
    /// Population standard deviation.
    pub std_waiting_time: f64,
    /// Linearly interpolated.
    pub p95_waiting_time: f64,
    pub excessive_waits: usize,
    pub excessive_wait_percentage: f64,
}

/// Occupancy-trace quantities of each realization, averaged across realizations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemMetrics {
    /// Percentage of the day with at least one patient in the system.
    pub utilization: f64,
    /// Time-average number in system.
    pub mean_occupancy: f64,
    /// Patient-minutes spent in the system per run, `Σ state × duration` of the trace, counting patients in service.
    pub occupancy_integral: f64,
    /// Time-average number waiting for a server.
    pub mean_queue_length: f64,
    /// Requested patients per minute of makespan, over realizations that admitted anyone. Dropped patients count, so
    /// a loss system is credited with every booked appointment.
    pub throughput: f64,
}

/// Per-run cost components and the resulting total cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Averages {
    pub mean_idle_time: f64,
    pub mean_waiting_time: f64,
    pub mean_overtime: f64,
    pub total_cost: f64,
}

/// Aggregate statistics of a set of realizations under one configuration.
///
/// The patient counts at the top are informational: patients who were turned away because the system was full are
/// excluded from every waiting-time statistic and from the cost, but their number stays visible here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub realizations: usize,
    pub requested: usize,
    pub admitted: usize,
    pub dropped: usize,
    /// Dropped over requested patients, zero when nobody was requested.
    pub loss_rate: f64,
    pub patient_metrics: PatientMetrics,
    pub system_metrics: SystemMetrics,
    pub averages: Averages,
    pub cost_basis: CostBasis,
}

impl Summary {
    /// Summarize the given schedules, all assumed to have been simulated under `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRealizations`] for an empty set of schedules and [`Error::NoAdmittedPatients`] when no
    /// schedule admitted anybody.
    pub fn from_schedules<'a>(
        config: &SimulationConfig,
        schedules: impl IntoIterator<Item = &'a Schedule>,
    ) -> Result<Self> {
        let mut realizations = 0;
        let (mut requested, mut admitted, mut dropped) = (0, 0, 0);
        let mut waiting_times = Vec::new();
        let mut idle_times = Vec::new();
        let mut overtimes = Vec::new();
        let mut utilizations = Vec::new();
        let mut occupancies = Vec::new();
        let mut occupancy_integrals = Vec::new();
        let mut queue_lengths = Vec::new();
        let mut throughputs = Vec::new();

        for schedule in schedules {
            realizations += 1;
            requested += schedule.requested();
            admitted += schedule.admitted();
            dropped += schedule.dropped();
            waiting_times.extend(schedule.waiting_times());

            let trace = schedule.trace()?;
            let servers = schedule.servers();
            let total_time = trace.total_time();
            idle_times.push(trace.server_idle_time(servers));
            overtimes.push(trace.server_overtime(schedule.working_minutes(), servers));
            utilizations.push(trace.utilization());
            occupancies.push(trace.mean_occupancy());
            occupancy_integrals.push(trace.occupancy_integral());
            if total_time > 0.0 {
                queue_lengths.push(trace.waiting_integral(servers) / total_time);
                throughputs.push(schedule.requested() as f64 / total_time);
            } else {
                queue_lengths.push(0.0);
            }
        }

        if realizations == 0 {
            return Err(Error::NoRealizations);
        }
        if waiting_times.is_empty() {
            return Err(Error::NoAdmittedPatients { realizations });
        }

        let threshold = config.waiting_threshold();
        let excessive_waits = waiting_times.iter().filter(|&&w| w > threshold).count();
        let patient_metrics = PatientMetrics {
            mean_waiting_time: statistics::mean(&waiting_times)?,
            max_waiting_time: statistics::max(&waiting_times)?,
            std_waiting_time: statistics::population_std_dev(&waiting_times)?,
            p95_waiting_time: statistics::percentile(&waiting_times, 95.0)?,
            excessive_waits,
            excessive_wait_percentage: 100.0 * excessive_waits as f64 / waiting_times.len() as f64,
        };

        let system_metrics = SystemMetrics {
            utilization: statistics::mean(&utilizations)?,
            mean_occupancy: statistics::mean(&occupancies)?,
            occupancy_integral: statistics::mean(&occupancy_integrals)?,
            mean_queue_length: statistics::mean(&queue_lengths)?,
            throughput: statistics::mean(&throughputs).unwrap_or(0.0),
        };

        let cost_basis = CostBasis {
            mean_idle_time: statistics::mean(&idle_times)?,
            mean_waiting_time: patient_metrics.mean_waiting_time,
            mean_overtime: statistics::mean(&overtimes)?,
            patients_per_run: config.patients_per_run(),
            servers: config.servers(),
            working_minutes: config.working_minutes(),
        };

        Ok(Self {
            realizations,
            requested,
            admitted,
            dropped,
            loss_rate: if requested > 0 {
                dropped as f64 / requested as f64
            } else {
                0.0
            },
            patient_metrics,
            system_metrics,
            averages: Averages {
                mean_idle_time: cost_basis.mean_idle_time,
                mean_waiting_time: cost_basis.mean_waiting_time,
                mean_overtime: cost_basis.mean_overtime,
                total_cost: config.cost_weights().total_cost(&cost_basis),
            },
            cost_basis,
        })
    }

    pub fn total_cost(&self) -> f64 {
        self.averages.total_cost
    }

    /// The same summary priced with different cost weights. Nothing is re-simulated.
    pub fn with_cost(&self, weights: &CostWeights) -> Self {
        let mut priced = self.clone();
        priced.averages.total_cost = weights.total_cost(&self.cost_basis);
        priced
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        let (patient, system, averages) = (&self.patient_metrics, &self.system_metrics, &self.averages);
        match metric {
            Metric::MeanWaitingTime => patient.mean_waiting_time,
            Metric::MaxWaitingTime => patient.max_waiting_time,
            Metric::StdWaitingTime => patient.std_waiting_time,
            Metric::P95WaitingTime => patient.p95_waiting_time,
            Metric::ExcessiveWaits => patient.excessive_waits as f64,
            Metric::ExcessiveWaitPercentage => patient.excessive_wait_percentage,
            Metric::Utilization => system.utilization,
            Metric::MeanOccupancy => system.mean_occupancy,
            Metric::OccupancyIntegral => system.occupancy_integral,
            Metric::MeanQueueLength => system.mean_queue_length,
            Metric::Throughput => system.throughput,
            Metric::MeanIdleTime => averages.mean_idle_time,
            Metric::MeanOvertime => averages.mean_overtime,
            Metric::TotalCost => averages.total_cost,
            Metric::LossRate => self.loss_rate,
        }
    }
}

/// Names a numeric field of a [`Summary`], for delta tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Metric {
    MeanWaitingTime,
    MaxWaitingTime,
    StdWaitingTime,
    P95WaitingTime,
    ExcessiveWaits,
    ExcessiveWaitPercentage,
    Utilization,
    MeanOccupancy,
    OccupancyIntegral,
    MeanQueueLength,
    Throughput,
    MeanIdleTime,
    MeanOvertime,
    TotalCost,
    LossRate,
}

impl Metric {
    pub const ALL: [Metric; 15] = [
        Self::MeanWaitingTime,
        Self::MaxWaitingTime,
        Self::StdWaitingTime,
        Self::P95WaitingTime,
        Self::ExcessiveWaits,
        Self::ExcessiveWaitPercentage,
        Self::Utilization,
        Self::MeanOccupancy,
        Self::OccupancyIntegral,
        Self::MeanQueueLength,
        Self::Throughput,
        Self::MeanIdleTime,
        Self::MeanOvertime,
        Self::TotalCost,
        Self::LossRate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::MeanWaitingTime => "mean_waiting_time",
            Self::MaxWaitingTime => "max_waiting_time",
            Self::StdWaitingTime => "std_waiting_time",
            Self::P95WaitingTime => "p95_waiting_time",
            Self::ExcessiveWaits => "excessive_waits",
            Self::ExcessiveWaitPercentage => "excessive_wait_percentage",
            Self::Utilization => "utilization",
            Self::MeanOccupancy => "mean_occupancy",
            Self::OccupancyIntegral => "occupancy_integral",
            Self::MeanQueueLength => "mean_queue_length",
            Self::Throughput => "throughput",
            Self::MeanIdleTime => "mean_idle_time",
            Self::MeanOvertime => "mean_overtime",
            Self::TotalCost => "total_cost",
            Self::LossRate => "loss_rate",
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostWeight;
    use crate::ScheduleSimulator;
    use approx::assert_relative_eq;

    fn config() -> SimulationConfig {
        SimulationConfig::builder()
            .working_hours(1.0)
            .patients(4)
            .build()
            .unwrap()
    }

    fn saturated_day() -> Schedule {
        let simulator = ScheduleSimulator::from_config(&config());
        simulator.run(&[0.0, 15.0, 30.0, 45.0], &[30.0; 4]).unwrap()
    }

    #[test]
    fn pooled_waiting_statistics() {
        let summary = Summary::from_schedules(&config(), [&saturated_day()]).unwrap();
        let patient = summary.patient_metrics;
        assert_relative_eq!(22.5, patient.mean_waiting_time);
        assert_relative_eq!(45.0, patient.max_waiting_time);
        assert_relative_eq!(1125.0_f64.sqrt() / 2.0, patient.std_waiting_time, max_relative = 1e-12);
        assert_relative_eq!(42.75, patient.p95_waiting_time);
        assert_eq!(2, patient.excessive_waits);
        assert_relative_eq!(50.0, patient.excessive_wait_percentage);
    }

    #[test]
    fn system_metrics_come_from_trace() {
        let summary = Summary::from_schedules(&config(), [&saturated_day()]).unwrap();
        assert_relative_eq!(100.0, summary.system_metrics.utilization);
        // a single server is busy until 120, after the 60 minute day
        assert_relative_eq!(60.0, summary.averages.mean_overtime);
        assert_relative_eq!(0.0, summary.averages.mean_idle_time);
        assert_relative_eq!(4.0 / 120.0, summary.system_metrics.throughput);
        // one patient in the system for all 120 minutes, plus the queue 15 + 30 + 45 minutes long
        assert_relative_eq!(120.0 + 90.0, summary.system_metrics.occupancy_integral);
        assert_relative_eq!(210.0 / 120.0, summary.system_metrics.mean_occupancy);
    }

    #[test]
    fn throughput_counts_dropped_patients() {
        let simulator = ScheduleSimulator::new(1, Some(0), 15.0, 60.0).unwrap();
        let schedule = simulator.run(&[0.0, 15.0, 30.0, 45.0], &[30.0; 4]).unwrap();
        assert_eq!(2, schedule.dropped());

        let summary = Summary::from_schedules(&config(), [&schedule]).unwrap();
        assert_relative_eq!(4.0 / 60.0, summary.system_metrics.throughput);
        assert_relative_eq!(60.0, summary.system_metrics.occupancy_integral);
    }

    #[test]
    fn cost_combines_weighted_averages() {
        let summary = Summary::from_schedules(&config(), [&saturated_day()]).unwrap();
        // idle 1.0 * 0 + waiting 0.2 * 22.5 * 4 + overtime 1.5 * 60
        assert_relative_eq!(18.0 + 90.0, summary.total_cost(), max_relative = 1e-12);

        let doubled = CostWeights::default().scaled(CostWeight::Waiting, 2.0).unwrap();
        assert_relative_eq!(36.0 + 90.0, summary.with_cost(&doubled).total_cost(), max_relative = 1e-12);
    }

    #[test]
    fn degenerate_sets_are_errors() {
        let none: [&Schedule; 0] = [];
        assert_eq!(Err(Error::NoRealizations), Summary::from_schedules(&config(), none));

        let empty = ScheduleSimulator::from_config(&config()).run(&[], &[]).unwrap();
        assert_eq!(
            Err(Error::NoAdmittedPatients { realizations: 1 }),
            Summary::from_schedules(&config(), [&empty])
        );
    }

    #[test]
    fn metrics_are_named() {
        let summary = Summary::from_schedules(&config(), [&saturated_day()]).unwrap();
        assert_eq!(summary.total_cost(), summary.metric(Metric::TotalCost));
        assert_eq!("p95_waiting_time", Metric::P95WaitingTime.to_string());
        let names: std::collections::HashSet<_> = Metric::ALL.iter().map(Metric::name).collect();
        assert_eq!(Metric::ALL.len(), names.len());
    }
}
