use crate::config::SimulationConfig;
use crate::distribution::Sampler;
use crate::occupancy::OccupancyTrace;
use crate::schedule::Schedule;
use crate::simulator::ScheduleSimulator;
use crate::summary::Summary;
use crate::Result;

use rayon::prelude::*;
use tracing::debug;

/// One simulated day together with the seed that reproduces it.
#[derive(Debug, Clone, PartialEq)]
pub struct Realization {
    seed: u64,
    schedule: Schedule,
}

impl Realization {
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// # Errors
    ///
    /// See [`Schedule::trace()`].
    pub fn trace(&self) -> Result<OccupancyTrace> {
        self.schedule.trace()
    }
}

/// Drives independent realizations of one [`SimulationConfig`] and aggregates them into a [`Summary`].
///
/// Realizations are fully determined by their seed. A batch started with [`run()`] from base seed `s` seeds its
/// `i`-th realization with `s + i` (wrapping), so the whole experiment is reproducible from a single number no matter
/// how the realizations were spread over threads. Inside a realization, service durations are drawn with the
/// realization's seed and unpunctuality deviates with a second seed derived from it, keeping the two streams
/// independent.
///
/// The summary is cached once computed and dropped whenever a new batch of realizations is added.
///
/// ```
/// use clinicsim::{Simulation, SimulationConfig};
///
/// let config = SimulationConfig::builder().seed(7).build()?;
/// let mut simulation = Simulation::new(config);
/// simulation.run(20, None)?;
/// let cost = simulation.total_cost()?;
/// assert!(cost >= 0.0);
/// # Ok::<(), clinicsim::Error>(())
/// ```
///
/// [`run()`]: Simulation::run
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    simulator: ScheduleSimulator,
    realizations: Vec<Realization>,
    summary: Option<Summary>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            simulator: ScheduleSimulator::from_config(&config),
            config,
            realizations: Vec::new(),
            summary: None,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulate a single day with the given seed without recording it.
    ///
    /// # Errors
    ///
    /// Propagates any error of [`ScheduleSimulator::run()`], which cannot happen for the distributions a
    /// [`SimulationConfig`] allows.
    pub fn realize(&self, seed: u64) -> Result<Realization> {
        let patients = self.config.patients_per_run();
        let service_times = self.config.service_distribution().sample(patients, Some(seed));
        let deviates = self.config.arrival_deviation().sample(patients, Some(stream_seed(seed)));
        let requested = self.simulator.requested_arrivals(&deviates);

        Ok(Realization {
            seed,
            schedule: self.simulator.run(&requested, &service_times)?,
        })
    }

    /// Simulate `count` more days and record them, returning the new realizations.
    ///
    /// `seed` overrides the configured base seed for this batch. Without either, every realization draws a fresh
    /// seed, recorded on the [`Realization`], and the batch is not reproducible.
    ///
    /// Realizations run in parallel on the global rayon pool and are recorded in seed order.
    ///
    /// # Errors
    ///
    /// See [`realize()`](Self::realize). Nothing is recorded if any realization fails.
    pub fn run(&mut self, count: usize, seed: Option<u64>) -> Result<&[Realization]> {
        let base = seed.or(self.config.seed());
        let seeds: Vec<u64> = (0..count as u64)
            .map(|i| base.map_or_else(rand::random, |base| base.wrapping_add(i)))
            .collect();

        let this = &*self;
        let batch = seeds
            .into_par_iter()
            .map(|seed| this.realize(seed))
            .collect::<Result<Vec<_>>>()?;
        debug!(config = %self.config, count, ?base, "replications finished");

        let first = self.realizations.len();
        self.realizations.extend(batch);
        self.summary = None;
        Ok(&self.realizations[first..])
    }

    pub fn realizations(&self) -> &[Realization] {
        &self.realizations
    }

    /// The cached summary, if [`summarize()`](Self::summarize) has run since the last batch.
    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    /// Pool every recorded realization into a [`Summary`], reusing the cached one when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRealizations`] before the first batch and [`Error::NoAdmittedPatients`] if no realization
    /// admitted anybody.
    ///
    /// [`Error::NoRealizations`]: crate::Error::NoRealizations
    /// [`Error::NoAdmittedPatients`]: crate::Error::NoAdmittedPatients
    pub fn summarize(&mut self) -> Result<&Summary> {
        let summary = match self.summary.take() {
            Some(summary) => summary,
            None => Summary::from_schedules(&self.config, self.realizations.iter().map(|r| &r.schedule))?,
        };
        Ok(self.summary.insert(summary))
    }

    /// # Errors
    ///
    /// See [`summarize()`](Self::summarize).
    pub fn total_cost(&mut self) -> Result<f64> {
        self.summarize().map(Summary::total_cost)
    }
}

/// Seed of the unpunctuality stream of a realization, a SplitMix64 step away from the service-duration seed.
pub(crate) fn stream_seed(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn config() -> SimulationConfig {
        SimulationConfig::builder().seed(3).build().unwrap()
    }

    #[test]
    fn realization_seeds_follow_base() {
        let mut simulation = Simulation::new(config());
        let seeds: Vec<u64> = simulation.run(4, None).unwrap().iter().map(Realization::seed).collect();
        assert_eq!(vec![3, 4, 5, 6], seeds);

        let seeds: Vec<u64> = simulation.run(2, Some(100)).unwrap().iter().map(Realization::seed).collect();
        assert_eq!(vec![100, 101], seeds);
        assert_eq!(6, simulation.realizations().len());
    }

    #[test]
    fn realize_is_deterministic() {
        let simulation = Simulation::new(config());
        assert_eq!(simulation.realize(9).unwrap(), simulation.realize(9).unwrap());
        assert_ne!(simulation.realize(9).unwrap(), simulation.realize(10).unwrap());
    }

    #[test]
    fn new_batch_invalidates_summary() {
        let mut simulation = Simulation::new(config());
        assert_eq!(Err(Error::NoRealizations), simulation.summarize().cloned());

        simulation.run(5, None).unwrap();
        let first = simulation.summarize().unwrap().clone();
        assert_eq!(Some(&first), simulation.summary());
        assert_eq!(5, first.realizations);

        simulation.run(5, None).unwrap();
        assert_eq!(None, simulation.summary());
        assert_eq!(10, simulation.summarize().unwrap().realizations);
    }

    #[test]
    fn unseeded_runs_record_their_seeds() {
        let mut simulation = Simulation::new(SimulationConfig::builder().build().unwrap());
        let recorded: Vec<Realization> = simulation.run(3, None).unwrap().to_vec();
        for realization in recorded {
            assert_eq!(realization, simulation.realize(realization.seed()).unwrap());
        }
    }

    #[test]
    fn stream_seed_separates_streams() {
        assert_ne!(stream_seed(0), 0);
        assert_ne!(stream_seed(1), stream_seed(2));
    }
}
