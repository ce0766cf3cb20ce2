use crate::cost::CostWeights;
use crate::distribution::{Degenerate, Distribution, Exponential, Lognormal};
use crate::{Error, Result};

use bon::bon;
use ordered_float::OrderedFloat;
use std::fmt::{Display, Formatter};

/// Coefficient of variation of lognormal service durations unless configured otherwise.
pub const DEFAULT_SERVICE_CV: f64 = 0.325;

/// How the service-duration distribution is derived from the configured mean service time.
///
/// The service distribution is never set directly. It is re-derived whenever the mean service time changes, so a
/// sweep over the mean can never leave a stale spread behind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServiceModel {
    /// Lognormal durations with the given coefficient of variation.
    Lognormal { cv: f64 },
    /// Exponential durations (coefficient of variation 1).
    Exponential,
    /// Every service takes exactly the mean.
    Degenerate,
}

impl ServiceModel {
    /// Build the service distribution with the given mean.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDistribution`] if the model cannot produce that mean.
    pub fn distribution(&self, mean: f64) -> Result<Distribution> {
        Ok(match *self {
            Self::Lognormal { cv } => Lognormal::from_mean_cv(mean, cv)?.into(),
            Self::Exponential => Exponential::with_mean(mean)?.into(),
            Self::Degenerate => Degenerate::new(mean)?.into(),
        })
    }

    fn parameters(&self) -> (u8, Option<f64>) {
        match *self {
            Self::Lognormal { cv } => (0, Some(cv)),
            Self::Exponential => (1, None),
            Self::Degenerate => (2, None),
        }
    }
}

impl Default for ServiceModel {
    fn default() -> Self {
        Self::Lognormal { cv: DEFAULT_SERVICE_CV }
    }
}

/// Everything that defines one simulated clinic day, immutable once built.
///
/// Build one with [`SimulationConfig::builder()`]. Every construction, and every `with_*` adjustment, runs the same
/// normalization step: all fields are validated, then the dependent fields (the service-duration distribution and
/// the number of patients per run) are re-derived from their inputs.
///
/// ```
/// use clinicsim::SimulationConfig;
///
/// let config = SimulationConfig::builder()
///     .working_hours(8.0)
///     .scheduled_spacing(15.0)
///     .mean_service_time(15.5)
///     .seed(0)
///     .build()?;
/// assert_eq!(30, config.patients_per_run());
/// # Ok::<(), clinicsim::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    working_hours: f64,
    scheduled_spacing: f64,
    mean_service_time: f64,
    servers: usize,
    queue_capacity: Option<usize>,
    cost_weights: CostWeights,
    arrival_deviation: Distribution,
    service_model: ServiceModel,
    patients: Option<usize>,
    waiting_threshold: f64,
    seed: Option<u64>,

    // derived by `normalize()`
    service_distribution: Distribution,
    patients_per_run: usize,
}

#[bon]
impl SimulationConfig {
    /// Validate the inputs and derive the dependent fields.
    ///
    /// `queue_capacity` of `None` means the waiting room is unbounded. `patients` overrides the number of
    /// appointments per day, which otherwise is however many mean service times fit into the working hours.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] or [`Error::InvalidDistribution`] if any field is out of its domain.
    #[builder]
    pub fn new(
        #[builder(default = 8.0)] working_hours: f64,
        #[builder(default = 15.0)] scheduled_spacing: f64,
        #[builder(default = 15.5)] mean_service_time: f64,
        #[builder(default = 1)] servers: usize,
        queue_capacity: Option<usize>,
        #[builder(default)] cost_weights: CostWeights,
        #[builder(default)] arrival_deviation: Distribution,
        #[builder(default)] service_model: ServiceModel,
        patients: Option<usize>,
        #[builder(default = 15.0)] waiting_threshold: f64,
        seed: Option<u64>,
    ) -> Result<Self> {
        Self {
            working_hours,
            scheduled_spacing,
            mean_service_time,
            servers,
            queue_capacity,
            cost_weights,
            arrival_deviation,
            service_model,
            patients,
            waiting_threshold,
            seed,
            service_distribution: Distribution::default(),
            patients_per_run: 0,
        }
        .normalize()
    }
}

impl SimulationConfig {
    fn normalize(mut self) -> Result<Self> {
        if !(self.working_hours.is_finite() && self.working_hours > 0.0) {
            return Err(Error::config(
                "working hours",
                format!("must be finite and positive, got {}", self.working_hours),
            ));
        }
        if !(self.scheduled_spacing.is_finite() && self.scheduled_spacing >= 0.0) {
            return Err(Error::config(
                "scheduled spacing",
                format!("must be finite and non-negative, got {}", self.scheduled_spacing),
            ));
        }
        if !(self.mean_service_time.is_finite() && self.mean_service_time > 0.0) {
            return Err(Error::config(
                "mean service time",
                format!("must be finite and positive, got {}", self.mean_service_time),
            ));
        }
        if self.servers == 0 {
            return Err(Error::config("servers", "must be at least 1"));
        }
        if !(self.waiting_threshold.is_finite() && self.waiting_threshold >= 0.0) {
            return Err(Error::config(
                "waiting threshold",
                format!("must be finite and non-negative, got {}", self.waiting_threshold),
            ));
        }

        self.service_distribution = self.service_model.distribution(self.mean_service_time)?;
        self.patients_per_run = self
            .patients
            .unwrap_or_else(|| (self.working_minutes() / self.mean_service_time).floor() as usize);
        Ok(self)
    }

    fn adjusted(&self, adjust: impl FnOnce(&mut Self)) -> Result<Self> {
        let mut next = self.clone();
        adjust(&mut next);
        next.normalize()
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the new value is not finite and positive.
    pub fn with_working_hours(&self, working_hours: f64) -> Result<Self> {
        self.adjusted(|c| c.working_hours = working_hours)
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the new value is not finite and non-negative.
    pub fn with_scheduled_spacing(&self, scheduled_spacing: f64) -> Result<Self> {
        self.adjusted(|c| c.scheduled_spacing = scheduled_spacing)
    }

    /// Change the mean service time, re-deriving the service distribution and the patient count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the new value is not finite and positive.
    pub fn with_mean_service_time(&self, mean_service_time: f64) -> Result<Self> {
        self.adjusted(|c| c.mean_service_time = mean_service_time)
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `servers` is zero.
    pub fn with_servers(&self, servers: usize) -> Result<Self> {
        self.adjusted(|c| c.servers = servers)
    }

    /// # Errors
    ///
    /// Never fails for weights that passed [`CostWeights::new()`], but still runs the full normalization.
    pub fn with_cost_weights(&self, cost_weights: CostWeights) -> Result<Self> {
        self.adjusted(|c| c.cost_weights = cost_weights)
    }

    /// # Errors
    ///
    /// Never fails for an otherwise valid config, but still runs the full normalization.
    pub fn with_seed(&self, seed: Option<u64>) -> Result<Self> {
        self.adjusted(|c| c.seed = seed)
    }

    pub fn working_hours(&self) -> f64 {
        self.working_hours
    }

    pub fn working_minutes(&self) -> f64 {
        self.working_hours * 60.0
    }

    /// Nominal interval between consecutive appointment slots, in minutes.
    pub fn scheduled_spacing(&self) -> f64 {
        self.scheduled_spacing
    }

    pub fn mean_service_time(&self) -> f64 {
        self.mean_service_time
    }

    pub fn servers(&self) -> usize {
        self.servers
    }

    /// Waiting-room capacity, `None` when unbounded.
    pub fn queue_capacity(&self) -> Option<usize> {
        self.queue_capacity
    }

    /// Most patients that may be in the system at once (servers plus waiting room), `None` when unbounded.
    pub fn system_limit(&self) -> Option<usize> {
        self.queue_capacity.map(|capacity| self.servers.saturating_add(capacity))
    }

    pub fn cost_weights(&self) -> &CostWeights {
        &self.cost_weights
    }

    /// Distribution of each patient's deviation from their slot time, in minutes.
    pub fn arrival_deviation(&self) -> &Distribution {
        &self.arrival_deviation
    }

    pub fn service_model(&self) -> ServiceModel {
        self.service_model
    }

    /// Service-duration distribution derived from the mean service time and the [`ServiceModel`].
    pub fn service_distribution(&self) -> &Distribution {
        &self.service_distribution
    }

    /// Number of appointments requested on each simulated day.
    pub fn patients_per_run(&self) -> usize {
        self.patients_per_run
    }

    /// Waits longer than this many minutes are counted as excessive in the patient metrics.
    pub fn waiting_threshold(&self) -> f64 {
        self.waiting_threshold
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// A value-based key identifying this configuration, suitable for memo tables.
    pub fn key(&self) -> ConfigKey {
        let (arrival_tag, arrival_parameters) = self.arrival_deviation.parameters();
        let (service_tag, service_cv) = self.service_model.parameters();

        let mut values = vec![
            self.working_hours,
            self.scheduled_spacing,
            self.mean_service_time,
            self.waiting_threshold,
        ];
        values.extend(self.cost_weights.as_array());
        values.push(f64::from(arrival_tag));
        values.extend(arrival_parameters);
        values.push(f64::from(service_tag));
        values.extend(service_cv);

        ConfigKey {
            values: values.into_iter().map(OrderedFloat).collect(),
            counts: vec![
                Some(self.servers as u64),
                self.queue_capacity.map(|c| c as u64),
                Some(self.patients_per_run as u64),
                self.seed,
            ],
        }
    }
}

impl Display for SimulationConfig {
    /// Queueing-style shorthand: `spacing/mean service/servers`.
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.scheduled_spacing, self.mean_service_time, self.servers)
    }
}

/// Hashable identity of a [`SimulationConfig`], compared by value rather than by reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigKey {
    values: Vec<OrderedFloat<f64>>,
    counts: Vec<Option<u64>>,
}
