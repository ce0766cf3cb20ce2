use crate::{Error, Result};

use serde::Serialize;

/// A stretch of time during which the number of patients in the system did not change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub state: usize,
    pub duration: f64,
}

/// The piecewise-constant number-in-system process of one realization.
///
/// The trace is reconstructed from the admitted patients' arrival and departure times by walking both streams in
/// time order, the way a race between competing exponential clocks picks its next event. Every event emits one
/// segment holding the occupancy before the event and the time elapsed since the previous event, then moves the
/// occupancy by one. Ties go to the arrival.
///
/// For a trace built from a completed day:
///
/// - the durations sum to the time of the last departure,
/// - consecutive states differ by exactly one,
/// - and no state is negative.
///
/// Segments of zero length are kept, since dropping them would break the unit steps between neighbours.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OccupancyTrace {
    segments: Vec<Segment>,
}

impl OccupancyTrace {
    /// Merge arrival and departure times into a trace starting at time zero.
    ///
    /// Both streams are sorted here, so they can be passed in any order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any time is negative or not finite, or if at some point more patients
    /// would have left than arrived.
    pub fn from_events(arrivals: &[f64], departures: &[f64]) -> Result<Self> {
        if let Some(bad) = arrivals.iter().chain(departures).find(|t| !(t.is_finite() && **t >= 0.0)) {
            return Err(Error::config(
                "event time",
                format!("must be finite and non-negative, got {bad}"),
            ));
        }

        let mut arrivals = arrivals.to_vec();
        arrivals.sort_by(f64::total_cmp);
        let mut departures = departures.to_vec();
        departures.sort_by(f64::total_cmp);

        let mut segments = Vec::with_capacity(arrivals.len() + departures.len());
        let (mut next_arrival, mut next_departure) = (0, 0);
        let mut clock = 0.0;
        let mut state: usize = 0;

        while next_arrival < arrivals.len() || next_departure < departures.len() {
            let arrival = arrivals.get(next_arrival).copied().unwrap_or(f64::INFINITY);
            let departure = departures.get(next_departure).copied().unwrap_or(f64::INFINITY);
            let is_arrival = arrival <= departure;
            let time = if is_arrival { arrival } else { departure };

            segments.push(Segment {
                state,
                duration: time - clock,
            });
            clock = time;

            if is_arrival {
                state += 1;
                next_arrival += 1;
            } else {
                state = state.checked_sub(1).ok_or_else(|| {
                    Error::config(
                        "event time",
                        format!("departure at {departure} with nobody in the system"),
                    )
                })?;
                next_departure += 1;
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Length of the traced period, which for a completed day is its makespan.
    pub fn total_time(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Time integral of the number in system, the quantity Little's law relates to throughput and sojourn time.
    pub fn occupancy_integral(&self) -> f64 {
        self.segments.iter().map(|s| s.state as f64 * s.duration).sum()
    }

    /// Time-average number in system, zero for a trace of zero length.
    pub fn mean_occupancy(&self) -> f64 {
        let total = self.total_time();
        if total > 0.0 {
            self.occupancy_integral() / total
        } else {
            0.0
        }
    }

    /// Server-minutes spent idle: each segment contributes its unoccupied servers times its length.
    pub fn server_idle_time(&self, servers: usize) -> f64 {
        self.segments
            .iter()
            .map(|s| servers.saturating_sub(s.state) as f64 * s.duration)
            .sum()
    }

    /// Patient-minutes spent waiting for a server.
    pub fn waiting_integral(&self, servers: usize) -> f64 {
        self.waiting_profile(servers).iter().sum()
    }

    /// Per-segment patient-minutes spent waiting, in time order.
    pub fn waiting_profile(&self, servers: usize) -> Vec<f64> {
        self.segments
            .iter()
            .map(|s| s.state.saturating_sub(servers) as f64 * s.duration)
            .collect()
    }

    /// Overtime beyond `working_minutes` summed over servers.
    ///
    /// The first server is charged for the whole traced period running past closing time. Each further server is
    /// charged for the period with one more trailing segment peeled off, since the last segments of a day are served
    /// by ever fewer servers.
    pub fn server_overtime(&self, working_minutes: f64, servers: usize) -> f64 {
        let mut remaining = self.total_time();
        let mut overtime = 0.0;
        let mut trailing = self.segments.iter().rev();
        for _ in 0..servers {
            overtime += (remaining - working_minutes).max(0.0);
            match trailing.next() {
                Some(segment) => remaining -= segment.duration,
                None => break,
            }
        }
        overtime
    }

    /// Percentage of the traced period during which at least one patient was in the system, zero for a trace of
    /// zero length.
    pub fn utilization(&self) -> f64 {
        let total = self.total_time();
        if total > 0.0 {
            let busy: f64 = self.segments.iter().filter(|s| s.state > 0).map(|s| s.duration).sum();
            100.0 * busy / total
        } else {
            0.0
        }
    }
}
