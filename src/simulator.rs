use crate::config::SimulationConfig;
use crate::schedule::{Patient, Schedule};
use crate::{Error, Result};

use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Runs a single realization of the clinic's multi-server queue with finite capacity.
///
/// Arrivals are processed in increasing time order. Each server is represented only by the time it will next be
/// free, kept in a min-heap of at most `servers` entries. An arrival is admitted only while the number of patients
/// in the system (busy servers plus patients already admitted but not yet started) is strictly below the system
/// limit of servers plus queue capacity. Admitted patients start immediately if a server is free, otherwise at the
/// earliest time one frees up.
///
/// The simulator holds no per-run state, so one value can serve any number of realizations, including from several
/// threads at once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleSimulator {
    servers: usize,
    system_limit: Option<usize>,
    scheduled_spacing: f64,
    working_minutes: f64,
}

impl ScheduleSimulator {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `servers` is zero, or if `scheduled_spacing` or `working_minutes` is
    /// negative or not finite.
    pub fn new(
        servers: usize,
        queue_capacity: Option<usize>,
        scheduled_spacing: f64,
        working_minutes: f64,
    ) -> Result<Self> {
        if servers == 0 {
            return Err(Error::config("servers", "must be at least 1"));
        }
        if !(scheduled_spacing.is_finite() && scheduled_spacing >= 0.0) {
            return Err(Error::config(
                "scheduled spacing",
                format!("must be finite and non-negative, got {scheduled_spacing}"),
            ));
        }
        if !(working_minutes.is_finite() && working_minutes >= 0.0) {
            return Err(Error::config(
                "working minutes",
                format!("must be finite and non-negative, got {working_minutes}"),
            ));
        }

        Ok(Self {
            servers,
            system_limit: queue_capacity.map(|capacity| servers.saturating_add(capacity)),
            scheduled_spacing,
            working_minutes,
        })
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            servers: config.servers(),
            system_limit: config.system_limit(),
            scheduled_spacing: config.scheduled_spacing(),
            working_minutes: config.working_minutes(),
        }
    }

    pub fn servers(&self) -> usize {
        self.servers
    }

    pub fn system_limit(&self) -> Option<usize> {
        self.system_limit
    }

    /// Turn per-patient unpunctuality deviates into requested arrival times.
    ///
    /// The deviates perturb the gaps between consecutive arrivals: the first patient arrives at `deviates[0]`, and
    /// each later patient arrives `scheduled_spacing + deviates[i]` after the one before. The result is neither
    /// clamped nor sorted; [`run()`](Self::run) does both.
    pub fn requested_arrivals(&self, deviates: &[f64]) -> Vec<f64> {
        deviates
            .iter()
            .enumerate()
            .scan(0.0, |clock, (i, &deviate)| {
                *clock += if i == 0 {
                    deviate
                } else {
                    self.scheduled_spacing + deviate
                };
                Some(*clock)
            })
            .collect()
    }

    /// Simulate one day for the given requested arrival times and service durations.
    ///
    /// Requested times are clamped at zero and sorted, and the `i`-th sorted arrival is served for
    /// `service_times[i]` minutes. Extra service durations beyond the number of arrivals are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if there are fewer service durations than arrivals, and
    /// [`Error::InvalidConfig`] if any arrival time is not finite or any service duration is negative or not finite.
    pub fn run(&self, requested: &[f64], service_times: &[f64]) -> Result<Schedule> {
        if service_times.len() < requested.len() {
            return Err(Error::LengthMismatch {
                arrivals: requested.len(),
                services: service_times.len(),
            });
        }
        if let Some(bad) = requested.iter().find(|t| !t.is_finite()) {
            return Err(Error::config("arrival time", format!("must be finite, got {bad}")));
        }
        if let Some(bad) = service_times.iter().find(|s| !(s.is_finite() && **s >= 0.0)) {
            return Err(Error::config(
                "service time",
                format!("must be finite and non-negative, got {bad}"),
            ));
        }

        let mut arrivals: Vec<f64> = requested.iter().map(|t| t.max(0.0)).collect();
        arrivals.sort_by(f64::total_cmp);

        let mut busy_until: BinaryHeap<Reverse<OrderedFloat<f64>>> = BinaryHeap::with_capacity(self.servers);
        let mut patients: Vec<Patient> = Vec::with_capacity(arrivals.len());
        let mut dropped = Vec::new();
        let mut started = 0;
        let mut idle_time = 0.0;

        for (slot, (&arrival, &service)) in arrivals.iter().zip(service_times).enumerate() {
            while busy_until.peek().is_some_and(|Reverse(end)| end.0 <= arrival) {
                busy_until.pop();
            }

            // start times are non-decreasing, so everyone before `started` has already begun service
            while started < patients.len() && patients[started].start <= arrival {
                started += 1;
            }
            let waiting = patients.len() - started;
            let in_system = busy_until.len() + waiting;

            if self.system_limit.is_some_and(|limit| in_system >= limit) {
                tracing::trace!(slot, arrival, in_system, "arrival dropped, system full");
                dropped.push(slot);
                continue;
            }

            let start = if busy_until.len() < self.servers {
                let free = self.servers - busy_until.len();
                let previous_departure = patients.last().map_or(0.0, |p| p.end);
                idle_time += free as f64 * (arrival - previous_departure).max(0.0);
                arrival
            } else {
                busy_until.pop().map_or(arrival, |Reverse(end)| end.0.max(arrival))
            };

            let end = start + service;
            busy_until.push(Reverse(OrderedFloat(end)));
            patients.push(Patient {
                slot,
                arrival,
                start,
                end,
            });
        }

        let overtime = self.overtime(&patients);

        Ok(Schedule::new(
            self.scheduled_spacing,
            self.working_minutes,
            self.servers,
            arrivals,
            patients,
            dropped,
            idle_time,
            overtime,
        ))
    }

    /// Overtime of the last-finishing server, plus that of the second-to-last when there is more than one server.
    fn overtime(&self, patients: &[Patient]) -> f64 {
        let (largest, second) = patients.iter().map(|p| p.end).fold((None, None), |(largest, second), end| {
            match largest {
                Some(l) if end <= l => (largest, second.map_or(Some(end), |s: f64| Some(s.max(end)))),
                _ => (Some(end), largest),
            }
        });

        let past_closing = |end: f64| (end - self.working_minutes).max(0.0);
        let mut overtime = largest.map_or(0.0, past_closing);
        if self.servers > 1 {
            overtime += second.map_or(0.0, past_closing);
        }
        overtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_server() -> ScheduleSimulator {
        ScheduleSimulator::new(1, None, 15.0, 60.0).unwrap()
    }

    #[test]
    fn arrivals_accumulate_gaps() {
        let arrivals = single_server().requested_arrivals(&[2.0, -1.0, 3.0]);
        assert_eq!(vec![2.0, 16.0, 34.0], arrivals);
    }

    #[test]
    fn empty_day_is_empty_schedule() {
        let schedule = single_server().run(&[], &[]).unwrap();
        assert!(schedule.is_empty());
        assert_eq!(0.0, schedule.idle_time());
        assert_eq!(0.0, schedule.overtime());
    }

    #[test]
    fn rejects_short_service_list() {
        assert_eq!(
            Err(Error::LengthMismatch { arrivals: 2, services: 1 }),
            single_server().run(&[0.0, 15.0], &[10.0])
        );
    }

    #[test]
    fn negative_requests_clamp_and_sort() {
        let schedule = single_server().run(&[10.0, -5.0], &[1.0, 1.0]).unwrap();
        assert_eq!(&[0.0, 10.0], schedule.requested_arrivals());
        assert_eq!(0.0, schedule.patients()[0].arrival);
    }

    #[test]
    fn waiting_patient_starts_at_earliest_release() {
        let simulator = ScheduleSimulator::new(2, None, 0.0, 100.0).unwrap();
        let schedule = simulator.run(&[0.0, 0.0, 0.0], &[10.0, 5.0, 1.0]).unwrap();
        let starts: Vec<f64> = schedule.patients().iter().map(|p| p.start).collect();
        assert_eq!(vec![0.0, 0.0, 5.0], starts);
    }

    #[test]
    fn idle_counts_free_servers_since_last_departure() {
        let simulator = ScheduleSimulator::new(2, None, 0.0, 100.0).unwrap();
        // the second arrival comes before the first departure and adds nothing
        // the third arrival at 20 finds both servers free since the last departure at 14
        let schedule = simulator.run(&[0.0, 4.0, 20.0], &[10.0, 10.0, 1.0]).unwrap();
        assert_eq!(2.0 * 6.0, schedule.idle_time());
    }

    #[test]
    fn overtime_uses_two_latest_servers() {
        let simulator = ScheduleSimulator::new(2, None, 0.0, 10.0).unwrap();
        let schedule = simulator.run(&[0.0, 0.0, 0.0], &[12.0, 15.0, 1.0]).unwrap();
        // ends: 12, 15, 13 -> (15 - 10) + (13 - 10)
        assert_eq!(8.0, schedule.overtime());

        let single = ScheduleSimulator::new(1, None, 0.0, 10.0).unwrap();
        let schedule = single.run(&[0.0, 0.0], &[6.0, 6.0]).unwrap();
        assert_eq!(2.0, schedule.overtime());
    }

    #[test]
    fn queue_capacity_bounds_system() {
        // one server, one waiting place: the third simultaneous arrival is turned away
        let simulator = ScheduleSimulator::new(1, Some(1), 0.0, 100.0).unwrap();
        let schedule = simulator.run(&[0.0, 1.0, 2.0, 30.0], &[20.0, 5.0, 5.0, 5.0]).unwrap();
        assert_eq!(&[2], schedule.dropped_slots());
        assert_eq!(3, schedule.admitted());
        assert_eq!(4, schedule.requested());
    }

    #[test]
    fn rejects_zero_servers() {
        assert!(ScheduleSimulator::new(0, None, 15.0, 60.0).is_err());
    }
}
