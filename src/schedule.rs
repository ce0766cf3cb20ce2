use crate::occupancy::OccupancyTrace;
use crate::Result;

use serde::Serialize;

/// An admitted patient's passage through the clinic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Patient {
    /// Position of the patient's request among the day's requested arrivals, sorted by time. This is the nominal
    /// appointment slot the patient is measured against.
    pub slot: usize,
    pub arrival: f64,
    pub start: f64,
    pub end: f64,
}

impl Patient {
    pub fn service_time(&self) -> f64 {
        self.end - self.start
    }

    /// Minutes between the patient's nominal slot time and the start of their service, never negative.
    ///
    /// This is measured from `slot * scheduled_spacing`, not from the actual arrival: a patient who turns up late and
    /// is seen straight away still accrues the minutes they were late.
    pub fn waiting_time(&self, scheduled_spacing: f64) -> f64 {
        (self.start - self.slot as f64 * scheduled_spacing).max(0.0)
    }
}

/// One row of a schedule as handed to rendering and persistence collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatientRecord {
    pub patient: usize,
    pub slot: usize,
    pub arrival: f64,
    pub start: f64,
    pub end: f64,
    pub service_time: f64,
    pub waiting_time: f64,
}

/// A single realization of a clinic day: who asked to come, who was admitted and when they were seen, and who was
/// turned away because the system was full.
///
/// Built once by a [`ScheduleSimulator`] and immutable afterwards. Start times are non-decreasing in admission
/// order and every end time is its start time plus the service duration.
///
/// [`ScheduleSimulator`]: crate::ScheduleSimulator
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    scheduled_spacing: f64,
    working_minutes: f64,
    servers: usize,
    requested: Vec<f64>,
    patients: Vec<Patient>,
    dropped: Vec<usize>,
    idle_time: f64,
    overtime: f64,
}

impl Schedule {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        scheduled_spacing: f64,
        working_minutes: f64,
        servers: usize,
        requested: Vec<f64>,
        patients: Vec<Patient>,
        dropped: Vec<usize>,
        idle_time: f64,
        overtime: f64,
    ) -> Self {
        Self {
            scheduled_spacing,
            working_minutes,
            servers,
            requested,
            patients,
            dropped,
            idle_time,
            overtime,
        }
    }

    pub fn scheduled_spacing(&self) -> f64 {
        self.scheduled_spacing
    }

    pub fn working_minutes(&self) -> f64 {
        self.working_minutes
    }

    pub fn servers(&self) -> usize {
        self.servers
    }

    /// Every requested arrival time, clamped at zero and sorted, including the ones that were dropped.
    pub fn requested_arrivals(&self) -> &[f64] {
        &self.requested
    }

    /// Admitted patients in admission order.
    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    /// Slots of the arrivals that found the system full.
    pub fn dropped_slots(&self) -> &[usize] {
        &self.dropped
    }

    pub fn requested(&self) -> usize {
        self.requested.len()
    }

    pub fn admitted(&self) -> usize {
        self.patients.len()
    }

    pub fn dropped(&self) -> usize {
        self.dropped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Server idle time accumulated at admission: the number of free servers times the gap since the previous
    /// departure, summed over every patient who found a free server.
    pub fn idle_time(&self) -> f64 {
        self.idle_time
    }

    /// Overtime of the last and, with more than one server, second-to-last finishing servers.
    pub fn overtime(&self) -> f64 {
        self.overtime
    }

    /// Time of the last departure, zero for an empty schedule.
    pub fn makespan(&self) -> f64 {
        self.patients.iter().map(|p| p.end).fold(0.0, f64::max)
    }

    pub fn waiting_times(&self) -> Vec<f64> {
        self.patients.iter().map(|p| p.waiting_time(self.scheduled_spacing)).collect()
    }

    pub fn service_times(&self) -> Vec<f64> {
        self.patients.iter().map(Patient::service_time).collect()
    }

    pub fn records(&self) -> Vec<PatientRecord> {
        self.patients
            .iter()
            .enumerate()
            .map(|(patient, p)| PatientRecord {
                patient,
                slot: p.slot,
                arrival: p.arrival,
                start: p.start,
                end: p.end,
                service_time: p.service_time(),
                waiting_time: p.waiting_time(self.scheduled_spacing),
            })
            .collect()
    }

    /// Reconstruct the number-in-system process of this realization.
    ///
    /// # Errors
    ///
    /// Never fails for a schedule produced by a [`ScheduleSimulator`](crate::ScheduleSimulator); the error path
    /// exists for hand-assembled event streams.
    pub fn trace(&self) -> Result<OccupancyTrace> {
        let arrivals: Vec<f64> = self.patients.iter().map(|p| p.arrival).collect();
        let departures: Vec<f64> = self.patients.iter().map(|p| p.end).collect();
        OccupancyTrace::from_events(&arrivals, &departures)
    }
}
