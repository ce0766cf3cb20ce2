mod util;

use clinicsim::distribution::Degenerate;
use clinicsim::*;

/// A one-hour day of four punctual patients booked 15 minutes apart, every service taking exactly `service` minutes.
fn deterministic_day(service: f64, queue_capacity: Option<usize>) -> SimulationConfig {
    SimulationConfig::builder()
        .working_hours(1.0)
        .scheduled_spacing(15.0)
        .mean_service_time(service)
        .arrival_deviation(Degenerate::new(0.0).unwrap().into())
        .service_model(ServiceModel::Degenerate)
        .patients(4)
        .maybe_queue_capacity(queue_capacity)
        .seed(0)
        .build()
        .unwrap()
}

fn single_day(config: SimulationConfig) -> (Schedule, Summary) {
    let mut simulation = Simulation::new(config);
    simulation.run(1, None).unwrap();
    let schedule = simulation.realizations()[0].schedule().clone();
    let summary = simulation.summarize().unwrap().clone();
    (schedule, summary)
}

#[test]
fn idle_free_day_has_no_waiting() {
    let (schedule, summary) = single_day(deterministic_day(15.0, None));

    assert_eq!(&[0.0, 15.0, 30.0, 45.0], schedule.requested_arrivals());
    assert_eq!(vec![0.0; 4], schedule.waiting_times());
    assert_eq!(0.0, schedule.idle_time());
    assert_eq!(0.0, schedule.overtime());
    assert_eq!(60.0, schedule.makespan());

    assert_eq!(0.0, summary.patient_metrics.mean_waiting_time);
    assert_eq!(0, summary.patient_metrics.excessive_waits);
    assert_eq!(0.0, summary.averages.mean_idle_time);
    assert_eq!(0.0, summary.averages.mean_overtime);
    assert_floats_near_equal!(100.0, summary.system_metrics.utilization, "server should never be idle");
    assert_eq!(0.0, summary.total_cost());
}

#[test]
fn saturated_day_waits_grow() {
    let (schedule, summary) = single_day(deterministic_day(30.0, None));

    assert_eq!(vec![0.0, 15.0, 30.0, 45.0], schedule.waiting_times());
    let starts: Vec<f64> = schedule.patients().iter().map(|p| p.start).collect();
    assert_eq!(vec![0.0, 30.0, 60.0, 90.0], starts);
    assert!(schedule.overtime() > 0.0);
    assert_eq!(60.0, schedule.overtime());

    assert_floats_near_equal!(22.5, summary.patient_metrics.mean_waiting_time, "pooled mean waiting time");
    assert_floats_near_equal!(60.0, summary.averages.mean_overtime, "overtime past the one-hour day");
    assert_eq!(2, summary.patient_metrics.excessive_waits);
}

#[test]
fn loss_system_drops_arrivals_finding_server_busy() {
    let (schedule, summary) = single_day(deterministic_day(30.0, Some(0)));

    assert_eq!(4, schedule.requested());
    assert_eq!(2, schedule.admitted());
    assert!(schedule.admitted() < schedule.requested());
    assert_eq!(&[1, 3], schedule.dropped_slots());
    let slots: Vec<usize> = schedule.patients().iter().map(|p| p.slot).collect();
    assert_eq!(vec![0, 2], slots);

    // dropped patients never reach the waiting statistics
    assert_eq!(vec![0.0, 0.0], schedule.waiting_times());
    assert_eq!((4, 2, 2), (summary.requested, summary.admitted, summary.dropped));
    assert_floats_near_equal!(0.5, summary.loss_rate, "half of the requests were lost");
    assert_floats_near_equal!(4.0 / 60.0, summary.system_metrics.throughput, "booked patients per minute");
}

#[test]
fn identical_seeds_reproduce_summaries() {
    let config = SimulationConfig::builder().seed(123).build().unwrap();

    let mut first = Simulation::new(config.clone());
    first.run(50, None).unwrap();
    let mut second = Simulation::new(config);
    second.run(50, None).unwrap();

    assert_eq!(first.realizations(), second.realizations());
    let (first, second) = (first.summarize().unwrap(), second.summarize().unwrap());
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(first).unwrap(),
        serde_json::to_string(second).unwrap()
    );
}

#[test]
fn multi_server_clinic_shares_queue() {
    let config = SimulationConfig::builder()
        .working_hours(1.0)
        .scheduled_spacing(0.0)
        .mean_service_time(20.0)
        .arrival_deviation(Degenerate::new(0.0).unwrap().into())
        .service_model(ServiceModel::Degenerate)
        .servers(2)
        .queue_capacity(2)
        .patients(5)
        .build()
        .unwrap();
    let (schedule, summary) = single_day(config);

    // five patients at once: two start, two wait, one is turned away
    assert_eq!(&[4], schedule.dropped_slots());
    let starts: Vec<f64> = schedule.patients().iter().map(|p| p.start).collect();
    assert_eq!(vec![0.0, 0.0, 20.0, 20.0], starts);
    assert_eq!(40.0, schedule.makespan());
    assert_eq!(0.0, schedule.overtime());

    // two waiting for 20 of the 40 minutes
    assert_floats_near_equal!(1.0, summary.system_metrics.mean_queue_length, "time-average queue");
    assert_floats_near_equal!(3.0, summary.system_metrics.mean_occupancy, "time-average occupancy");
}

#[test]
fn records_serialize_for_rendering() {
    let (schedule, _) = single_day(deterministic_day(30.0, None));
    let records = serde_json::to_value(schedule.records()).unwrap();

    assert_eq!(4, records.as_array().unwrap().len());
    assert_eq!(3, records[3]["patient"]);
    assert_eq!(45.0, records[3]["waiting_time"]);
    assert_eq!(90.0, records[3]["start"]);
}
