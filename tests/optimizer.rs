mod util;

use clinicsim::optimizer::{Perturbation, DEFAULT_MULTIPLIERS, DEFAULT_OFFSETS};
use clinicsim::*;

fn optimizer(seed: u64) -> Optimizer {
    let base = SimulationConfig::builder().working_hours(3.0).seed(seed).build().unwrap();
    Optimizer::builder().base(base).lo(-2).hi(2).replications(10).build().unwrap()
}

#[test]
fn sweep_finds_cheapest_spacing() {
    let optimizer = optimizer(7);
    let sweep = optimizer.sweep(Parameter::ScheduledSpacing).unwrap();
    let optimum = sweep.optimal().unwrap();

    assert_eq!(5, sweep.rows().len());
    assert!((13.0..=17.0).contains(&optimum.value));
    assert_eq!(optimum.value, optimum.config().scheduled_spacing());
    for row in sweep.rows() {
        assert!(optimum.total_cost() <= row.total_cost, "offset {} is cheaper", row.offset);
    }
    assert_eq!(10, optimum.summary().realizations);
}

#[test]
fn sweeps_are_reproducible() {
    let first = optimizer(3).sweep(Parameter::MeanServiceTime).unwrap();
    let second = optimizer(3).sweep(Parameter::MeanServiceTime).unwrap();
    assert_eq!(first.rows(), second.rows());
}

#[test]
fn spacing_sensitivity_uses_default_offsets() {
    let optimizer = optimizer(7);
    let optimum = optimizer.sweep(Parameter::ScheduledSpacing).unwrap().optimal().unwrap();
    let table = optimizer.sensitivity(&optimum, Parameter::ScheduledSpacing).unwrap();

    assert_eq!(DEFAULT_OFFSETS.len(), table.rows.len());
    assert!(table.skipped.is_empty());
    for (row, offset) in table.rows.iter().zip(DEFAULT_OFFSETS) {
        assert_eq!(Perturbation::Offset(offset), row.perturbation);
        assert_floats_near_equal!(optimum.value + offset, row.value, "perturbed spacing");
        assert_eq!(Metric::ALL.len(), row.deltas.len());
        let waiting = row.delta(Metric::MeanWaitingTime).unwrap();
        assert_floats_near_equal!(
            waiting.perturbed - waiting.optimum,
            waiting.delta,
            "delta is perturbed minus optimum"
        );
    }
}

#[test]
fn working_hours_sensitivity_skips_empty_days() {
    let optimizer = optimizer(2);
    let optimum = optimizer.sweep(Parameter::WorkingHours).unwrap().optimal().unwrap();
    let table = optimizer.sensitivity(&optimum, Parameter::WorkingHours).unwrap();

    assert_eq!(DEFAULT_OFFSETS.len(), table.rows.len() + table.skipped.len());
    for skipped in &table.skipped {
        match skipped.perturbation {
            Perturbation::Offset(offset) => assert!(optimum.value + offset <= 0.0),
            other => panic!("unexpected perturbation {other:?}"),
        }
        assert!(matches!(skipped.error, Error::InvalidConfig { .. }));
    }
}

#[test]
fn cost_sensitivity_covers_every_weight() {
    let optimizer = optimizer(5);
    let optimum = optimizer.sweep(Parameter::ScheduledSpacing).unwrap().optimal().unwrap();
    let table = optimizer.sensitivity(&optimum, Parameter::CostWeights).unwrap();

    assert_eq!(CostWeight::ALL.len() * DEFAULT_MULTIPLIERS.len(), table.rows.len());
    assert_eq!(None, table.optimum_value);
    for row in &table.rows {
        assert_eq!(1, row.deltas.len());
        assert_eq!(Metric::TotalCost, row.deltas[0].metric);
    }
}

#[test]
fn parameters_parse_from_names() {
    assert_eq!(Ok(Parameter::ScheduledSpacing), "scheduled_arrival".parse());
    assert_eq!(Ok(Parameter::MeanServiceTime), "mean_service_time".parse());
    assert!("servers".parse::<Parameter>().is_err());
}

#[test]
fn two_way_sweep_pairs_each_fixed_value() {
    let optimizer = optimizer(11);
    let result = optimizer
        .sweep_2d(Parameter::MeanServiceTime, Parameter::ScheduledSpacing, -1..=1)
        .unwrap();

    assert_eq!(3, result.points.len());
    assert_eq!(3, result.sweeps.len());
    for point in &result.points {
        assert!((13.0..=17.0).contains(&point.optimal_value));
    }
}

#[test]
fn tables_serialize() {
    let optimizer = optimizer(1);
    let sweep = optimizer.sweep(Parameter::ScheduledSpacing).unwrap();
    let optimum = sweep.optimal().unwrap();
    let table = optimizer
        .sensitivity_with_offsets(&optimum, Parameter::ScheduledSpacing, &[-100.0, 1.0])
        .unwrap();

    let rows = serde_json::to_value(sweep.rows()).unwrap();
    assert_eq!(5, rows.as_array().unwrap().len());
    assert!(rows[0]["summary"]["patient_metrics"]["mean_waiting_time"].is_number());

    let table = serde_json::to_value(&table).unwrap();
    assert_eq!("ScheduledSpacing", table["parameter"]);
    assert_eq!(1, table["rows"].as_array().unwrap().len());
    assert_eq!(1, table["skipped"].as_array().unwrap().len());
}
