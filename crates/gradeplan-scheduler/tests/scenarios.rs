// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use chrono::NaiveDate;
use gradeplan_model::{
    calendar::Calendar,
    config::{CarryOverPolicy, InventoryBoundPolicy, SolveConfig},
    index::{DayIndex, GradeIndex, LineIndex},
    instance::{InProgressRun, Instance, InstanceBuilder},
};
use gradeplan_scheduler::{
    driver::{ScheduleOutcome, SolverDriver},
    encoding::ConstraintFamily,
    extract::{ExtractedSchedule, SolutionExtractor},
    logging,
    objective::ObjectiveFunction,
    plan,
    result::ResultStatus,
};
use gradeplan_search::result::SolveStatus;
use rstest::rstest;
use std::time::Duration;

fn calendar(days: usize) -> Calendar {
    Calendar::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), days)
}

fn config() -> SolveConfig {
    SolveConfig::default()
        .with_buffer_days(0)
        .with_worker_count(4)
        .with_time_limit_seconds(60)
}

fn day(i: usize) -> DayIndex {
    DayIndex::new(i)
}

/// One grade on one line: capacity 100, five days of demand 50, no initial
/// stock, at most 50 on hand and 50 required at the close.
fn scenario_a() -> (InstanceBuilder, GradeIndex, LineIndex) {
    let mut builder = InstanceBuilder::new(calendar(5));
    let a = builder.add_grade("A");
    let line = builder.add_line("L1", 100);
    builder
        .allow_line(a, line)
        .set_inventory_bounds(a, 0, 50)
        .set_min_closing_inventory(a, 50);
    for d in 0..5 {
        builder.set_demand(a, day(d), 50);
    }
    (builder, a, line)
}

fn solve(instance: &Instance, config: &SolveConfig) -> ScheduleOutcome {
    logging::init_test();
    let mut driver = SolverDriver::new(instance, config);
    match driver.solve() {
        Ok(outcome) => outcome,
        Err(err) => panic!("expected a finished solve, got {:?}", err),
    }
}

fn extract(instance: &Instance, outcome: &ScheduleOutcome) -> ExtractedSchedule {
    match outcome.best() {
        Some(best) => SolutionExtractor::new(instance).extract(best),
        None => panic!("expected a schedule, got status {}", outcome.status()),
    }
}

/// Checks every structural property a returned schedule must have.
fn assert_schedule_properties(
    instance: &Instance,
    config: &SolveConfig,
    outcome: &ScheduleOutcome,
) {
    let best = match outcome.best() {
        Some(best) => best,
        None => panic!("expected a schedule, got status {}", outcome.status()),
    };
    let schedule = SolutionExtractor::new(instance).extract(best);
    let num_days = schedule.num_days();
    let core_days = instance.num_core_days();

    for grade in instance.grade_indices() {
        let inventory = schedule.inventory(grade);
        let produced = schedule.production(grade);
        let stockout = schedule.stockout(grade);
        assert_eq!(inventory[0], instance.grade(grade).initial_inventory());
        for d in 0..num_days {
            let demand = instance.demand(grade, day(d));
            let available = inventory[d] + produced[d];
            let supplied = available.min(demand);
            assert_eq!(stockout[d], demand - supplied, "stockout of {} on day {}", grade, d);
            assert_eq!(inventory[d + 1], available - supplied, "balance of {} on day {}", grade, d);
            assert!(inventory[d + 1] >= 0);
        }
        assert!(inventory[num_days] >= instance.grade(grade).min_closing_inventory());
    }

    for line_index in instance.line_indices() {
        let line = instance.line(line_index);
        for d in 0..num_days {
            let active = instance
                .grade_indices()
                .filter(|&grade| best.is_producing(grade, line_index, day(d)))
                .count();
            assert!(active <= 1, "{} runs {} grades on day {}", line_index, active, d);
            if line.is_shutdown(day(d)) {
                assert_eq!(schedule.grade_on(line_index, day(d)), None);
            }
            for &grade in instance.grades_on_line(line_index) {
                let quantity = best.production(grade, line_index, day(d));
                if !best.is_producing(grade, line_index, day(d)) {
                    assert_eq!(quantity, 0);
                } else if d < core_days {
                    assert_eq!(quantity, line.capacity());
                } else {
                    assert!((0..=line.capacity()).contains(&quantity));
                }
            }
        }

        let carried = line.in_progress().map(|run| run.grade());
        for &grade in instance.grades_on_line(line_index) {
            let params = instance.params(grade, line_index);
            let runs: Vec<_> = schedule
                .runs_on(line_index)
                .filter(|run| run.grade == grade)
                .collect();
            for run in &runs {
                let continues_carried = run.start.is_zero() && carried == Some(grade);
                if !continues_carried {
                    assert!(run.days() >= params.min_run_days(), "{} is too short", run);
                }
                assert!(run.days() <= params.max_run_days_within(num_days), "{} is too long", run);
            }
            if !params.rerun_allowed() {
                assert!(runs.len() <= 1, "{} reruns on {}", grade, line_index);
            }
            if let Some(forced) = params.forced_start() {
                assert_eq!(schedule.grade_on(line_index, forced), Some(grade));
            }
        }
    }

    let objective = ObjectiveFunction::from_config(config);
    assert_eq!(objective.evaluate(best), best.objective());
}

#[rstest]
#[case::single_worker(1)]
#[case::portfolio(4)]
fn test_scenario_a_alternates_production(#[case] workers: usize) {
    let (builder, a, _) = scenario_a();
    let instance = builder.build().unwrap();
    let config = config().with_worker_count(workers);

    let outcome = solve(&instance, &config);
    assert_eq!(outcome.status(), SolveStatus::Optimal);
    assert_eq!(outcome.objective(), Some(0));
    let schedule = extract(&instance, &outcome);
    assert_eq!(schedule.inventory(a), &[0, 50, 0, 50, 0, 50]);
    assert_eq!(schedule.total_stockout(), 0);
    assert_schedule_properties(&instance, &config, &outcome);
}

#[test]
fn test_scenario_a_report() {
    let (builder, _, _) = scenario_a();
    let instance = builder.build().unwrap();

    let result = plan(&instance, &config()).unwrap();
    assert_eq!(result.status, ResultStatus::Optimal);
    assert_eq!(result.objective, Some(0));
    assert_eq!(result.inventory_series[0].values, vec![0, 50, 0, 50, 0, 50]);
    assert_eq!(result.production_series[0].values, vec![100, 0, 100, 0, 100]);
    assert_eq!(result.schedule[0].runs.len(), 3);
    assert_eq!(
        result.schedule[0].runs[1].start_date,
        NaiveDate::from_ymd_opt(2025, 1, 3)
    );
    assert_eq!(result.transition_counts.total, 0);
    assert!(result.inventory_violations.is_empty());
    assert!(result.diagnostics.is_none());
    assert!(!result.incumbents.is_empty());

    let json: serde_json::Value = serde_json::from_str(&result.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["status"], "OPTIMAL");
    assert_eq!(json["schedule"][0]["daily"][1]["grade"], serde_json::Value::Null);
    assert_eq!(json["schedule"][0]["daily"][0]["date"], "2025-01-01");
}

#[test]
fn test_scenario_b_minimum_run_beyond_horizon_is_infeasible() {
    let (mut builder, a, line) = scenario_a();
    builder.set_min_run_days(a, line, 10);
    let instance = builder.build().unwrap();

    let result = plan(&instance, &config()).unwrap();
    assert_eq!(result.status, ResultStatus::Infeasible);
    assert_eq!(result.objective, None);
    let diagnostics = match &result.diagnostics {
        Some(diagnostics) => diagnostics,
        None => panic!("expected diagnostics, got none"),
    };
    assert!(diagnostics.suspects_family(ConstraintFamily::MinRun));
}

#[test]
fn test_scenario_c_full_shutdown_stocks_out() {
    let (mut builder, a, line) = scenario_a();
    builder.set_min_closing_inventory(a, 0);
    for d in 0..5 {
        builder.add_shutdown_day(line, day(d));
    }
    let instance = builder.build().unwrap();
    let config = config();

    let outcome = solve(&instance, &config);
    assert_eq!(outcome.status(), SolveStatus::Optimal);
    assert_eq!(outcome.objective(), Some(10 * 250));
    let schedule = extract(&instance, &outcome);
    assert_eq!(schedule.total_stockout(), instance.total_demand(a));
    assert_eq!(schedule.inventory(a), &[0; 6]);
    assert!(schedule.runs().is_empty());
    assert_schedule_properties(&instance, &config, &outcome);
}

/// Grades A and B on one line where B may not directly follow A.
fn scenario_d(with_intermediate: bool) -> (Instance, Vec<GradeIndex>, LineIndex) {
    let mut builder = InstanceBuilder::new(calendar(5));
    let a = builder.add_grade("A");
    let b = builder.add_grade("B");
    let line = builder.add_line("L1", 100);
    builder
        .allow_line(a, line)
        .allow_line(b, line)
        .restrict_transitions(line, a)
        .set_forced_start(a, line, day(0));
    builder.set_demand(a, day(0), 40).set_demand(b, day(4), 60);

    let mut grades = vec![a, b];
    if with_intermediate {
        let c = builder.add_grade("C");
        builder
            .allow_line(c, line)
            .allow_transition(line, a, c)
            .set_forced_start(b, line, day(2));
        builder.set_demand(c, day(1), 30);
        grades.push(c);
    } else {
        builder.set_forced_start(b, line, day(1));
    }
    (builder.build().unwrap(), grades, line)
}

#[test]
fn test_scenario_d_forbidden_adjacent_forced_starts() {
    let (instance, _, _) = scenario_d(false);

    let result = plan(&instance, &config()).unwrap();
    assert_eq!(result.status, ResultStatus::Infeasible);
    let diagnostics = match &result.diagnostics {
        Some(diagnostics) => diagnostics,
        None => panic!("expected diagnostics, got none"),
    };
    assert!(diagnostics.suspects_family(ConstraintFamily::Transition));
}

#[rstest]
#[case::seed_42(42)]
#[case::seed_7(7)]
fn test_scenario_d_routes_through_intermediate_grade(#[case] seed: u64) {
    let (instance, grades, line) = scenario_d(true);
    let (a, b) = (grades[0], grades[1]);
    let config = config().with_random_seed(seed);

    let outcome = solve(&instance, &config);
    assert_eq!(outcome.status(), SolveStatus::Optimal);
    let schedule = extract(&instance, &outcome);
    for pair in schedule.daily(line).windows(2) {
        assert_ne!((pair[0], pair[1]), (Some(a), Some(b)));
    }
    assert_eq!(schedule.grade_on(line, day(0)), Some(a));
    assert_eq!(schedule.grade_on(line, day(2)), Some(b));
    assert_schedule_properties(&instance, &config, &outcome);
}

#[test]
fn test_equal_seeds_give_equal_objectives() {
    let (instance, _, _) = scenario_d(true);
    let config = config().with_random_seed(5);

    let first = solve(&instance, &config);
    let second = solve(&instance, &config);
    assert_eq!(first.status(), SolveStatus::Optimal);
    assert_eq!(first.status(), second.status());
    assert_eq!(first.objective(), second.objective());
}

/// Two lines, three grades, buffer days and most side constraints at once.
fn mixed_instance() -> Instance {
    let mut builder = InstanceBuilder::new(calendar(6));
    let a = builder.add_grade("A");
    let b = builder.add_grade("B");
    let c = builder.add_grade("C");
    let l1 = builder.add_line("L1", 30);
    let l2 = builder.add_line("L2", 20);
    builder
        .allow_line(a, l1)
        .allow_line(b, l1)
        .allow_line(b, l2)
        .allow_line(c, l2)
        .set_initial_inventory(a, 20)
        .set_initial_inventory(b, 10)
        .set_inventory_bounds(a, 0, 90)
        .set_min_run_days(a, l1, 2)
        .set_max_run_days(a, l1, 3)
        .set_min_run_days(b, l1, 2)
        .set_rerun_allowed(c, l2, false)
        .set_forced_start(b, l2, day(1))
        .add_shutdown_day(l2, day(4));
    for d in 0..6 {
        builder.set_demand(a, day(d), 15);
        builder.set_demand(b, day(d), 10);
    }
    builder.set_demand(c, day(3), 20).set_demand(c, day(5), 20);
    builder.build().unwrap()
}

#[test]
fn test_mixed_instance_schedule_properties() {
    let instance = mixed_instance();
    let config = config().with_buffer_days(2).with_time_limit_seconds(5);

    let outcome = solve(&instance, &config);
    assert!(
        matches!(outcome.status(), SolveStatus::Optimal | SolveStatus::Feasible),
        "expected a schedule, got {}",
        outcome.status()
    );
    assert_eq!(outcome.num_days(), 8);
    let objectives: Vec<i64> = outcome.incumbents().iter().map(|s| s.objective()).collect();
    assert!(objectives.windows(2).all(|w| w[0] > w[1]));
    assert!(outcome.incumbents().windows(2).all(|w| w[0].elapsed() <= w[1].elapsed()));
    assert_schedule_properties(&instance, &config, &outcome);
}

/// Stock after day 0 can reach 50 at most, below a minimum of 60.
fn unreachable_band() -> Instance {
    let (mut builder, a, _) = scenario_a();
    builder
        .set_inventory_bounds(a, 60, 200)
        .set_min_closing_inventory(a, 0);
    builder.build().unwrap()
}

#[test]
fn test_hard_inventory_band_is_enforced() {
    let instance = unreachable_band();
    let config = config().with_inventory_bounds(InventoryBoundPolicy::Hard);

    let result = plan(&instance, &config).unwrap();
    assert_eq!(result.status, ResultStatus::Infeasible);
    let diagnostics = match &result.diagnostics {
        Some(diagnostics) => diagnostics,
        None => panic!("expected diagnostics, got none"),
    };
    assert!(diagnostics.suspects_family(ConstraintFamily::InventoryBounds));
}

#[test]
fn test_advisory_inventory_band_reports_violations() {
    let instance = unreachable_band();
    let config = config().with_inventory_bounds(InventoryBoundPolicy::Advisory);

    let result = plan(&instance, &config).unwrap();
    assert_eq!(result.status, ResultStatus::Optimal);
    assert_eq!(result.objective, Some(0));
    assert!(!result.inventory_violations.is_empty());
    assert!(result.inventory_violations.iter().any(|v| v.day == 1));
    assert!(result.inventory_violations.iter().all(|v| v.inventory < 60 || v.inventory > 200));
}

/// A carried run of A (one day left, one day done, minimum four) blocks B,
/// which has demand from day 1.
fn carried_run_instance() -> (Instance, GradeIndex, GradeIndex, LineIndex) {
    let mut builder = InstanceBuilder::new(calendar(5));
    let a = builder.add_grade("A");
    let b = builder.add_grade("B");
    let line = builder.add_line("L1", 10);
    builder
        .allow_line(a, line)
        .allow_line(b, line)
        .set_min_run_days(a, line, 4)
        .set_in_progress(line, InProgressRun::new(a, 1).with_elapsed_days(1));
    for d in 1..5 {
        builder.set_demand(b, day(d), 10);
    }
    (builder.build().unwrap(), a, b, line)
}

#[rstest]
#[case::remaining(CarryOverPolicy::Remaining, 1, 10)]
#[case::full_run(CarryOverPolicy::FullRun, 3, 10 + 2 * 10 * 10)]
fn test_carry_over_policy_pins_leading_days(
    #[case] policy: CarryOverPolicy,
    #[case] pinned: usize,
    #[case] expected_objective: i64,
) {
    let (instance, a, b, line) = carried_run_instance();
    let config = config().with_carry_over(policy);

    let outcome = solve(&instance, &config);
    assert_eq!(outcome.status(), SolveStatus::Optimal);
    assert_eq!(outcome.objective(), Some(expected_objective));
    let schedule = extract(&instance, &outcome);
    for d in 0..pinned {
        assert_eq!(schedule.grade_on(line, day(d)), Some(a));
    }
    assert_eq!(schedule.grade_on(line, day(pinned)), Some(b));
    assert_schedule_properties(&instance, &config, &outcome);
}

#[test]
fn test_overlong_carried_run_stops_with_its_pin() {
    let mut builder = InstanceBuilder::new(calendar(8));
    let a = builder.add_grade("A");
    let line = builder.add_line("L1", 10);
    builder
        .allow_line(a, line)
        .set_max_run_days(a, line, 2)
        .set_in_progress(line, InProgressRun::new(a, 4));
    for d in 0..8 {
        builder.set_demand(a, day(d), 10);
    }
    let instance = builder.build().unwrap();
    let config = config();

    let outcome = solve(&instance, &config);
    assert_eq!(outcome.status(), SolveStatus::Optimal);
    let schedule = extract(&instance, &outcome);
    for d in 0..4 {
        assert_eq!(schedule.grade_on(line, day(d)), Some(a));
    }
    assert_eq!(schedule.grade_on(line, day(4)), None);
    let runs: Vec<_> = schedule.runs_on(line).collect();
    assert_eq!(runs[0].days(), 4);
    for run in &runs[1..] {
        assert!(run.days() <= 2, "{} is too long", run);
    }
    // Day 4 and one of days 5..=7 stock out.
    assert_eq!(outcome.objective(), Some(2 * 10 * 10));
}

/// Nothing is demanded, but 30 units must be on hand at the close and never
/// more than 30 before it.
fn partial_batch_instance() -> (Instance, GradeIndex) {
    let mut builder = InstanceBuilder::new(calendar(2));
    let a = builder.add_grade("A");
    let line = builder.add_line("L1", 100);
    builder
        .allow_line(a, line)
        .set_inventory_bounds(a, 0, 30)
        .set_min_closing_inventory(a, 30);
    (builder.build().unwrap(), a)
}

#[test]
fn test_core_days_cannot_produce_partial_batches() {
    let (instance, _) = partial_batch_instance();

    let outcome = solve(&instance, &config());
    assert_eq!(outcome.status(), SolveStatus::Infeasible);
    assert!(outcome.best().is_none());
}

#[test]
fn test_buffer_day_produces_partial_batch() {
    let (instance, a) = partial_batch_instance();
    let config = config().with_buffer_days(1);

    let outcome = solve(&instance, &config);
    assert_eq!(outcome.status(), SolveStatus::Optimal);
    assert_eq!(outcome.objective(), Some(0));
    let schedule = extract(&instance, &outcome);
    assert_eq!(schedule.production(a), &[0, 0, 30]);
    assert_eq!(schedule.inventory(a), &[0, 0, 0, 30]);
    assert_schedule_properties(&instance, &config, &outcome);
}

#[test]
fn test_zero_deadline_reports_unknown() {
    let (builder, _, _) = scenario_a();
    let instance = builder.build().unwrap();
    let config = config();

    let mut driver = SolverDriver::new(&instance, &config).with_time_limit(Duration::ZERO);
    let outcome = match driver.solve() {
        Ok(outcome) => outcome,
        Err(err) => panic!("expected a finished solve, got {:?}", err),
    };
    assert_eq!(outcome.status(), SolveStatus::Unknown);
    assert!(outcome.best().is_none());
    assert!(outcome.diagnostics().is_none());
}
