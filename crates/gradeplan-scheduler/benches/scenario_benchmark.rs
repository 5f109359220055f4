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
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use gradeplan_model::{
    calendar::Calendar,
    config::SolveConfig,
    index::DayIndex,
    instance::{Instance, InstanceBuilder},
};
use gradeplan_scheduler::driver::SolverDriver;
use std::hint::black_box;

/// `num_grades` grades sharing `num_lines` lines over `days` days, with a
/// staggered daily demand.
fn build_instance(num_grades: usize, num_lines: usize, days: usize) -> Instance {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid start date");
    let mut builder = InstanceBuilder::new(Calendar::new(start, days));
    let lines: Vec<_> = (0..num_lines)
        .map(|l| builder.add_line(format!("L{}", l + 1), 100))
        .collect();
    for g in 0..num_grades {
        let grade = builder.add_grade(format!("G{}", g + 1));
        builder.set_initial_inventory(grade, 50);
        for (l, &line) in lines.iter().enumerate() {
            if (g + l) % 2 == 0 || num_lines == 1 {
                builder.allow_line(grade, line);
            }
        }
        for d in 0..days {
            if (d + g) % num_grades == 0 {
                builder.set_demand(grade, DayIndex::new(d), 80);
            }
        }
    }
    builder.build().expect("benchmark instance is valid")
}

fn bench_scenarios(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenario_solve");
    group.sample_size(10);

    for &(grades, lines, days) in &[(1, 1, 5), (2, 1, 6), (3, 2, 6)] {
        let instance = build_instance(grades, lines, days);
        let config = SolveConfig::default()
            .with_buffer_days(1)
            .with_worker_count(1)
            .with_time_limit_seconds(10);
        let label = format!("{}g{}l{}d", grades, lines, days);

        group.bench_with_input(BenchmarkId::new("bnb", &label), &instance, |b, instance| {
            b.iter(|| {
                let mut driver = SolverDriver::new(black_box(instance), &config);
                let outcome = driver.solve().expect("benchmark solve succeeds");
                black_box(outcome.objective())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scenarios);
criterion_main!(benches);
