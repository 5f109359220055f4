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

//! # Solution Extraction
//!
//! Turns the best `IncumbentSnapshot` into the schedule a planner reads:
//! the grade running on each line per day, maximal run segments, inventory,
//! stockout and production series, and transition counts.

use crate::snapshot::IncumbentSnapshot;
use gradeplan_core::utils::grid::DenseGrid;
use gradeplan_model::{
    index::{DayIndex, GradeIndex, LineIndex},
    instance::Instance,
};

/// A maximal stretch of consecutive days running one grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSegment {
    pub line: LineIndex,
    pub grade: GradeIndex,
    pub start: DayIndex,
    /// Inclusive.
    pub end: DayIndex,
}

impl RunSegment {
    #[inline]
    pub fn days(&self) -> usize {
        self.end.get() - self.start.get() + 1
    }
}

impl std::fmt::Display for RunSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RunSegment({} on {}, days {}..={})",
            self.grade,
            self.line,
            self.start.get(),
            self.end.get()
        )
    }
}

/// Splits a daily grade sequence into maximal runs `(grade, start, end)`,
/// `end` inclusive, in day order. Idle days separate runs.
pub fn segment_runs(daily: &[Option<GradeIndex>]) -> Vec<(GradeIndex, DayIndex, DayIndex)> {
    let mut runs = Vec::new();
    let mut current: Option<(GradeIndex, usize)> = None;
    for (day, &grade) in daily.iter().enumerate() {
        match (current, grade) {
            (Some((running, _)), Some(g)) if running == g => {}
            (Some((running, start)), _) => {
                runs.push((running, DayIndex::new(start), DayIndex::new(day - 1)));
                current = grade.map(|g| (g, day));
            }
            (None, _) => current = grade.map(|g| (g, day)),
        }
    }
    if let Some((running, start)) = current {
        runs.push((running, DayIndex::new(start), DayIndex::new(daily.len() - 1)));
    }
    runs
}

/// Counts the days `d > 0` where `d - 1` and `d` are both active with
/// different grades.
pub fn count_transitions(daily: &[Option<GradeIndex>]) -> u64 {
    daily
        .windows(2)
        .filter(|pair| matches!((pair[0], pair[1]), (Some(a), Some(b)) if a != b))
        .count() as u64
}

/// A day where inventory left the `[min_inventory, max_inventory]` band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryViolation {
    pub grade: GradeIndex,
    /// Day boundary, `1..=num_days`.
    pub day: DayIndex,
    pub inventory: i64,
    pub min_inventory: i64,
    /// `None` when the grade has no upper bound.
    pub max_inventory: Option<i64>,
}

/// The schedule read out of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSchedule {
    num_days: usize,
    daily: DenseGrid<Option<GradeIndex>>, // num_lines x num_days
    runs: Vec<RunSegment>,
    inventory: DenseGrid<i64>,  // num_grades x (num_days + 1)
    stockout: DenseGrid<i64>,   // num_grades x num_days
    production: DenseGrid<i64>, // num_grades x num_days, summed over lines
    transitions: Vec<u64>,      // per line
}

impl ExtractedSchedule {
    #[inline]
    pub fn num_days(&self) -> usize {
        self.num_days
    }

    /// The grade running on `line` on `day`, `None` if idle.
    #[inline]
    pub fn grade_on(&self, line: LineIndex, day: DayIndex) -> Option<GradeIndex> {
        *self.daily.get(line.get(), day.get())
    }

    #[inline]
    pub fn daily(&self, line: LineIndex) -> &[Option<GradeIndex>] {
        self.daily.row(line.get())
    }

    /// Every run, grouped by line and in day order within a line.
    #[inline]
    pub fn runs(&self) -> &[RunSegment] {
        &self.runs
    }

    pub fn runs_on(&self, line: LineIndex) -> impl Iterator<Item = &RunSegment> + '_ {
        self.runs.iter().filter(move |run| run.line == line)
    }

    /// Inventory series of `grade`, `num_days + 1` entries.
    #[inline]
    pub fn inventory(&self, grade: GradeIndex) -> &[i64] {
        self.inventory.row(grade.get())
    }

    #[inline]
    pub fn stockout(&self, grade: GradeIndex) -> &[i64] {
        self.stockout.row(grade.get())
    }

    #[inline]
    pub fn production(&self, grade: GradeIndex) -> &[i64] {
        self.production.row(grade.get())
    }

    #[inline]
    pub fn transitions(&self, line: LineIndex) -> u64 {
        self.transitions[line.get()]
    }

    #[inline]
    pub fn total_transitions(&self) -> u64 {
        self.transitions.iter().sum()
    }

    pub fn total_stockout(&self) -> i64 {
        self.stockout.as_slice().iter().sum()
    }
}

/// Reads schedules out of snapshots of one instance.
pub struct SolutionExtractor<'a> {
    instance: &'a Instance,
}

impl<'a> SolutionExtractor<'a> {
    #[inline]
    pub fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    pub fn extract(&self, snapshot: &IncumbentSnapshot) -> ExtractedSchedule {
        let num_days = snapshot.num_days();
        let num_grades = snapshot.num_grades();
        let num_lines = snapshot.num_lines();

        let mut daily = DenseGrid::filled(num_lines, num_days, None);
        let mut runs = Vec::new();
        let mut transitions = Vec::with_capacity(num_lines);
        for line in LineIndex::range(num_lines) {
            let grades = snapshot.daily_grades(line);
            for (day, grade) in grades.iter().enumerate() {
                daily.set(line.get(), day, *grade);
            }
            runs.extend(
                segment_runs(&grades)
                    .into_iter()
                    .map(|(grade, start, end)| RunSegment {
                        line,
                        grade,
                        start,
                        end,
                    }),
            );
            transitions.push(count_transitions(&grades));
        }

        let mut inventory = DenseGrid::filled(num_grades, num_days + 1, 0i64);
        let mut stockout = DenseGrid::filled(num_grades, num_days, 0i64);
        let mut production = DenseGrid::filled(num_grades, num_days, 0i64);
        for grade in GradeIndex::range(num_grades) {
            for day in DayIndex::range(num_days + 1) {
                inventory.set(grade.get(), day.get(), snapshot.inventory(grade, day));
            }
            for day in DayIndex::range(num_days) {
                stockout.set(grade.get(), day.get(), snapshot.stockout(grade, day));
                let produced = self
                    .instance
                    .grade(grade)
                    .allowed_lines()
                    .iter()
                    .map(|&line| snapshot.production(grade, line, day))
                    .sum::<i64>();
                production.set(grade.get(), day.get(), produced);
            }
        }

        ExtractedSchedule {
            num_days,
            daily,
            runs,
            inventory,
            stockout,
            production,
            transitions,
        }
    }

    /// Day boundaries `1..=num_days` where inventory is outside the grade's
    /// band. Only non-empty under the advisory bound policy.
    pub fn inventory_violations(&self, schedule: &ExtractedSchedule) -> Vec<InventoryViolation> {
        let mut violations = Vec::new();
        for grade_index in self.instance.grade_indices() {
            let grade = self.instance.grade(grade_index);
            let max_inventory = grade.has_max_inventory().then(|| grade.max_inventory());
            for (day, &inventory) in schedule.inventory(grade_index).iter().enumerate().skip(1) {
                let below = inventory < grade.min_inventory();
                let above = max_inventory.is_some_and(|max| inventory > max);
                if below || above {
                    violations.push(InventoryViolation {
                        grade: grade_index,
                        day: DayIndex::new(day),
                        inventory,
                        min_inventory: grade.min_inventory(),
                        max_inventory,
                    });
                }
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn g(i: usize) -> Option<GradeIndex> {
        Some(GradeIndex::new(i))
    }

    fn d(i: usize) -> DayIndex {
        DayIndex::new(i)
    }

    #[test]
    fn test_segment_runs_splits_on_switch_and_idle() {
        let daily = vec![g(0), g(0), g(1), None, g(1), g(1), None];
        let runs = segment_runs(&daily);
        assert_eq!(
            runs,
            vec![
                (GradeIndex::new(0), d(0), d(1)),
                (GradeIndex::new(1), d(2), d(2)),
                (GradeIndex::new(1), d(4), d(5)),
            ]
        );
    }

    #[test]
    fn test_segment_runs_empty_and_idle() {
        assert!(segment_runs(&[]).is_empty());
        assert!(segment_runs(&[None, None]).is_empty());
        assert_eq!(segment_runs(&[g(2)]), vec![(GradeIndex::new(2), d(0), d(0))]);
    }

    #[test]
    fn test_count_transitions_ignores_idle_days() {
        assert_eq!(count_transitions(&[g(0), g(1), g(1), g(0)]), 2);
        assert_eq!(count_transitions(&[g(0), None, g(1)]), 0);
        assert_eq!(count_transitions(&[g(0), g(0)]), 0);
        assert_eq!(count_transitions(&[]), 0);
    }

    fn daily_strategy() -> impl Strategy<Value = Vec<Option<GradeIndex>>> {
        prop::collection::vec(prop::option::of(0usize..3), 0..40)
            .prop_map(|days| days.into_iter().map(|g| g.map(GradeIndex::new)).collect())
    }

    proptest! {
        #[test]
        fn test_runs_cover_exactly_the_active_days(daily in daily_strategy()) {
            let runs = segment_runs(&daily);
            let mut rebuilt = vec![None; daily.len()];
            for &(grade, start, end) in &runs {
                prop_assert!(start <= end);
                for day in start.get()..=end.get() {
                    prop_assert!(rebuilt[day].is_none());
                    rebuilt[day] = Some(grade);
                }
            }
            prop_assert_eq!(rebuilt, daily);
        }

        #[test]
        fn test_runs_are_maximal(daily in daily_strategy()) {
            let runs = segment_runs(&daily);
            for pair in runs.windows(2) {
                let (first_grade, _, first_end) = pair[0];
                let (second_grade, second_start, _) = pair[1];
                prop_assert!(first_end < second_start);
                if first_end.get() + 1 == second_start.get() {
                    prop_assert_ne!(first_grade, second_grade);
                }
            }
        }

        #[test]
        fn test_transitions_are_adjacent_runs(daily in daily_strategy()) {
            let runs = segment_runs(&daily);
            let adjacent = runs
                .windows(2)
                .filter(|pair| pair[0].2.get() + 1 == pair[1].1.get())
                .count() as u64;
            prop_assert_eq!(count_transitions(&daily), adjacent);
        }
    }
}
