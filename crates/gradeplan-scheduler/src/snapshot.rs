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

//! Immutable copies of improving solutions.
//!
//! The search reports every strict improvement through an
//! `ImprovementCallback`. `IncumbentRecorder` turns each one into an
//! `IncumbentSnapshot` holding the plain schedule values, so the log stays
//! readable after the model is gone.

use crate::encoding::{Resolved, ScheduleEncoding};
use gradeplan_core::utils::grid::DenseGrid;
use gradeplan_model::index::{DayIndex, GradeIndex, LineIndex};
use gradeplan_search::{assignment::Assignment, incumbent::ImprovementCallback, index::VarId};
use std::time::Duration;

/// The values of one improving solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncumbentSnapshot {
    objective: i64,
    elapsed: Duration,
    num_grades: usize,
    num_lines: usize,
    num_days: usize,
    production: Vec<i64>,     // (grade, line, day), day fastest
    is_producing: Vec<bool>,  // (grade, line, day), day fastest
    inventory: DenseGrid<i64>, // num_grades x (num_days + 1)
    stockout: DenseGrid<i64>,  // num_grades x num_days
}

impl IncumbentSnapshot {
    #[inline]
    pub fn objective(&self) -> i64 {
        self.objective
    }

    /// Time since the search started.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[inline]
    pub fn num_grades(&self) -> usize {
        self.num_grades
    }

    #[inline]
    pub fn num_lines(&self) -> usize {
        self.num_lines
    }

    #[inline]
    pub fn num_days(&self) -> usize {
        self.num_days
    }

    #[inline]
    pub fn production(&self, grade: GradeIndex, line: LineIndex, day: DayIndex) -> i64 {
        self.production[self.cell(grade, line, day)]
    }

    #[inline]
    pub fn is_producing(&self, grade: GradeIndex, line: LineIndex, day: DayIndex) -> bool {
        self.is_producing[self.cell(grade, line, day)]
    }

    /// Stock at the start of `day`, `0..=num_days`.
    #[inline]
    pub fn inventory(&self, grade: GradeIndex, day: DayIndex) -> i64 {
        *self.inventory.get(grade.get(), day.get())
    }

    #[inline]
    pub fn stockout(&self, grade: GradeIndex, day: DayIndex) -> i64 {
        *self.stockout.get(grade.get(), day.get())
    }

    /// The grade active on `line` on `day`, if any.
    pub fn active_grade(&self, line: LineIndex, day: DayIndex) -> Option<GradeIndex> {
        GradeIndex::range(self.num_grades).find(|&grade| self.is_producing(grade, line, day))
    }

    /// The active grade of every day on `line`.
    pub fn daily_grades(&self, line: LineIndex) -> Vec<Option<GradeIndex>> {
        DayIndex::range(self.num_days)
            .map(|day| self.active_grade(line, day))
            .collect()
    }

    #[inline]
    fn cell(&self, grade: GradeIndex, line: LineIndex, day: DayIndex) -> usize {
        debug_assert!(
            grade.get() < self.num_grades,
            "called `IncumbentSnapshot::cell` with grade index out of bounds: the len is {} but the index is {}",
            self.num_grades,
            grade.get()
        );
        debug_assert!(
            line.get() < self.num_lines,
            "called `IncumbentSnapshot::cell` with line index out of bounds: the len is {} but the index is {}",
            self.num_lines,
            line.get()
        );
        debug_assert!(
            day.get() < self.num_days,
            "called `IncumbentSnapshot::cell` with day index out of bounds: the len is {} but the index is {}",
            self.num_days,
            day.get()
        );
        (grade.get() * self.num_lines + line.get()) * self.num_days + day.get()
    }
}

impl std::fmt::Display for IncumbentSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "IncumbentSnapshot(objective: {}, elapsed: {:.3}s)",
            self.objective,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Where each snapshot value lives in an assignment.
#[derive(Debug, Clone)]
pub struct SnapshotLayout {
    num_grades: usize,
    num_lines: usize,
    num_days: usize,
    production: Vec<Resolved>,
    is_producing: Vec<Resolved>,
    inventory: DenseGrid<VarId>,
    stockout: DenseGrid<VarId>,
}

impl SnapshotLayout {
    pub fn new(encoding: &ScheduleEncoding) -> Self {
        let num_grades = encoding.num_grades();
        let num_lines = encoding.num_lines();
        let num_days = encoding.num_days();

        let cells = num_grades * num_lines * num_days;
        let mut production = Vec::with_capacity(cells);
        let mut is_producing = Vec::with_capacity(cells);
        for grade in GradeIndex::range(num_grades) {
            for line in LineIndex::range(num_lines) {
                for day in DayIndex::range(num_days) {
                    production.push(encoding.production(grade, line, day));
                    is_producing.push(encoding.is_producing(grade, line, day));
                }
            }
        }

        let mut inventory = DenseGrid::filled(num_grades, num_days + 1, VarId::new(0));
        let mut stockout = DenseGrid::filled(num_grades, num_days, VarId::new(0));
        for grade in GradeIndex::range(num_grades) {
            for day in DayIndex::range(num_days + 1) {
                inventory.set(grade.get(), day.get(), encoding.inventory(grade, day));
            }
            for day in DayIndex::range(num_days) {
                stockout.set(grade.get(), day.get(), encoding.stockout(grade, day));
            }
        }

        Self {
            num_grades,
            num_lines,
            num_days,
            production,
            is_producing,
            inventory,
            stockout,
        }
    }

    /// Copies the schedule values out of `assignment`.
    pub fn capture(&self, assignment: &Assignment, elapsed: Duration) -> IncumbentSnapshot {
        let values = assignment.values();
        let production = self.production.iter().map(|r| r.value(values)).collect();
        let is_producing = self.is_producing.iter().map(|r| r.value(values) != 0).collect();

        let mut inventory = DenseGrid::filled(self.num_grades, self.num_days + 1, 0i64);
        for (row, vars) in self.inventory.iter_rows().enumerate() {
            for (col, var) in vars.iter().enumerate() {
                inventory.set(row, col, assignment.value(*var));
            }
        }
        let mut stockout = DenseGrid::filled(self.num_grades, self.num_days, 0i64);
        for (row, vars) in self.stockout.iter_rows().enumerate() {
            for (col, var) in vars.iter().enumerate() {
                stockout.set(row, col, assignment.value(*var));
            }
        }

        IncumbentSnapshot {
            objective: assignment.objective(),
            elapsed,
            num_grades: self.num_grades,
            num_lines: self.num_lines,
            num_days: self.num_days,
            production,
            is_producing,
            inventory,
            stockout,
        }
    }
}

/// Appends a snapshot for every improvement it is told about.
#[derive(Debug)]
pub struct IncumbentRecorder<'l> {
    layout: &'l SnapshotLayout,
    log: Vec<IncumbentSnapshot>,
}

impl<'l> IncumbentRecorder<'l> {
    #[inline]
    pub fn new(layout: &'l SnapshotLayout) -> Self {
        Self {
            layout,
            log: Vec::new(),
        }
    }

    #[inline]
    pub fn log(&self) -> &[IncumbentSnapshot] {
        &self.log
    }

    #[inline]
    pub fn into_log(self) -> Vec<IncumbentSnapshot> {
        self.log
    }
}

impl ImprovementCallback for IncumbentRecorder<'_> {
    fn on_improvement(&mut self, assignment: &Assignment, elapsed: Duration) {
        let snapshot = self.layout.capture(assignment, elapsed);
        tracing::debug!(
            objective = snapshot.objective(),
            elapsed_ms = elapsed.as_millis() as u64,
            index = self.log.len(),
            "recorded incumbent"
        );
        self.log.push(snapshot);
    }
}
