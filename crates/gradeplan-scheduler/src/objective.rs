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

//! # Objective
//!
//! `stockout_penalty * sum(stockout) + transition_penalty * sum(transitions)`.
//!
//! The same function is available in two forms: as a `LinearExpr` over the
//! encoding for the search, and as a direct evaluation of an
//! `IncumbentSnapshot`, which recounts transitions from the daily grades.

use crate::{encoding::ScheduleEncoding, extract::count_transitions, snapshot::IncumbentSnapshot};
use gradeplan_model::{
    config::SolveConfig,
    index::{DayIndex, GradeIndex, LineIndex},
};
use gradeplan_search::model::LinearExpr;

/// The parts of an objective value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectiveBreakdown {
    pub stockout_units: i64,
    pub transitions: i64,
    pub total: i64,
}

impl std::fmt::Display for ObjectiveBreakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ObjectiveBreakdown(stockout: {}, transitions: {}, total: {})",
            self.stockout_units, self.transitions, self.total
        )
    }
}

/// Weighted sum of stockouts and grade transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectiveFunction {
    stockout_penalty: i64,
    transition_penalty: i64,
}

impl Default for ObjectiveFunction {
    fn default() -> Self {
        Self::new(10, 10)
    }
}

impl ObjectiveFunction {
    /// Both penalties must be non-negative.
    #[inline]
    pub fn new(stockout_penalty: i64, transition_penalty: i64) -> Self {
        debug_assert!(
            stockout_penalty >= 0 && transition_penalty >= 0,
            "called `ObjectiveFunction::new` with negative penalties: {} / {}",
            stockout_penalty,
            transition_penalty
        );
        Self {
            stockout_penalty,
            transition_penalty,
        }
    }

    #[inline]
    pub fn from_config(config: &SolveConfig) -> Self {
        Self::new(config.stockout_penalty, config.transition_penalty)
    }

    #[inline]
    pub fn stockout_penalty(&self) -> i64 {
        self.stockout_penalty
    }

    #[inline]
    pub fn transition_penalty(&self) -> i64 {
        self.transition_penalty
    }

    /// The objective over the encoding's stockout and transition variables.
    pub fn expression(&self, encoding: &ScheduleEncoding) -> LinearExpr {
        let mut expr = LinearExpr::new();
        for var in encoding.stockout_vars() {
            expr.add_term(var, self.stockout_penalty);
        }
        for var in encoding.transition_vars() {
            expr.add_term(var, self.transition_penalty);
        }
        expr
    }

    /// Evaluates the objective on a snapshot without consulting the model.
    pub fn breakdown(&self, snapshot: &IncumbentSnapshot) -> ObjectiveBreakdown {
        let mut stockout_units = 0i64;
        for grade in GradeIndex::range(snapshot.num_grades()) {
            for day in DayIndex::range(snapshot.num_days()) {
                stockout_units = stockout_units.saturating_add(snapshot.stockout(grade, day));
            }
        }

        let transitions = LineIndex::range(snapshot.num_lines())
            .map(|line| count_transitions(&snapshot.daily_grades(line)))
            .sum::<u64>() as i64;

        let total = self
            .stockout_penalty
            .saturating_mul(stockout_units)
            .saturating_add(self.transition_penalty.saturating_mul(transitions));

        ObjectiveBreakdown {
            stockout_units,
            transitions,
            total,
        }
    }

    #[inline]
    pub fn evaluate(&self, snapshot: &IncumbentSnapshot) -> i64 {
        self.breakdown(snapshot).total
    }
}

impl std::fmt::Display for ObjectiveFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ObjectiveFunction(stockout_penalty: {}, transition_penalty: {})",
            self.stockout_penalty, self.transition_penalty
        )
    }
}
