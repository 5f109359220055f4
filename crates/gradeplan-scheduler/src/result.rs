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

//! # Schedule Result
//!
//! The serializable report of a scheduling run, with identifiers and
//! calendar dates in place of typed indices.

use crate::{
    diagnostics::InfeasibilityReport,
    driver::ScheduleOutcome,
    extract::{InventoryViolation, SolutionExtractor},
};
use chrono::NaiveDate;
use gradeplan_model::{
    index::{DayIndex, GradeIndex},
    instance::Instance,
};
use gradeplan_search::{model::ModelError, result::SolveStatus};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
    ModelInvalid,
}

impl From<SolveStatus> for ResultStatus {
    fn from(status: SolveStatus) -> Self {
        match status {
            SolveStatus::Optimal => ResultStatus::Optimal,
            SolveStatus::Feasible => ResultStatus::Feasible,
            SolveStatus::Infeasible => ResultStatus::Infeasible,
            SolveStatus::Unknown => ResultStatus::Unknown,
        }
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultStatus::Optimal => write!(f, "OPTIMAL"),
            ResultStatus::Feasible => write!(f, "FEASIBLE"),
            ResultStatus::Infeasible => write!(f, "INFEASIBLE"),
            ResultStatus::Unknown => write!(f, "UNKNOWN"),
            ResultStatus::ModelInvalid => write!(f, "MODEL_INVALID"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyAssignment {
    pub day: usize,
    pub date: Option<NaiveDate>,
    /// `None` when the line is idle.
    pub grade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRecord {
    pub grade: String,
    pub start_day: usize,
    pub end_day: usize,
    pub days: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineSchedule {
    pub line: String,
    pub runs: Vec<RunRecord>,
    pub daily: Vec<DailyAssignment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeSeries {
    pub grade: String,
    pub values: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineTransitions {
    pub line: String,
    pub transitions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TransitionCounts {
    pub per_line: Vec<LineTransitions>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncumbentRecord {
    pub objective: i64,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryViolationRecord {
    pub grade: String,
    pub day: usize,
    pub date: Option<NaiveDate>,
    pub inventory: i64,
    pub min_inventory: i64,
    pub max_inventory: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatisticsRecord {
    pub termination: String,
    pub solutions_found: u64,
    pub workers: usize,
    pub nodes_explored: u64,
    pub conflicts: u64,
    pub bound_prunings: u64,
}

/// The complete report of a scheduling run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleResult {
    pub status: ResultStatus,
    pub objective: Option<i64>,
    pub runtime_seconds: f64,
    pub schedule: Vec<LineSchedule>,
    pub inventory_series: Vec<GradeSeries>,
    pub stockout_series: Vec<GradeSeries>,
    pub production_series: Vec<GradeSeries>,
    pub transition_counts: TransitionCounts,
    pub incumbents: Vec<IncumbentRecord>,
    pub inventory_violations: Vec<InventoryViolationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<InfeasibilityReport>,
    pub statistics: StatisticsRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ScheduleResult {
    /// Builds the report of a finished solve. Without an incumbent every
    /// schedule section is empty.
    pub fn from_outcome(instance: &Instance, outcome: &ScheduleOutcome) -> Self {
        let statistics = outcome.statistics();
        let mut result = Self {
            status: outcome.status().into(),
            objective: outcome.objective(),
            runtime_seconds: statistics.solve_duration.as_secs_f64(),
            schedule: Vec::new(),
            inventory_series: Vec::new(),
            stockout_series: Vec::new(),
            production_series: Vec::new(),
            transition_counts: TransitionCounts::default(),
            incumbents: outcome
                .incumbents()
                .iter()
                .map(|snapshot| IncumbentRecord {
                    objective: snapshot.objective(),
                    elapsed_seconds: snapshot.elapsed().as_secs_f64(),
                })
                .collect(),
            inventory_violations: Vec::new(),
            diagnostics: outcome.diagnostics().cloned(),
            statistics: StatisticsRecord {
                termination: outcome.reason().to_string(),
                solutions_found: statistics.solutions_found,
                workers: statistics.used_threads,
                nodes_explored: statistics.nodes_explored,
                conflicts: statistics.conflicts,
                bound_prunings: statistics.bound_prunings,
            },
            message: None,
        };

        let Some(best) = outcome.best() else {
            return result;
        };
        let extractor = SolutionExtractor::new(instance);
        let schedule = extractor.extract(best);
        let calendar = instance.calendar();
        let grade_id = |grade: GradeIndex| instance.grade(grade).id().to_string();

        for line_index in instance.line_indices() {
            let runs = schedule
                .runs_on(line_index)
                .map(|run| RunRecord {
                    grade: grade_id(run.grade),
                    start_day: run.start.get(),
                    end_day: run.end.get(),
                    days: run.days(),
                    start_date: calendar.date(run.start),
                    end_date: calendar.date(run.end),
                })
                .collect();
            let daily = schedule
                .daily(line_index)
                .iter()
                .enumerate()
                .map(|(day, grade)| DailyAssignment {
                    day,
                    date: calendar.date(DayIndex::new(day)),
                    grade: grade.map(grade_id),
                })
                .collect();
            result.schedule.push(LineSchedule {
                line: instance.line(line_index).id().to_string(),
                runs,
                daily,
            });
            result.transition_counts.per_line.push(LineTransitions {
                line: instance.line(line_index).id().to_string(),
                transitions: schedule.transitions(line_index),
            });
        }
        result.transition_counts.total = schedule.total_transitions();

        for grade_index in instance.grade_indices() {
            let series = |values: &[i64]| GradeSeries {
                grade: grade_id(grade_index),
                values: values.to_vec(),
            };
            result.inventory_series.push(series(schedule.inventory(grade_index)));
            result.stockout_series.push(series(schedule.stockout(grade_index)));
            result.production_series.push(series(schedule.production(grade_index)));
        }

        result.inventory_violations = extractor
            .inventory_violations(&schedule)
            .into_iter()
            .map(|violation: InventoryViolation| InventoryViolationRecord {
                grade: grade_id(violation.grade),
                day: violation.day.get(),
                date: calendar.date(violation.day),
                inventory: violation.inventory,
                min_inventory: violation.min_inventory,
                max_inventory: violation.max_inventory,
            })
            .collect();

        result
    }

    /// The report for a model the backend refused to search.
    pub fn model_invalid(error: &ModelError) -> Self {
        Self {
            status: ResultStatus::ModelInvalid,
            objective: None,
            runtime_seconds: 0.0,
            schedule: Vec::new(),
            inventory_series: Vec::new(),
            stockout_series: Vec::new(),
            production_series: Vec::new(),
            transition_counts: TransitionCounts::default(),
            incumbents: Vec::new(),
            inventory_violations: Vec::new(),
            diagnostics: None,
            statistics: StatisticsRecord::default(),
            message: Some(error.to_string()),
        }
    }

    #[inline]
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl std::fmt::Display for ScheduleResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.objective {
            Some(objective) => write!(
                f,
                "ScheduleResult({}, objective: {}, runtime: {:.3}s)",
                self.status, objective, self.runtime_seconds
            ),
            None => write!(
                f,
                "ScheduleResult({}, runtime: {:.3}s)",
                self.status, self.runtime_seconds
            ),
        }
    }
}
