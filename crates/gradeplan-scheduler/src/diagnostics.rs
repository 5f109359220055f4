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

//! # Infeasibility Diagnostics
//!
//! When the search proves that no schedule exists, the report combines two
//! sources of evidence:
//!
//! * static suspects: input combinations that cannot be satisfied on their
//!   own, found by inspecting the instance without searching;
//! * conflict counts: how often each constraint family failed during
//!   propagation, ranked from most to least.

use crate::encoding::ConstraintFamily;
use gradeplan_model::{
    config::{InventoryBoundPolicy, SolveConfig},
    index::{DayIndex, GradeIndex, LineIndex},
    instance::Instance,
};
use serde::Serialize;

/// An input combination that is likely responsible for infeasibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suspect {
    pub family: ConstraintFamily,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FamilyConflicts {
    pub family: ConstraintFamily,
    pub conflicts: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InfeasibilityReport {
    pub suspects: Vec<Suspect>,
    pub family_conflicts: Vec<FamilyConflicts>,
}

impl InfeasibilityReport {
    /// Returns `true` if any static suspect belongs to `family`.
    #[inline]
    pub fn suspects_family(&self, family: ConstraintFamily) -> bool {
        self.suspects.iter().any(|suspect| suspect.family == family)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.suspects.is_empty() && self.family_conflicts.is_empty()
    }
}

impl std::fmt::Display for InfeasibilityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Infeasibility Report:")?;
        for suspect in &self.suspects {
            writeln!(f, "  [{}] {}", suspect.family, suspect.message)?;
        }
        for entry in &self.family_conflicts {
            writeln!(f, "  {}: {} conflicts", entry.family, entry.conflicts)?;
        }
        Ok(())
    }
}

/// Builds the report for an infeasible instance.
///
/// `conflicts` holds the search's conflict count per family; zero entries
/// are dropped and the rest sorted by count, highest first.
pub fn diagnose(
    instance: &Instance,
    config: &SolveConfig,
    conflicts: &[(ConstraintFamily, u64)],
) -> InfeasibilityReport {
    let diagnoser = Diagnoser {
        instance,
        config,
        num_days: instance.num_core_days() + config.buffer_days,
        suspects: Vec::new(),
    };
    let suspects = diagnoser.run();

    let mut family_conflicts: Vec<FamilyConflicts> = conflicts
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|&(family, conflicts)| FamilyConflicts { family, conflicts })
        .collect();
    family_conflicts.sort_by(|a, b| b.conflicts.cmp(&a.conflicts).then(a.family.cmp(&b.family)));

    InfeasibilityReport {
        suspects,
        family_conflicts,
    }
}

struct Diagnoser<'a> {
    instance: &'a Instance,
    config: &'a SolveConfig,
    num_days: usize,
    suspects: Vec<Suspect>,
}

impl Diagnoser<'_> {
    fn run(mut self) -> Vec<Suspect> {
        self.check_run_lengths();
        self.check_forced_starts();
        self.check_carry_over();
        self.check_inventory_targets();
        self.suspects
    }

    fn push(&mut self, family: ConstraintFamily, message: String) {
        tracing::debug!(family = %family, %message, "infeasibility suspect");
        self.suspects.push(Suspect { family, message });
    }

    fn check_run_lengths(&mut self) {
        let instance = self.instance;
        for line_index in instance.line_indices() {
            let line = instance.line(line_index);
            for &grade_index in instance.grades_on_line(line_index) {
                let grade = instance.grade(grade_index);
                let params = instance.params(grade_index, line_index);
                let min_run = params.min_run_days();
                if min_run > self.num_days {
                    self.push(
                        ConstraintFamily::MinRun,
                        format!(
                            "grade `{}` on line `{}`: minimum run of {} days exceeds the horizon of {} days",
                            grade.id(),
                            line.id(),
                            min_run,
                            self.num_days
                        ),
                    );
                }
                if let Some(day) = params.forced_start() {
                    if day.get() + min_run > self.num_days {
                        self.push(
                            ConstraintFamily::MinRun,
                            format!(
                                "grade `{}` on line `{}`: forced start on day {} leaves {} days for a minimum run of {}",
                                grade.id(),
                                line.id(),
                                day.get(),
                                self.num_days - day.get(),
                                min_run
                            ),
                        );
                    }
                }
            }
        }
    }

    fn check_forced_starts(&mut self) {
        let instance = self.instance;
        for line_index in instance.line_indices() {
            let line = instance.line(line_index);
            let forced: Vec<_> = instance
                .grades_on_line(line_index)
                .iter()
                .filter_map(|&grade| {
                    let day = instance.params(grade, line_index).forced_start()?;
                    Some((grade, day))
                })
                .collect();

            for &(grade, day) in &forced {
                let grade_id = instance.grade(grade).id();
                if line.is_shutdown(day) {
                    self.push(
                        ConstraintFamily::Shutdown,
                        format!(
                            "grade `{}` is forced to start on line `{}` on day {}, a shutdown day",
                            grade_id,
                            line.id(),
                            day.get()
                        ),
                    );
                }
                if let Some((carried, pinned)) = self.carried_run(line_index) {
                    if carried != grade && day.get() < pinned {
                        self.push(
                            ConstraintFamily::CarryOver,
                            format!(
                                "grade `{}` is forced onto line `{}` on day {}, inside the {} days reserved for the run of `{}` in progress",
                                grade_id,
                                line.id(),
                                day.get(),
                                pinned,
                                instance.grade(carried).id()
                            ),
                        );
                    }
                }
            }

            for (position, &(first, first_day)) in forced.iter().enumerate() {
                for &(second, second_day) in &forced[position + 1..] {
                    let (first_id, second_id) = (
                        instance.grade(first).id(),
                        instance.grade(second).id(),
                    );
                    if first_day == second_day {
                        self.push(
                            ConstraintFamily::ForcedStart,
                            format!(
                                "grades `{}` and `{}` are both forced onto line `{}` on day {}",
                                first_id,
                                second_id,
                                line.id(),
                                first_day.get()
                            ),
                        );
                        continue;
                    }
                    let ordered = if first_day < second_day {
                        [(first, first_day), (second, second_day)]
                    } else {
                        [(second, second_day), (first, first_day)]
                    };
                    let [(from, from_day), (to, to_day)] = ordered;
                    if from_day.get() + 1 == to_day.get()
                        && !instance.permits_transition(line_index, from, to)
                    {
                        self.push(
                            ConstraintFamily::Transition,
                            format!(
                                "line `{}`: `{}` is forced on day {} and `{}` on day {}, but `{}` may not follow `{}`",
                                line.id(),
                                instance.grade(from).id(),
                                from_day.get(),
                                instance.grade(to).id(),
                                to_day.get(),
                                instance.grade(to).id(),
                                instance.grade(from).id()
                            ),
                        );
                    }
                }
            }
        }
    }

    fn check_carry_over(&mut self) {
        let instance = self.instance;
        for line_index in instance.line_indices() {
            let Some((carried, pinned)) = self.carried_run(line_index) else {
                continue;
            };
            let line = instance.line(line_index);
            if let Some(day) = DayIndex::range(pinned).find(|&day| line.is_shutdown(day)) {
                self.push(
                    ConstraintFamily::CarryOver,
                    format!(
                        "line `{}`: the run of `{}` in progress must continue for {} days but day {} is a shutdown",
                        line.id(),
                        instance.grade(carried).id(),
                        pinned,
                        day.get()
                    ),
                );
            }
        }
    }

    fn check_inventory_targets(&mut self) {
        let instance = self.instance;
        let hard_bounds = self.config.inventory_bounds == InventoryBoundPolicy::Hard;
        for grade_index in instance.grade_indices() {
            let grade = instance.grade(grade_index);
            let min_closing = grade.min_closing_inventory();

            let max_output = grade
                .allowed_lines()
                .iter()
                .map(|&line| self.max_output(line))
                .fold(0i64, i64::saturating_add);
            let reachable = grade.initial_inventory().saturating_add(max_output);

            if min_closing > grade.initial_inventory() && max_output == 0 {
                self.push(
                    ConstraintFamily::Capacity,
                    format!(
                        "grade `{}`: closing inventory of {} is required but none of its lines can produce it",
                        grade.id(),
                        min_closing
                    ),
                );
            } else if min_closing > reachable {
                self.push(
                    ConstraintFamily::ClosingInventory,
                    format!(
                        "grade `{}`: closing inventory of {} exceeds the {} units that can ever be on hand",
                        grade.id(),
                        min_closing,
                        reachable
                    ),
                );
            }

            if hard_bounds && grade.has_max_inventory() && min_closing > grade.max_inventory() {
                self.push(
                    ConstraintFamily::ClosingInventory,
                    format!(
                        "grade `{}`: closing inventory of {} exceeds max_inventory {}",
                        grade.id(),
                        min_closing,
                        grade.max_inventory()
                    ),
                );
            }

            if hard_bounds && grade.min_inventory() > 0 && self.num_days > 0 {
                // Stock after day 0 is at most what is left once that day's
                // demand has been served.
                let day_zero = DayIndex::new(0);
                let first_output = grade
                    .allowed_lines()
                    .iter()
                    .filter(|&&line| !instance.line(line).is_shutdown(day_zero))
                    .map(|&line| instance.line(line).capacity())
                    .fold(0i64, i64::saturating_add);
                let first_closing = grade
                    .initial_inventory()
                    .saturating_add(first_output)
                    .saturating_sub(instance.demand(grade_index, day_zero))
                    .max(0);
                if first_closing < grade.min_inventory() {
                    self.push(
                        ConstraintFamily::InventoryBounds,
                        format!(
                            "grade `{}`: at most {} units are on hand after day 0, below min_inventory {}",
                            grade.id(),
                            first_closing,
                            grade.min_inventory()
                        ),
                    );
                }
            }
        }
    }

    /// Capacity times the number of open days of `line`.
    fn max_output(&self, line_index: LineIndex) -> i64 {
        let line = self.instance.line(line_index);
        let open_days = self.num_days - line.shutdown_days().len().min(self.num_days);
        line.capacity().saturating_mul(open_days as i64)
    }

    fn carried_run(&self, line_index: LineIndex) -> Option<(GradeIndex, usize)> {
        let run = self.instance.line(line_index).in_progress()?;
        let min_run = self.instance.params(run.grade(), line_index).min_run_days();
        let pinned = self
            .config
            .carry_over
            .pinned_days(run.remaining_days(), run.elapsed_days(), min_run)
            .min(self.num_days);
        Some((run.grade(), pinned))
    }
}
