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

//! # Schedule Encoding
//!
//! Translates an `Instance` and a `SolveConfig` into a `CpModel`.
//!
//! The horizon is `num_days = core_days + buffer_days`. For every allowed
//! `(grade, line, day)` the builder creates three variables:
//!
//! * `is_producing` (bool): the grade occupies the line that day;
//! * `production` (int, `0..=capacity`): the quantity produced;
//! * `run_start` (bool): a run of the grade begins that day.
//!
//! Disallowed combinations get no variables at all; lookups on them resolve
//! to `Resolved::Constant(0)`. Per grade there is one `inventory` variable
//! per day boundary (`0..=num_days`, day 0 a constant) and one `stockout`
//! variable per day. Lines running at least two grades get a `transition`
//! indicator for every day after the first.
//!
//! Every constraint is tagged with a `ConstraintFamily` so that conflicts
//! found during search can be attributed back to the rule that caused them.

use crate::error::BuildError;
use fixedbitset::FixedBitSet;
use gradeplan_core::utils::grid::DenseGrid;
use gradeplan_model::{
    config::{InventoryBoundPolicy, SolveConfig},
    index::{DayIndex, GradeIndex, LineIndex},
    instance::Instance,
};
use gradeplan_search::{
    index::{FamilyId, VarId},
    model::{CpModel, LinearExpr, Literal, SupplyBalance},
};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// The modelling rule a constraint was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintFamily {
    Capacity,
    SingleGrade,
    Shutdown,
    RunStart,
    MinRun,
    MaxRun,
    ForcedStart,
    Rerun,
    Transition,
    CarryOver,
    InventoryBalance,
    InventoryBounds,
    ClosingInventory,
    TransitionCount,
}

impl ConstraintFamily {
    pub const COUNT: usize = 14;

    /// Every family, in declaration order.
    pub const ALL: [ConstraintFamily; Self::COUNT] = [
        ConstraintFamily::Capacity,
        ConstraintFamily::SingleGrade,
        ConstraintFamily::Shutdown,
        ConstraintFamily::RunStart,
        ConstraintFamily::MinRun,
        ConstraintFamily::MaxRun,
        ConstraintFamily::ForcedStart,
        ConstraintFamily::Rerun,
        ConstraintFamily::Transition,
        ConstraintFamily::CarryOver,
        ConstraintFamily::InventoryBalance,
        ConstraintFamily::InventoryBounds,
        ConstraintFamily::ClosingInventory,
        ConstraintFamily::TransitionCount,
    ];

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintFamily::Capacity => "capacity",
            ConstraintFamily::SingleGrade => "single_grade",
            ConstraintFamily::Shutdown => "shutdown",
            ConstraintFamily::RunStart => "run_start",
            ConstraintFamily::MinRun => "min_run",
            ConstraintFamily::MaxRun => "max_run",
            ConstraintFamily::ForcedStart => "forced_start",
            ConstraintFamily::Rerun => "rerun",
            ConstraintFamily::Transition => "transition",
            ConstraintFamily::CarryOver => "carry_over",
            ConstraintFamily::InventoryBalance => "inventory_balance",
            ConstraintFamily::InventoryBounds => "inventory_bounds",
            ConstraintFamily::ClosingInventory => "closing_inventory",
            ConstraintFamily::TransitionCount => "transition_count",
        }
    }
}

impl std::fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A quantity that is either a model variable or fixed by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolved {
    Variable(VarId),
    Constant(i64),
}

impl Resolved {
    /// Reads the value from a complete value vector.
    #[inline]
    pub fn value(&self, values: &[i64]) -> i64 {
        match self {
            Resolved::Variable(var) => {
                debug_assert!(
                    var.get() < values.len(),
                    "called `Resolved::value` with variable out of bounds: the len is {} but the index is {}",
                    values.len(),
                    var.get()
                );
                values[var.get()]
            }
            Resolved::Constant(value) => *value,
        }
    }

    #[inline]
    pub fn as_variable(&self) -> Option<VarId> {
        match self {
            Resolved::Variable(var) => Some(*var),
            Resolved::Constant(_) => None,
        }
    }
}

type CellKey = (GradeIndex, LineIndex, DayIndex);

/// The encoded model together with the variable tables needed to read a
/// schedule back out of an assignment.
#[derive(Debug, Clone)]
pub struct ScheduleEncoding {
    model: CpModel,
    families: [FamilyId; ConstraintFamily::COUNT],
    num_grades: usize,
    num_lines: usize,
    num_days: usize,
    is_producing: FxHashMap<CellKey, VarId>,
    production: FxHashMap<CellKey, VarId>,
    run_start: FxHashMap<CellKey, VarId>,
    inventory: DenseGrid<VarId>,          // num_grades x (num_days + 1)
    stockout: DenseGrid<VarId>,           // num_grades x num_days
    transition: DenseGrid<Option<VarId>>, // num_lines x num_days
}

impl ScheduleEncoding {
    #[inline]
    pub fn model(&self) -> &CpModel {
        &self.model
    }

    #[inline]
    pub fn num_grades(&self) -> usize {
        self.num_grades
    }

    #[inline]
    pub fn num_lines(&self) -> usize {
        self.num_lines
    }

    /// Core days plus buffer days.
    #[inline]
    pub fn num_days(&self) -> usize {
        self.num_days
    }

    /// Installs the expression the search minimizes.
    #[inline]
    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.model.minimize(objective);
    }

    #[inline]
    pub fn family_id(&self, family: ConstraintFamily) -> FamilyId {
        self.families[family as usize]
    }

    /// Maps a model family back to the rule it stands for.
    #[inline]
    pub fn family_of(&self, family_id: FamilyId) -> Option<ConstraintFamily> {
        self.families
            .iter()
            .position(|&id| id == family_id)
            .map(|position| ConstraintFamily::ALL[position])
    }

    #[inline]
    pub fn is_producing(&self, grade: GradeIndex, line: LineIndex, day: DayIndex) -> Resolved {
        Self::resolve(&self.is_producing, grade, line, day)
    }

    #[inline]
    pub fn production(&self, grade: GradeIndex, line: LineIndex, day: DayIndex) -> Resolved {
        Self::resolve(&self.production, grade, line, day)
    }

    #[inline]
    pub fn run_start(&self, grade: GradeIndex, line: LineIndex, day: DayIndex) -> Resolved {
        Self::resolve(&self.run_start, grade, line, day)
    }

    /// Inventory at the start of `day`; `day == num_days` is the closing stock.
    #[inline]
    pub fn inventory(&self, grade: GradeIndex, day: DayIndex) -> VarId {
        *self.inventory.get(grade.get(), day.get())
    }

    #[inline]
    pub fn stockout(&self, grade: GradeIndex, day: DayIndex) -> VarId {
        *self.stockout.get(grade.get(), day.get())
    }

    #[inline]
    pub fn transition(&self, line: LineIndex, day: DayIndex) -> Resolved {
        match self.transition.get(line.get(), day.get()) {
            Some(var) => Resolved::Variable(*var),
            None => Resolved::Constant(0),
        }
    }

    /// Every stockout variable, grade-major.
    #[inline]
    pub fn stockout_vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.stockout.as_slice().iter().copied()
    }

    /// Every transition indicator, line-major.
    #[inline]
    pub fn transition_vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.transition.as_slice().iter().filter_map(|var| *var)
    }

    #[inline]
    fn resolve(
        table: &FxHashMap<CellKey, VarId>,
        grade: GradeIndex,
        line: LineIndex,
        day: DayIndex,
    ) -> Resolved {
        match table.get(&(grade, line, day)) {
            Some(var) => Resolved::Variable(*var),
            None => Resolved::Constant(0),
        }
    }
}

impl std::fmt::Display for ScheduleEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ScheduleEncoding(grades: {}, lines: {}, days: {}, {})",
            self.num_grades, self.num_lines, self.num_days, self.model
        )
    }
}

/// Builds a `ScheduleEncoding` from a validated instance.
///
/// The objective is not part of the encoding; see
/// `ObjectiveFunction::expression`.
pub struct ModelBuilder<'a> {
    instance: &'a Instance,
    config: &'a SolveConfig,
    num_days: usize,
}

impl<'a> ModelBuilder<'a> {
    #[inline]
    pub fn new(instance: &'a Instance, config: &'a SolveConfig) -> Self {
        Self {
            instance,
            config,
            num_days: instance.num_core_days() + config.buffer_days,
        }
    }

    #[inline]
    pub fn num_days(&self) -> usize {
        self.num_days
    }

    /// Creates every variable and constraint.
    #[tracing::instrument(skip_all, fields(days = self.num_days))]
    pub fn build(&self) -> Result<ScheduleEncoding, BuildError> {
        let mut model = CpModel::new();
        let families = ConstraintFamily::ALL.map(|family| model.declare_family(family.name()));

        let num_grades = self.instance.num_grades();
        let num_lines = self.instance.num_lines();
        let mut encoding = ScheduleEncoding {
            model,
            families,
            num_grades,
            num_lines,
            num_days: self.num_days,
            is_producing: FxHashMap::default(),
            production: FxHashMap::default(),
            run_start: FxHashMap::default(),
            inventory: DenseGrid::filled(num_grades, self.num_days + 1, VarId::new(0)),
            stockout: DenseGrid::filled(num_grades, self.num_days, VarId::new(0)),
            transition: DenseGrid::filled(num_lines, self.num_days, None),
        };

        self.create_line_variables(&mut encoding);
        self.add_capacity(&mut encoding)?;
        self.add_single_grade(&mut encoding)?;
        self.add_shutdowns(&mut encoding)?;
        self.add_run_starts(&mut encoding)?;
        self.add_run_lengths(&mut encoding)?;
        self.add_forced_starts(&mut encoding)?;
        self.add_rerun_limits(&mut encoding)?;
        self.add_transition_compatibility(&mut encoding)?;
        self.add_carry_over(&mut encoding)?;
        self.add_inventory(&mut encoding)?;
        self.add_transition_count(&mut encoding)?;

        tracing::debug!(
            variables = encoding.model.num_vars(),
            constraints = encoding.model.num_constraints(),
            "encoded schedule model"
        );
        Ok(encoding)
    }

    /// Creates `is_producing`, `production` and `run_start` for every allowed
    /// combination, day-major, and registers `is_producing` as the branching
    /// order.
    fn create_line_variables(&self, encoding: &mut ScheduleEncoding) {
        let mut decisions = Vec::new();
        for day in DayIndex::range(self.num_days) {
            for line_index in self.instance.line_indices() {
                let line = self.instance.line(line_index);
                for &grade_index in self.instance.grades_on_line(line_index) {
                    let cell = format!(
                        "{},{},{}",
                        self.instance.grade(grade_index).id(),
                        line.id(),
                        day.get()
                    );
                    let model = &mut encoding.model;
                    let is_producing = model.new_bool_var(format!("is_producing[{}]", cell));
                    let production =
                        model.new_int_var(0, line.capacity(), format!("production[{}]", cell));
                    let run_start = model.new_bool_var(format!("run_start[{}]", cell));

                    let key = (grade_index, line_index, day);
                    encoding.is_producing.insert(key, is_producing);
                    encoding.production.insert(key, production);
                    encoding.run_start.insert(key, run_start);
                    decisions.push(is_producing);
                }
            }
        }
        encoding.model.add_decision_vars(decisions);
    }

    /// `production = capacity * is_producing` on core days and
    /// `production <= capacity * is_producing` on buffer days.
    fn add_capacity(&self, encoding: &mut ScheduleEncoding) -> Result<(), BuildError> {
        let family = encoding.family_id(ConstraintFamily::Capacity);
        let core_days = self.instance.num_core_days();
        for line_index in self.instance.line_indices() {
            let capacity = self.instance.line(line_index).capacity();
            for &grade_index in self.instance.grades_on_line(line_index) {
                for day in DayIndex::range(self.num_days) {
                    let is_producing = self.lookup(
                        encoding,
                        Table::IsProducing,
                        grade_index,
                        line_index,
                        day,
                    )?;
                    let production = self.lookup(
                        encoding,
                        Table::Production,
                        grade_index,
                        line_index,
                        day,
                    )?;
                    let expr = LinearExpr::new()
                        .term(production, 1)
                        .term(is_producing, -capacity);
                    if day.get() < core_days {
                        encoding.model.add_eq(expr, 0, family);
                    } else {
                        encoding.model.add_le(expr, 0, family);
                    }
                }
            }
        }
        Ok(())
    }

    fn add_single_grade(&self, encoding: &mut ScheduleEncoding) -> Result<(), BuildError> {
        let family = encoding.family_id(ConstraintFamily::SingleGrade);
        for line_index in self.instance.line_indices() {
            let grades = self.instance.grades_on_line(line_index);
            if grades.len() < 2 {
                continue;
            }
            for day in DayIndex::range(self.num_days) {
                let expr = self.active_sum(encoding, line_index, day, None, 1)?;
                encoding.model.add_le(expr, 1, family);
            }
        }
        Ok(())
    }

    fn add_shutdowns(&self, encoding: &mut ScheduleEncoding) -> Result<(), BuildError> {
        let family = encoding.family_id(ConstraintFamily::Shutdown);
        for line_index in self.instance.line_indices() {
            for &day in self.instance.line(line_index).shutdown_days() {
                for &grade_index in self.instance.grades_on_line(line_index) {
                    let is_producing = self.lookup(
                        encoding,
                        Table::IsProducing,
                        grade_index,
                        line_index,
                        day,
                    )?;
                    encoding.model.add_fixed(is_producing, 0, family);
                }
            }
        }
        Ok(())
    }

    /// `run_start[d] <-> is_producing[d] && !is_producing[d - 1]`, with
    /// `run_start[0] = is_producing[0]` unless day 0 continues a carried run.
    fn add_run_starts(&self, encoding: &mut ScheduleEncoding) -> Result<(), BuildError> {
        let family = encoding.family_id(ConstraintFamily::RunStart);
        let carry_family = encoding.family_id(ConstraintFamily::CarryOver);
        for line_index in self.instance.line_indices() {
            let carried = self.carried_run(line_index);
            for &grade_index in self.instance.grades_on_line(line_index) {
                for day in DayIndex::range(self.num_days) {
                    let start = self.lookup(
                        encoding,
                        Table::RunStart,
                        grade_index,
                        line_index,
                        day,
                    )?;
                    let active = self.lookup(
                        encoding,
                        Table::IsProducing,
                        grade_index,
                        line_index,
                        day,
                    )?;
                    let Some(previous_day) = day.prev() else {
                        if carried.is_some_and(|(grade, _)| grade == grade_index) {
                            encoding.model.add_fixed(start, 0, carry_family);
                        } else {
                            let expr = LinearExpr::new().term(start, 1).term(active, -1);
                            encoding.model.add_eq(expr, 0, family);
                        }
                        continue;
                    };
                    let previous = self.lookup(
                        encoding,
                        Table::IsProducing,
                        grade_index,
                        line_index,
                        previous_day,
                    )?;

                    let model = &mut encoding.model;
                    model.add_implication(Literal::pos(start), Literal::pos(active), family);
                    model.add_implication(Literal::pos(start), Literal::neg(previous), family);
                    model.add_clause(
                        [Literal::pos(start), Literal::neg(active), Literal::pos(previous)],
                        family,
                    );
                }
            }
        }
        Ok(())
    }

    /// Minimum runs: a start on `s` needs `s + min_run <= num_days` and keeps
    /// the line busy for `min_run` days. Maximum runs: every window of
    /// `max_run + 1` days holds at most `max_run` active days.
    fn add_run_lengths(&self, encoding: &mut ScheduleEncoding) -> Result<(), BuildError> {
        let min_family = encoding.family_id(ConstraintFamily::MinRun);
        let max_family = encoding.family_id(ConstraintFamily::MaxRun);
        for line_index in self.instance.line_indices() {
            let carried = self.carried_run(line_index);
            for &grade_index in self.instance.grades_on_line(line_index) {
                let params = self.instance.params(grade_index, line_index);

                let min_run = params.min_run_days();
                for day in DayIndex::range(self.num_days) {
                    let start = self.lookup(
                        encoding,
                        Table::RunStart,
                        grade_index,
                        line_index,
                        day,
                    )?;
                    if day.get() + min_run > self.num_days {
                        encoding.model.add_fixed(start, 0, min_family);
                        continue;
                    }
                    for k in 1..min_run {
                        let later = self.lookup(
                            encoding,
                            Table::IsProducing,
                            grade_index,
                            line_index,
                            day.offset(k),
                        )?;
                        encoding
                            .model
                            .add_implication(Literal::pos(start), Literal::pos(later), min_family);
                    }
                }

                let max_run = params.max_run_days_within(self.num_days);
                if max_run >= self.num_days {
                    continue;
                }
                let first_window = match carried {
                    Some((grade, pinned)) if grade == grade_index && pinned > max_run => {
                        // An overlong carried run ends with its pin.
                        if pinned < self.num_days {
                            let after = self.lookup(
                                encoding,
                                Table::IsProducing,
                                grade_index,
                                line_index,
                                DayIndex::new(pinned),
                            )?;
                            encoding.model.add_fixed(after, 0, max_family);
                        }
                        pinned
                    }
                    _ => 0,
                };
                for window in first_window..(self.num_days - max_run) {
                    let mut expr = LinearExpr::new();
                    for day in DayIndex::new(window).until(DayIndex::new(window + max_run + 1)) {
                        let active = self.lookup(
                            encoding,
                            Table::IsProducing,
                            grade_index,
                            line_index,
                            day,
                        )?;
                        expr.add_term(active, 1);
                    }
                    encoding.model.add_le(expr, max_run as i64, max_family);
                }
            }
        }
        Ok(())
    }

    fn add_forced_starts(&self, encoding: &mut ScheduleEncoding) -> Result<(), BuildError> {
        let family = encoding.family_id(ConstraintFamily::ForcedStart);
        for line_index in self.instance.line_indices() {
            for &grade_index in self.instance.grades_on_line(line_index) {
                if let Some(day) = self.instance.params(grade_index, line_index).forced_start() {
                    let is_producing = self.lookup(
                        encoding,
                        Table::IsProducing,
                        grade_index,
                        line_index,
                        day,
                    )?;
                    encoding.model.add_fixed(is_producing, 1, family);
                }
            }
        }
        Ok(())
    }

    /// A pair without reruns starts at most once, or never if it continues a
    /// carried run.
    fn add_rerun_limits(&self, encoding: &mut ScheduleEncoding) -> Result<(), BuildError> {
        let family = encoding.family_id(ConstraintFamily::Rerun);
        for line_index in self.instance.line_indices() {
            let carried = self.carried_run(line_index);
            for &grade_index in self.instance.grades_on_line(line_index) {
                if self.instance.params(grade_index, line_index).rerun_allowed() {
                    continue;
                }
                let mut expr = LinearExpr::new();
                for day in DayIndex::range(self.num_days) {
                    let start = self.lookup(
                        encoding,
                        Table::RunStart,
                        grade_index,
                        line_index,
                        day,
                    )?;
                    expr.add_term(start, 1);
                }
                let bound = if carried.is_some_and(|(grade, _)| grade == grade_index) {
                    0
                } else {
                    1
                };
                encoding.model.add_le(expr, bound, family);
            }
        }
        Ok(())
    }

    /// Forbids `p` on `d - 1` followed by `q` on `d` whenever the line's
    /// transition rule does not permit `p -> q`.
    fn add_transition_compatibility(
        &self,
        encoding: &mut ScheduleEncoding,
    ) -> Result<(), BuildError> {
        let family = encoding.family_id(ConstraintFamily::Transition);
        for line_index in self.instance.line_indices() {
            let grades = self.instance.grades_on_line(line_index);
            let masks = self.forbidden_successors(line_index);
            if masks.iter().all(|mask| mask.is_clear()) {
                continue;
            }
            for day in DayIndex::new(1).until(DayIndex::new(self.num_days)) {
                let previous_day = DayIndex::new(day.get() - 1);
                for (from_position, mask) in masks.iter().enumerate() {
                    let from = grades[from_position];
                    let before = self.lookup(
                        encoding,
                        Table::IsProducing,
                        from,
                        line_index,
                        previous_day,
                    )?;
                    for to_position in mask.ones() {
                        let after = self.lookup(
                            encoding,
                            Table::IsProducing,
                            grades[to_position],
                            line_index,
                            day,
                        )?;
                        encoding
                            .model
                            .add_clause([Literal::neg(before), Literal::neg(after)], family);
                    }
                }
            }
        }
        Ok(())
    }

    /// One mask per grade on the line (by position in `grades_on_line`),
    /// with a bit set for every successor that is not permitted.
    fn forbidden_successors(&self, line_index: LineIndex) -> Vec<FixedBitSet> {
        let grades = self.instance.grades_on_line(line_index);
        grades
            .iter()
            .map(|&from| {
                let mut mask = FixedBitSet::with_capacity(grades.len());
                for (position, &to) in grades.iter().enumerate() {
                    if !self.instance.permits_transition(line_index, from, to) {
                        mask.insert(position);
                    }
                }
                mask
            })
            .collect()
    }

    /// Pins the carried grade for the first `P` days and keeps every other
    /// grade off the line meanwhile.
    fn add_carry_over(&self, encoding: &mut ScheduleEncoding) -> Result<(), BuildError> {
        let family = encoding.family_id(ConstraintFamily::CarryOver);
        for line_index in self.instance.line_indices() {
            let Some((carried_grade, pinned)) = self.carried_run(line_index) else {
                continue;
            };
            for day in DayIndex::range(pinned) {
                for &grade_index in self.instance.grades_on_line(line_index) {
                    let is_producing = self.lookup(
                        encoding,
                        Table::IsProducing,
                        grade_index,
                        line_index,
                        day,
                    )?;
                    let value = i64::from(grade_index == carried_grade);
                    encoding.model.add_fixed(is_producing, value, family);
                }
            }
        }
        Ok(())
    }

    /// Inventory balance, the inventory band and the closing target.
    fn add_inventory(&self, encoding: &mut ScheduleEncoding) -> Result<(), BuildError> {
        let balance_family = encoding.family_id(ConstraintFamily::InventoryBalance);
        let bounds_family = encoding.family_id(ConstraintFamily::InventoryBounds);
        let closing_family = encoding.family_id(ConstraintFamily::ClosingInventory);

        for grade_index in self.instance.grade_indices() {
            let grade = self.instance.grade(grade_index);
            let daily_capacity = grade
                .allowed_lines()
                .iter()
                .try_fold(0i64, |acc, &line| acc.checked_add(self.instance.line(line).capacity()))
                .ok_or_else(|| BuildError::CapacityOverflow {
                    grade: grade.id().to_string(),
                })?;

            let opening = encoding.model.new_constant(
                grade.initial_inventory(),
                format!("inventory[{},0]", grade.id()),
            );
            encoding.inventory.set(grade_index.get(), 0, opening);

            // Upper bound on the stock any schedule can hold at a day boundary.
            let mut reachable = grade.initial_inventory();
            for day in DayIndex::range(self.num_days) {
                reachable = reachable.checked_add(daily_capacity).ok_or_else(|| {
                    BuildError::InventoryOverflow {
                        grade: grade.id().to_string(),
                        day: day.get() + 1,
                    }
                })?;
                let demand = self.instance.demand(grade_index, day);
                let model = &mut encoding.model;
                let closing = model.new_int_var(
                    0,
                    reachable,
                    format!("inventory[{},{}]", grade.id(), day.get() + 1),
                );
                let shortfall =
                    model.new_int_var(0, demand, format!("stockout[{},{}]", grade.id(), day.get()));
                encoding.inventory.set(grade_index.get(), day.get() + 1, closing);
                encoding.stockout.set(grade_index.get(), day.get(), shortfall);

                let mut inflows = Vec::with_capacity(grade.allowed_lines().len());
                for &line_index in grade.allowed_lines() {
                    let production =
                        self.lookup(encoding, Table::Production, grade_index, line_index, day)?;
                    inflows.push(production);
                }
                let opening = encoding.inventory(grade_index, day);
                encoding.model.add_supply_balance(
                    SupplyBalance {
                        opening,
                        inflows,
                        demand,
                        closing,
                        shortfall,
                    },
                    balance_family,
                );
            }

            if self.config.inventory_bounds == InventoryBoundPolicy::Hard {
                for day in DayIndex::range(self.num_days + 1).skip(1) {
                    let inventory = encoding.inventory(grade_index, day);
                    if grade.min_inventory() > 0 {
                        let expr = LinearExpr::new().term(inventory, 1);
                        encoding.model.add_ge(expr, grade.min_inventory(), bounds_family);
                    }
                    if grade.has_max_inventory() {
                        let expr = LinearExpr::new().term(inventory, 1);
                        encoding.model.add_le(expr, grade.max_inventory(), bounds_family);
                    }
                }
            }

            if grade.min_closing_inventory() > 0 {
                let closing = encoding.inventory(grade_index, DayIndex::new(self.num_days));
                let expr = LinearExpr::new().term(closing, 1);
                encoding.model.add_ge(expr, grade.min_closing_inventory(), closing_family);
            }
        }
        Ok(())
    }

    /// Makes `transition[l, d]` equal to 1 exactly when `d - 1` and `d` are
    /// both active on `l` with different grades.
    fn add_transition_count(&self, encoding: &mut ScheduleEncoding) -> Result<(), BuildError> {
        let family = encoding.family_id(ConstraintFamily::TransitionCount);
        for line_index in self.instance.line_indices() {
            let line = self.instance.line(line_index);
            let grades = self.instance.grades_on_line(line_index);
            if grades.len() < 2 {
                continue;
            }
            for day in DayIndex::new(1).until(DayIndex::new(self.num_days)) {
                let previous_day = DayIndex::new(day.get() - 1);
                let transition = encoding
                    .model
                    .new_bool_var(format!("transition[{},{}]", line.id(), day.get()));
                encoding.transition.set(line_index.get(), day.get(), Some(transition));

                for &grade_index in grades {
                    let before = self.lookup(
                        encoding,
                        Table::IsProducing,
                        grade_index,
                        line_index,
                        previous_day,
                    )?;
                    let after = self.lookup(
                        encoding,
                        Table::IsProducing,
                        grade_index,
                        line_index,
                        day,
                    )?;

                    // transition >= before + (others active today) - 1
                    let mut lower =
                        self.active_sum(encoding, line_index, day, Some(grade_index), -1)?;
                    lower.add_term(transition, 1).add_term(before, -1);
                    encoding.model.add_ge(lower, -1, family);

                    // transition <= 2 - before - after
                    let upper = LinearExpr::new()
                        .term(transition, 1)
                        .term(before, 1)
                        .term(after, 1);
                    encoding.model.add_le(upper, 2, family);
                }

                let mut yesterday = self.active_sum(encoding, line_index, previous_day, None, -1)?;
                yesterday.add_term(transition, 1);
                encoding.model.add_le(yesterday, 0, family);

                let mut today = self.active_sum(encoding, line_index, day, None, -1)?;
                today.add_term(transition, 1);
                encoding.model.add_le(today, 0, family);
            }
        }
        Ok(())
    }

    /// `coef * sum(is_producing[g, line, day])` over the grades on the line,
    /// optionally leaving one grade out.
    fn active_sum(
        &self,
        encoding: &ScheduleEncoding,
        line_index: LineIndex,
        day: DayIndex,
        excluded: Option<GradeIndex>,
        coef: i64,
    ) -> Result<LinearExpr, BuildError> {
        let mut expr = LinearExpr::new();
        for &grade_index in self.instance.grades_on_line(line_index) {
            if excluded == Some(grade_index) {
                continue;
            }
            let is_producing = self.lookup(
                encoding,
                Table::IsProducing,
                grade_index,
                line_index,
                day,
            )?;
            expr.add_term(is_producing, coef);
        }
        Ok(expr)
    }

    /// The carried grade of a line and its pinned prefix, clipped to the
    /// horizon.
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

    fn lookup(
        &self,
        encoding: &ScheduleEncoding,
        table: Table,
        grade_index: GradeIndex,
        line_index: LineIndex,
        day: DayIndex,
    ) -> Result<VarId, BuildError> {
        let map = match table {
            Table::IsProducing => &encoding.is_producing,
            Table::Production => &encoding.production,
            Table::RunStart => &encoding.run_start,
        };
        map.get(&(grade_index, line_index, day))
            .copied()
            .ok_or_else(|| BuildError::MissingVariable {
                table: table.name(),
                grade: self.instance.grade(grade_index).id().to_string(),
                line: self.instance.line(line_index).id().to_string(),
                day: day.get(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Table {
    IsProducing,
    Production,
    RunStart,
}

impl Table {
    #[inline]
    fn name(&self) -> &'static str {
        match self {
            Table::IsProducing => "is_producing",
            Table::Production => "production",
            Table::RunStart => "run_start",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use gradeplan_model::{calendar::Calendar, instance::InstanceBuilder};

    fn calendar(days: usize) -> Calendar {
        Calendar::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), days)
    }

    fn two_line_instance() -> Instance {
        let mut builder = InstanceBuilder::new(calendar(3));
        let a = builder.add_grade("A");
        let b = builder.add_grade("B");
        let l1 = builder.add_line("L1", 10);
        let l2 = builder.add_line("L2", 5);
        builder
            .allow_line(a, l1)
            .allow_line(b, l1)
            .allow_line(b, l2)
            .set_initial_inventory(a, 4);
        builder.build().unwrap()
    }

    #[test]
    fn test_disallowed_combinations_resolve_to_zero() {
        let instance = two_line_instance();
        let config = SolveConfig::default().with_buffer_days(1);
        let encoding = ModelBuilder::new(&instance, &config).build().unwrap();

        let (a, b) = (GradeIndex::new(0), GradeIndex::new(1));
        let (l1, l2) = (LineIndex::new(0), LineIndex::new(1));
        assert_eq!(encoding.num_days(), 4);
        assert_eq!(
            encoding.is_producing(a, l2, DayIndex::new(0)),
            Resolved::Constant(0)
        );
        assert_eq!(
            encoding.production(a, l2, DayIndex::new(3)),
            Resolved::Constant(0)
        );
        assert!(encoding.is_producing(a, l1, DayIndex::new(3)).as_variable().is_some());
        assert!(encoding.run_start(b, l2, DayIndex::new(2)).as_variable().is_some());

        // One decision per allowed cell.
        assert_eq!(encoding.model().decision_order().len(), 3 * 4);
    }

    #[test]
    fn test_inventory_starts_at_initial_stock() {
        let instance = two_line_instance();
        let config = SolveConfig::default().with_buffer_days(0);
        let encoding = ModelBuilder::new(&instance, &config).build().unwrap();

        let opening = encoding.inventory(GradeIndex::new(0), DayIndex::new(0));
        assert_eq!(encoding.model().var_bounds(opening), (4, 4));

        // A gains at most 10 per day on L1.
        let closing = encoding.inventory(GradeIndex::new(0), DayIndex::new(3));
        assert_eq!(encoding.model().var_bounds(closing), (0, 34));
    }

    #[test]
    fn test_transition_indicators_only_on_shared_lines() {
        let instance = two_line_instance();
        let config = SolveConfig::default().with_buffer_days(0);
        let encoding = ModelBuilder::new(&instance, &config).build().unwrap();

        assert_eq!(encoding.transition_vars().count(), 2);
        assert_eq!(
            encoding.transition(LineIndex::new(1), DayIndex::new(1)),
            Resolved::Constant(0)
        );
        assert_eq!(
            encoding.transition(LineIndex::new(0), DayIndex::new(0)),
            Resolved::Constant(0)
        );
    }

    #[test]
    fn test_families_map_back() {
        let instance = two_line_instance();
        let config = SolveConfig::default();
        let encoding = ModelBuilder::new(&instance, &config).build().unwrap();

        assert_eq!(encoding.model().num_families(), ConstraintFamily::COUNT);
        for family in ConstraintFamily::ALL {
            let id = encoding.family_id(family);
            assert_eq!(encoding.family_of(id), Some(family));
            assert_eq!(encoding.model().family_name(id), family.name());
        }
    }

    #[test]
    fn test_encoded_model_validates() {
        let mut builder = InstanceBuilder::new(calendar(4));
        let a = builder.add_grade("A");
        let b = builder.add_grade("B");
        let line = builder.add_line("L1", 10);
        builder
            .allow_line(a, line)
            .allow_line(b, line)
            .set_min_run_days(a, line, 2)
            .set_max_run_days(a, line, 3)
            .set_rerun_allowed(b, line, false)
            .set_forced_start(b, line, DayIndex::new(3))
            .restrict_transitions(line, a)
            .add_shutdown_day(line, DayIndex::new(1))
            .set_inventory_bounds(a, 1, 30)
            .set_min_closing_inventory(b, 5)
            .set_in_progress(line, gradeplan_model::instance::InProgressRun::new(a, 1));
        builder.set_demand(a, DayIndex::new(2), 8);
        let instance = builder.build().unwrap();
        let config = SolveConfig::default();

        let encoding = ModelBuilder::new(&instance, &config).build().unwrap();
        assert_eq!(encoding.model().validate(), Ok(()));
    }

    #[test]
    fn test_reachable_inventory_overflow_is_reported() {
        let mut builder = InstanceBuilder::new(calendar(3));
        let a = builder.add_grade("A");
        let line = builder.add_line("L1", i64::MAX / 2);
        builder.allow_line(a, line);
        let instance = builder.build().unwrap();
        let config = SolveConfig::default().with_buffer_days(0);

        match ModelBuilder::new(&instance, &config).build() {
            Err(BuildError::InventoryOverflow { grade, day }) => {
                assert_eq!(grade, "A");
                assert_eq!(day, 3);
            }
            other => panic!("expected InventoryOverflow, got {:?}", other.map(|e| e.to_string())),
        }
    }
}
