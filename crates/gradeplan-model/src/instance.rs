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

//! The canonical input of a scheduling run.
//!
//! An `Instance` is assembled through `InstanceBuilder` and validated once by
//! `InstanceBuilder::build`. After that it is immutable; the encoder reads it
//! by reference. Per-(grade, line) parameters and per-(grade, day) demand are
//! stored in flattened dense grids.

use crate::{
    calendar::Calendar,
    error::{ConfigurationError, EntityKind},
    index::{DayIndex, GradeIndex, LineIndex},
};
use gradeplan_core::utils::{grid::DenseGrid, index::TypedRange};
use rustc_hash::{FxHashMap, FxHashSet};

/// Sentinel for "no upper inventory bound".
pub const UNBOUNDED_INVENTORY: i64 = i64::MAX;

/// A product type with its inventory targets and the lines it may run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    id: String,
    initial_inventory: i64,
    min_inventory: i64,
    max_inventory: i64,
    min_closing_inventory: i64,
    allowed_lines: Vec<LineIndex>, // sorted, unique
}

impl Grade {
    fn new(id: String) -> Self {
        Self {
            id,
            initial_inventory: 0,
            min_inventory: 0,
            max_inventory: UNBOUNDED_INVENTORY,
            min_closing_inventory: 0,
            allowed_lines: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn initial_inventory(&self) -> i64 {
        self.initial_inventory
    }

    #[inline]
    pub fn min_inventory(&self) -> i64 {
        self.min_inventory
    }

    /// Returns the upper inventory bound, `UNBOUNDED_INVENTORY` if none was set.
    #[inline]
    pub fn max_inventory(&self) -> i64 {
        self.max_inventory
    }

    #[inline]
    pub fn has_max_inventory(&self) -> bool {
        self.max_inventory != UNBOUNDED_INVENTORY
    }

    #[inline]
    pub fn min_closing_inventory(&self) -> i64 {
        self.min_closing_inventory
    }

    #[inline]
    pub fn allowed_lines(&self) -> &[LineIndex] {
        &self.allowed_lines
    }

    #[inline]
    pub fn can_run_on(&self, line: LineIndex) -> bool {
        self.allowed_lines.binary_search(&line).is_ok()
    }
}

/// A run already in progress on a line when the horizon opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InProgressRun {
    grade: GradeIndex,
    remaining_days: usize,
    elapsed_days: usize,
}

impl InProgressRun {
    #[inline]
    pub fn new(grade: GradeIndex, remaining_days: usize) -> Self {
        Self {
            grade,
            remaining_days,
            elapsed_days: 0,
        }
    }

    /// Sets how many days the run had already been producing before day 0.
    #[inline]
    pub fn with_elapsed_days(mut self, elapsed_days: usize) -> Self {
        self.elapsed_days = elapsed_days;
        self
    }

    #[inline]
    pub fn grade(&self) -> GradeIndex {
        self.grade
    }

    #[inline]
    pub fn remaining_days(&self) -> usize {
        self.remaining_days
    }

    #[inline]
    pub fn elapsed_days(&self) -> usize {
        self.elapsed_days
    }
}

/// A production unit running at most one grade per day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    id: String,
    capacity: i64,
    shutdown_days: Vec<DayIndex>, // sorted, unique
    in_progress: Option<InProgressRun>,
}

impl Line {
    fn new(id: String, capacity: i64) -> Self {
        Self {
            id,
            capacity,
            shutdown_days: Vec::new(),
            in_progress: None,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the daily output of the line when it is producing.
    #[inline]
    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    #[inline]
    pub fn shutdown_days(&self) -> &[DayIndex] {
        &self.shutdown_days
    }

    #[inline]
    pub fn is_shutdown(&self, day: DayIndex) -> bool {
        self.shutdown_days.binary_search(&day).is_ok()
    }

    #[inline]
    pub fn in_progress(&self) -> Option<&InProgressRun> {
        self.in_progress.as_ref()
    }
}

/// Run-length bounds, forced start and rerun policy of one (grade, line) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GradeLineParams {
    min_run_days: usize,
    max_run_days: Option<usize>,
    forced_start: Option<DayIndex>,
    rerun_allowed: bool,
}

impl Default for GradeLineParams {
    fn default() -> Self {
        Self {
            min_run_days: 1,
            max_run_days: None,
            forced_start: None,
            rerun_allowed: true,
        }
    }
}

impl GradeLineParams {
    #[inline]
    pub fn min_run_days(&self) -> usize {
        self.min_run_days
    }

    /// Returns the explicit maximum run length, `None` if unbounded.
    #[inline]
    pub fn max_run_days(&self) -> Option<usize> {
        self.max_run_days
    }

    /// Returns the maximum run length clipped to a horizon of `num_days`.
    #[inline]
    pub fn max_run_days_within(&self, num_days: usize) -> usize {
        self.max_run_days.map_or(num_days, |max| max.min(num_days))
    }

    #[inline]
    pub fn forced_start(&self) -> Option<DayIndex> {
        self.forced_start
    }

    #[inline]
    pub fn rerun_allowed(&self) -> bool {
        self.rerun_allowed
    }
}

/// Grade successions permitted on one line.
///
/// A previous grade without an entry may be followed by any grade.
/// Continuing the same grade is never a switch and is always permitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionRule {
    successors: FxHashMap<GradeIndex, FxHashSet<GradeIndex>>,
}

impl TransitionRule {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Permits switching from `from` to `to`.
    #[inline]
    pub fn allow(&mut self, from: GradeIndex, to: GradeIndex) -> &mut Self {
        self.successors.entry(from).or_default().insert(to);
        self
    }

    /// Registers `from` as restricted without permitting any successor yet.
    #[inline]
    pub fn restrict(&mut self, from: GradeIndex) -> &mut Self {
        self.successors.entry(from).or_default();
        self
    }

    #[inline]
    pub fn permits(&self, from: GradeIndex, to: GradeIndex) -> bool {
        from == to
            || self
                .successors
                .get(&from)
                .is_none_or(|allowed| allowed.contains(&to))
    }

    #[inline]
    pub fn is_restricted(&self, from: GradeIndex) -> bool {
        self.successors.contains_key(&from)
    }
}

/// The immutable, validated scheduling instance.
#[derive(Clone)]
pub struct Instance {
    calendar: Calendar,
    grades: Vec<Grade>,                          // len = num_grades
    lines: Vec<Line>,                            // len = num_lines
    params: DenseGrid<GradeLineParams>,          // num_grades x num_lines
    transitions: Vec<Option<TransitionRule>>,    // len = num_lines
    demand: DenseGrid<i64>,                      // num_grades x core_days
    grades_on_line: Vec<Vec<GradeIndex>>,        // len = num_lines
    grade_ids: FxHashMap<String, GradeIndex>,
    line_ids: FxHashMap<String, LineIndex>,
}

impl Instance {
    #[inline]
    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    #[inline]
    pub fn num_grades(&self) -> usize {
        self.grades.len()
    }

    #[inline]
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    /// Returns the number of committed days, excluding any buffer tail.
    #[inline]
    pub fn num_core_days(&self) -> usize {
        self.calendar.core_days()
    }

    #[inline]
    pub fn grades(&self) -> &[Grade] {
        &self.grades
    }

    #[inline]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    #[inline]
    pub fn grade_indices(&self) -> TypedRange<crate::index::GradeIndexTag> {
        GradeIndex::range(self.grades.len())
    }

    #[inline]
    pub fn line_indices(&self) -> TypedRange<crate::index::LineIndexTag> {
        LineIndex::range(self.lines.len())
    }

    /// Returns the grade at `grade_index`.
    ///
    /// # Panics
    ///
    /// Panics if `grade_index` is not in `0..num_grades()`.
    #[inline]
    pub fn grade(&self, grade_index: GradeIndex) -> &Grade {
        let index = grade_index.get();
        debug_assert!(
            index < self.num_grades(),
            "called `Instance::grade` with grade index out of bounds: the len is {} but the index is {}",
            self.num_grades(),
            index
        );
        &self.grades[index]
    }

    /// Returns the line at `line_index`.
    ///
    /// # Panics
    ///
    /// Panics if `line_index` is not in `0..num_lines()`.
    #[inline]
    pub fn line(&self, line_index: LineIndex) -> &Line {
        let index = line_index.get();
        debug_assert!(
            index < self.num_lines(),
            "called `Instance::line` with line index out of bounds: the len is {} but the index is {}",
            self.num_lines(),
            index
        );
        &self.lines[index]
    }

    #[inline]
    pub fn grade_index(&self, id: &str) -> Option<GradeIndex> {
        self.grade_ids.get(id).copied()
    }

    #[inline]
    pub fn line_index(&self, id: &str) -> Option<LineIndex> {
        self.line_ids.get(id).copied()
    }

    #[inline]
    pub fn is_allowed(&self, grade_index: GradeIndex, line_index: LineIndex) -> bool {
        self.grade(grade_index).can_run_on(line_index)
    }

    /// Returns the grades permitted on `line_index`, in ascending index order.
    #[inline]
    pub fn grades_on_line(&self, line_index: LineIndex) -> &[GradeIndex] {
        &self.grades_on_line[line_index.get()]
    }

    #[inline]
    pub fn params(&self, grade_index: GradeIndex, line_index: LineIndex) -> &GradeLineParams {
        self.params.get(grade_index.get(), line_index.get())
    }

    #[inline]
    pub fn transition_rule(&self, line_index: LineIndex) -> Option<&TransitionRule> {
        self.transitions[line_index.get()].as_ref()
    }

    /// Returns `true` if `to` may directly follow `from` on `line_index`.
    #[inline]
    pub fn permits_transition(
        &self,
        line_index: LineIndex,
        from: GradeIndex,
        to: GradeIndex,
    ) -> bool {
        self.transition_rule(line_index)
            .is_none_or(|rule| rule.permits(from, to))
    }

    /// Returns the demand of `grade_index` on `day`; zero past the core days.
    #[inline]
    pub fn demand(&self, grade_index: GradeIndex, day: DayIndex) -> i64 {
        self.demand
            .try_get(grade_index.get(), day.get())
            .copied()
            .unwrap_or(0)
    }

    #[inline]
    pub fn total_demand(&self, grade_index: GradeIndex) -> i64 {
        self.demand
            .row(grade_index.get())
            .iter()
            .fold(0i64, |acc, &q| acc.saturating_add(q))
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("calendar", &self.calendar)
            .field("grades", &self.grades)
            .field("lines", &self.lines)
            .field("params", &self.params)
            .field("transitions", &self.transitions)
            .field("demand", &self.demand)
            .finish()
    }
}

impl std::fmt::Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Instance(grades: {}, lines: {}, days: {})",
            self.num_grades(),
            self.num_lines(),
            self.num_core_days()
        )
    }
}

/// Mutable assembly of an `Instance`.
///
/// | Field | Default |
/// | :--- | :--- |
/// | inventory (initial, min, closing) | `0` |
/// | max inventory | unbounded |
/// | allowed lines | none |
/// | min / max run days | `1` / unbounded |
/// | forced start | none |
/// | rerun allowed | `true` |
/// | transitions | unrestricted |
/// | demand | `0` |
#[derive(Debug, Clone)]
pub struct InstanceBuilder {
    calendar: Calendar,
    grades: Vec<Grade>,
    lines: Vec<Line>,
    params: FxHashMap<(GradeIndex, LineIndex), GradeLineParams>,
    transitions: FxHashMap<LineIndex, TransitionRule>,
    demand: Vec<Vec<i64>>,
}

impl InstanceBuilder {
    pub fn new(calendar: Calendar) -> Self {
        Self {
            calendar,
            grades: Vec::new(),
            lines: Vec::new(),
            params: FxHashMap::default(),
            transitions: FxHashMap::default(),
            demand: Vec::new(),
        }
    }

    #[inline]
    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    #[inline]
    pub fn num_grades(&self) -> usize {
        self.grades.len()
    }

    #[inline]
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    /// Adds a grade with default inventory settings and returns its index.
    pub fn add_grade(&mut self, id: impl Into<String>) -> GradeIndex {
        let index = GradeIndex::new(self.grades.len());
        self.grades.push(Grade::new(id.into()));
        self.demand.push(vec![0; self.calendar.core_days()]);
        index
    }

    /// Adds a line with the given daily capacity and returns its index.
    pub fn add_line(&mut self, id: impl Into<String>, capacity: i64) -> LineIndex {
        let index = LineIndex::new(self.lines.len());
        self.lines.push(Line::new(id.into(), capacity));
        index
    }

    #[inline]
    fn grade_mut(&mut self, grade_index: GradeIndex, caller: &str) -> &mut Grade {
        let index = grade_index.get();
        debug_assert!(
            index < self.grades.len(),
            "called `InstanceBuilder::{}` with grade index out of bounds: the len is {} but the index is {}",
            caller,
            self.grades.len(),
            index
        );
        &mut self.grades[index]
    }

    #[inline]
    fn line_mut(&mut self, line_index: LineIndex, caller: &str) -> &mut Line {
        let index = line_index.get();
        debug_assert!(
            index < self.lines.len(),
            "called `InstanceBuilder::{}` with line index out of bounds: the len is {} but the index is {}",
            caller,
            self.lines.len(),
            index
        );
        &mut self.lines[index]
    }

    #[inline]
    fn params_mut(
        &mut self,
        grade_index: GradeIndex,
        line_index: LineIndex,
    ) -> &mut GradeLineParams {
        self.params.entry((grade_index, line_index)).or_default()
    }

    pub fn set_initial_inventory(&mut self, grade_index: GradeIndex, quantity: i64) -> &mut Self {
        self.grade_mut(grade_index, "set_initial_inventory")
            .initial_inventory = quantity;
        self
    }

    /// Sets the inventory band; pass `UNBOUNDED_INVENTORY` as `max` for none.
    pub fn set_inventory_bounds(
        &mut self,
        grade_index: GradeIndex,
        min: i64,
        max: i64,
    ) -> &mut Self {
        let grade = self.grade_mut(grade_index, "set_inventory_bounds");
        grade.min_inventory = min;
        grade.max_inventory = max;
        self
    }

    pub fn set_min_closing_inventory(
        &mut self,
        grade_index: GradeIndex,
        quantity: i64,
    ) -> &mut Self {
        self.grade_mut(grade_index, "set_min_closing_inventory")
            .min_closing_inventory = quantity;
        self
    }

    /// Permits `grade_index` to run on `line_index`.
    pub fn allow_line(&mut self, grade_index: GradeIndex, line_index: LineIndex) -> &mut Self {
        let grade = self.grade_mut(grade_index, "allow_line");
        if let Err(position) = grade.allowed_lines.binary_search(&line_index) {
            grade.allowed_lines.insert(position, line_index);
        }
        self
    }

    pub fn set_min_run_days(
        &mut self,
        grade_index: GradeIndex,
        line_index: LineIndex,
        days: usize,
    ) -> &mut Self {
        self.params_mut(grade_index, line_index).min_run_days = days;
        self
    }

    pub fn set_max_run_days(
        &mut self,
        grade_index: GradeIndex,
        line_index: LineIndex,
        days: usize,
    ) -> &mut Self {
        self.params_mut(grade_index, line_index).max_run_days = Some(days);
        self
    }

    /// Requires `grade_index` to be producing on `line_index` on `day`.
    pub fn set_forced_start(
        &mut self,
        grade_index: GradeIndex,
        line_index: LineIndex,
        day: DayIndex,
    ) -> &mut Self {
        self.params_mut(grade_index, line_index).forced_start = Some(day);
        self
    }

    pub fn set_rerun_allowed(
        &mut self,
        grade_index: GradeIndex,
        line_index: LineIndex,
        allowed: bool,
    ) -> &mut Self {
        self.params_mut(grade_index, line_index).rerun_allowed = allowed;
        self
    }

    pub fn add_shutdown_day(&mut self, line_index: LineIndex, day: DayIndex) -> &mut Self {
        let line = self.line_mut(line_index, "add_shutdown_day");
        if let Err(position) = line.shutdown_days.binary_search(&day) {
            line.shutdown_days.insert(position, day);
        }
        self
    }

    pub fn set_in_progress(&mut self, line_index: LineIndex, run: InProgressRun) -> &mut Self {
        self.line_mut(line_index, "set_in_progress").in_progress = Some(run);
        self
    }

    /// Permits `to` directly after `from` on `line_index`.
    ///
    /// The first call for a line turns its rule from unrestricted into an
    /// explicit whitelist for every `from` grade mentioned.
    pub fn allow_transition(
        &mut self,
        line_index: LineIndex,
        from: GradeIndex,
        to: GradeIndex,
    ) -> &mut Self {
        self.transitions.entry(line_index).or_default().allow(from, to);
        self
    }

    /// Marks `from` as restricted on `line_index` (no successor permitted
    /// unless added through `allow_transition`).
    pub fn restrict_transitions(&mut self, line_index: LineIndex, from: GradeIndex) -> &mut Self {
        self.transitions.entry(line_index).or_default().restrict(from);
        self
    }

    /// Sets the demand of `grade_index` on core day `day`.
    ///
    /// # Panics
    ///
    /// Panics if `day` is not a core day of the calendar.
    pub fn set_demand(
        &mut self,
        grade_index: GradeIndex,
        day: DayIndex,
        quantity: i64,
    ) -> &mut Self {
        debug_assert!(
            day.get() < self.calendar.core_days(),
            "called `InstanceBuilder::set_demand` with day out of bounds: the len is {} but the index is {}",
            self.calendar.core_days(),
            day.get()
        );
        self.demand[grade_index.get()][day.get()] = quantity;
        self
    }

    /// Adds `quantity` to the demand of `grade_index` on `day`.
    pub fn add_demand(
        &mut self,
        grade_index: GradeIndex,
        day: DayIndex,
        quantity: i64,
    ) -> &mut Self {
        let cell = &mut self.demand[grade_index.get()][day.get()];
        *cell = cell.saturating_add(quantity);
        self
    }

    /// Validates the assembled data and freezes it into an `Instance`.
    pub fn build(self) -> Result<Instance, ConfigurationError> {
        let num_days = self.calendar.core_days();

        let mut grade_ids = FxHashMap::default();
        for (index, grade) in self.grades.iter().enumerate() {
            if grade_ids.insert(grade.id.clone(), GradeIndex::new(index)).is_some() {
                return Err(ConfigurationError::DuplicateId {
                    kind: EntityKind::Grade,
                    id: grade.id.clone(),
                });
            }
        }

        let mut line_ids = FxHashMap::default();
        for (index, line) in self.lines.iter().enumerate() {
            if line_ids.insert(line.id.clone(), LineIndex::new(index)).is_some() {
                return Err(ConfigurationError::DuplicateId {
                    kind: EntityKind::Line,
                    id: line.id.clone(),
                });
            }
        }

        for (index, line) in self.lines.iter().enumerate() {
            self.validate_line(LineIndex::new(index), line, num_days)?;
        }

        for (grade, demand) in self.grades.iter().zip(&self.demand) {
            Self::validate_grade(grade, demand)?;
        }

        let mut keys: Vec<(GradeIndex, LineIndex)> = self.params.keys().copied().collect();
        keys.sort_unstable();
        for &(grade_index, line_index) in &keys {
            let params = &self.params[&(grade_index, line_index)];
            self.validate_params(grade_index, line_index, params, num_days)?;
        }

        let num_grades = self.grades.len();
        let num_lines = self.lines.len();

        let mut params = DenseGrid::filled(num_grades, num_lines, GradeLineParams::default());
        for (&(grade_index, line_index), &value) in &self.params {
            params.set(grade_index.get(), line_index.get(), value);
        }

        let mut demand = DenseGrid::filled(num_grades, num_days, 0i64);
        for (grade_index, row) in self.demand.iter().enumerate() {
            for (day, &quantity) in row.iter().enumerate() {
                demand.set(grade_index, day, quantity);
            }
        }

        let mut grades_on_line = vec![Vec::new(); num_lines];
        for (grade_index, grade) in self.grades.iter().enumerate() {
            for line_index in &grade.allowed_lines {
                grades_on_line[line_index.get()].push(GradeIndex::new(grade_index));
            }
        }

        let mut transitions = self.transitions;
        let transitions: Vec<Option<TransitionRule>> = LineIndex::range(num_lines)
            .map(|line_index| transitions.remove(&line_index))
            .collect();

        Ok(Instance {
            calendar: self.calendar,
            grades: self.grades,
            lines: self.lines,
            params,
            transitions,
            demand,
            grades_on_line,
            grade_ids,
            line_ids,
        })
    }

    fn validate_line(
        &self,
        line_index: LineIndex,
        line: &Line,
        num_days: usize,
    ) -> Result<(), ConfigurationError> {
        if line.capacity < 0 {
            return Err(ConfigurationError::NegativeCapacity {
                line: line.id.clone(),
                capacity: line.capacity,
            });
        }

        if let Some(&last) = line.shutdown_days.last() {
            if last.get() >= num_days {
                return Err(ConfigurationError::ShutdownOutsideHorizon {
                    line: line.id.clone(),
                    day: last.get(),
                    num_days,
                });
            }
        }

        if let Some(run) = &line.in_progress {
            if run.remaining_days == 0 {
                return Err(ConfigurationError::InProgressWithoutRemaining {
                    line: line.id.clone(),
                });
            }
            let grade = &self.grades[run.grade.get()];
            if !grade.can_run_on(line_index) {
                return Err(ConfigurationError::InProgressOnDisallowedLine {
                    line: line.id.clone(),
                    grade: grade.id.clone(),
                });
            }
        }

        Ok(())
    }

    fn validate_grade(grade: &Grade, demand: &[i64]) -> Result<(), ConfigurationError> {
        let non_negative = [
            ("initial_inventory", grade.initial_inventory),
            ("min_inventory", grade.min_inventory),
            ("min_closing_inventory", grade.min_closing_inventory),
        ];
        for (field, value) in non_negative {
            if value < 0 {
                return Err(ConfigurationError::NegativeQuantity {
                    grade: grade.id.clone(),
                    field,
                    value,
                });
            }
        }

        if grade.min_inventory > grade.max_inventory {
            return Err(ConfigurationError::InventoryBounds {
                grade: grade.id.clone(),
                min: grade.min_inventory,
                max: grade.max_inventory,
            });
        }

        if let Some(&negative) = demand.iter().find(|&&q| q < 0) {
            return Err(ConfigurationError::NegativeQuantity {
                grade: grade.id.clone(),
                field: "demand",
                value: negative,
            });
        }

        let total: i64 = demand.iter().fold(0i64, |acc, &q| acc.saturating_add(q));
        if total > 0 && grade.allowed_lines.is_empty() {
            return Err(ConfigurationError::DemandWithoutLines {
                grade: grade.id.clone(),
                demand: total,
            });
        }

        Ok(())
    }

    fn validate_params(
        &self,
        grade_index: GradeIndex,
        line_index: LineIndex,
        params: &GradeLineParams,
        num_days: usize,
    ) -> Result<(), ConfigurationError> {
        let grade = &self.grades[grade_index.get()];
        let line = &self.lines[line_index.get()];

        let max_below_min = params.max_run_days.is_some_and(|max| max < params.min_run_days);
        if params.min_run_days == 0 || max_below_min {
            return Err(ConfigurationError::RunBounds {
                grade: grade.id.clone(),
                line: line.id.clone(),
                min: params.min_run_days,
                max: params.max_run_days.unwrap_or(num_days),
            });
        }

        if let Some(day) = params.forced_start {
            if day.get() >= num_days {
                return Err(ConfigurationError::ForcedStartOutsideHorizon {
                    grade: grade.id.clone(),
                    line: line.id.clone(),
                    day: day.get(),
                    num_days,
                });
            }
            if !grade.can_run_on(line_index) {
                return Err(ConfigurationError::ForcedStartOnDisallowedLine {
                    grade: grade.id.clone(),
                    line: line.id.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn calendar(days: usize) -> Calendar {
        Calendar::new(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), days)
    }

    fn two_grade_builder() -> (InstanceBuilder, GradeIndex, GradeIndex, LineIndex) {
        let mut builder = InstanceBuilder::new(calendar(4));
        let a = builder.add_grade("A");
        let b = builder.add_grade("B");
        let l = builder.add_line("L1", 100);
        builder.allow_line(a, l).allow_line(b, l);
        (builder, a, b, l)
    }

    #[test]
    fn test_build_exposes_validated_data() {
        let (mut builder, a, b, l) = two_grade_builder();
        builder
            .set_initial_inventory(a, 20)
            .set_inventory_bounds(a, 5, 300)
            .set_min_closing_inventory(a, 10)
            .set_min_run_days(a, l, 2)
            .set_max_run_days(a, l, 3)
            .set_rerun_allowed(b, l, false)
            .add_shutdown_day(l, DayIndex::new(2))
            .add_shutdown_day(l, DayIndex::new(1))
            .set_demand(a, DayIndex::new(0), 40)
            .add_demand(a, DayIndex::new(0), 10)
            .set_demand(b, DayIndex::new(3), 7);

        let instance = builder.build().unwrap();

        assert_eq!(instance.num_grades(), 2);
        assert_eq!(instance.num_lines(), 1);
        assert_eq!(instance.num_core_days(), 4);
        assert_eq!(instance.grade_index("B"), Some(b));
        assert_eq!(instance.line_index("L1"), Some(l));
        assert_eq!(instance.line_index("L9"), None);

        let grade = instance.grade(a);
        assert_eq!(grade.initial_inventory(), 20);
        assert_eq!(grade.min_inventory(), 5);
        assert_eq!(grade.max_inventory(), 300);
        assert!(grade.has_max_inventory());
        assert!(!instance.grade(b).has_max_inventory());

        assert_eq!(instance.params(a, l).min_run_days(), 2);
        assert_eq!(instance.params(a, l).max_run_days(), Some(3));
        assert!(!instance.params(b, l).rerun_allowed());
        assert_eq!(instance.params(b, l).max_run_days_within(4), 4);

        assert_eq!(
            instance.line(l).shutdown_days(),
            &[DayIndex::new(1), DayIndex::new(2)]
        );
        assert!(instance.line(l).is_shutdown(DayIndex::new(2)));
        assert!(!instance.line(l).is_shutdown(DayIndex::new(0)));

        assert_eq!(instance.demand(a, DayIndex::new(0)), 50);
        assert_eq!(instance.demand(b, DayIndex::new(3)), 7);
        // Past the core days demand is zero.
        assert_eq!(instance.demand(b, DayIndex::new(6)), 0);
        assert_eq!(instance.total_demand(a), 50);

        assert_eq!(instance.grades_on_line(l), &[a, b]);
    }

    #[test]
    fn test_transition_rule_semantics() {
        let (mut builder, a, b, l) = two_grade_builder();
        let c = builder.add_grade("C");
        builder.allow_line(c, l);
        builder.allow_transition(l, a, c);

        let instance = builder.build().unwrap();

        assert!(instance.permits_transition(l, a, c));
        assert!(!instance.permits_transition(l, a, b));
        assert!(instance.permits_transition(l, a, a));
        // `B` has no entry, so it is unrestricted.
        assert!(instance.permits_transition(l, b, a));
    }

    #[test]
    fn test_restrict_without_successors() {
        let (mut builder, a, b, l) = two_grade_builder();
        builder.restrict_transitions(l, a);
        let instance = builder.build().unwrap();

        assert!(!instance.permits_transition(l, a, b));
        assert!(instance.transition_rule(l).unwrap().is_restricted(a));
    }

    #[test]
    fn test_rejects_negative_capacity() {
        let mut builder = InstanceBuilder::new(calendar(2));
        builder.add_line("L1", -1);
        assert_eq!(
            builder.build().unwrap_err(),
            ConfigurationError::NegativeCapacity {
                line: "L1".to_string(),
                capacity: -1
            }
        );
    }

    #[test]
    fn test_rejects_inverted_inventory_bounds() {
        let (mut builder, a, _, _) = two_grade_builder();
        builder.set_inventory_bounds(a, 10, 5);
        assert!(matches!(
            builder.build(),
            Err(ConfigurationError::InventoryBounds { min: 10, max: 5, .. })
        ));
    }

    #[test]
    fn test_rejects_inverted_run_bounds() {
        let (mut builder, a, _, l) = two_grade_builder();
        builder.set_min_run_days(a, l, 4).set_max_run_days(a, l, 2);
        assert!(matches!(
            builder.build(),
            Err(ConfigurationError::RunBounds { min: 4, max: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_forced_start_outside_horizon() {
        let (mut builder, a, _, l) = two_grade_builder();
        builder.set_forced_start(a, l, DayIndex::new(4));
        assert!(matches!(
            builder.build(),
            Err(ConfigurationError::ForcedStartOutsideHorizon { day: 4, num_days: 4, .. })
        ));
    }

    #[test]
    fn test_rejects_forced_start_on_disallowed_line() {
        let mut builder = InstanceBuilder::new(calendar(3));
        let a = builder.add_grade("A");
        let l1 = builder.add_line("L1", 10);
        let l2 = builder.add_line("L2", 10);
        builder.allow_line(a, l1);
        builder.set_forced_start(a, l2, DayIndex::new(0));

        assert_eq!(
            builder.build().unwrap_err(),
            ConfigurationError::ForcedStartOnDisallowedLine {
                grade: "A".to_string(),
                line: "L2".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_demand_without_lines() {
        let mut builder = InstanceBuilder::new(calendar(3));
        let a = builder.add_grade("A");
        builder.set_demand(a, DayIndex::new(1), 5);
        assert!(matches!(
            builder.build(),
            Err(ConfigurationError::DemandWithoutLines { demand: 5, .. })
        ));
    }

    #[test]
    fn test_grade_without_demand_may_have_no_lines() {
        let mut builder = InstanceBuilder::new(calendar(3));
        builder.add_grade("A");
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_rejects_negative_demand() {
        let (mut builder, a, _, _) = two_grade_builder();
        builder.set_demand(a, DayIndex::new(1), -3);
        assert!(matches!(
            builder.build(),
            Err(ConfigurationError::NegativeQuantity { field: "demand", value: -3, .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let mut builder = InstanceBuilder::new(calendar(3));
        builder.add_grade("A");
        builder.add_grade("A");
        assert_eq!(
            builder.build().unwrap_err(),
            ConfigurationError::DuplicateId {
                kind: EntityKind::Grade,
                id: "A".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_shutdown_outside_horizon() {
        let (mut builder, _, _, l) = two_grade_builder();
        builder.add_shutdown_day(l, DayIndex::new(9));
        assert!(matches!(
            builder.build(),
            Err(ConfigurationError::ShutdownOutsideHorizon { day: 9, .. })
        ));
    }

    #[test]
    fn test_rejects_in_progress_on_disallowed_line() {
        let mut builder = InstanceBuilder::new(calendar(3));
        let a = builder.add_grade("A");
        let l = builder.add_line("L1", 10);
        builder.set_in_progress(l, InProgressRun::new(a, 2));
        assert!(matches!(
            builder.build(),
            Err(ConfigurationError::InProgressOnDisallowedLine { .. })
        ));
    }

    #[test]
    fn test_rejects_in_progress_without_remaining_days() {
        let (mut builder, a, _, l) = two_grade_builder();
        builder.set_in_progress(l, InProgressRun::new(a, 0));
        assert!(matches!(
            builder.build(),
            Err(ConfigurationError::InProgressWithoutRemaining { .. })
        ));
    }
}
