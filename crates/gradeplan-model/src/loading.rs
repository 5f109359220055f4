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

//! JSON instance loader.
//!
//! Reads the tabular instance document (grades, lines, grade-line
//! parameters, transition rules and demand rows) and resolves every
//! calendar date to a day index. The calendar is the sorted, contiguous
//! set of demand dates. Optional fields are defaulted here so the rest of
//! the pipeline never sees a partially specified entity.

use crate::{
    calendar::Calendar,
    config::SolveConfig,
    error::{ConfigurationError, EntityKind},
    index::{DayIndex, GradeIndex, LineIndex},
    instance::{InProgressRun, Instance, InstanceBuilder, UNBOUNDED_INVENTORY},
};
use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::{io::Read, path::Path};

/// Errors raised while loading an instance or configuration document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstanceDocument {
    grades: Vec<GradeRecord>,
    lines: Vec<LineRecord>,
    #[serde(default)]
    grade_lines: Vec<GradeLineRecord>,
    #[serde(default)]
    transitions: Vec<TransitionRecord>,
    demand: Vec<DemandRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GradeRecord {
    id: String,
    #[serde(default)]
    initial_inventory: i64,
    #[serde(default)]
    min_inventory: i64,
    max_inventory: Option<i64>,
    #[serde(default)]
    min_closing_inventory: i64,
    #[serde(default)]
    lines: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LineRecord {
    id: String,
    capacity: i64,
    #[serde(default)]
    shutdown_dates: Vec<NaiveDate>,
    in_progress: Option<InProgressRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InProgressRecord {
    grade: String,
    remaining_days: usize,
    #[serde(default)]
    elapsed_days: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GradeLineRecord {
    grade: String,
    line: String,
    min_run_days: Option<usize>,
    max_run_days: Option<usize>,
    force_start_date: Option<NaiveDate>,
    rerun_allowed: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TransitionRecord {
    line: String,
    from: String,
    to: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DemandRecord {
    grade: String,
    date: NaiveDate,
    quantity: i64,
}

/// Resolves ids against the entities registered so far.
struct IdTable {
    grades: FxHashMap<String, GradeIndex>,
    lines: FxHashMap<String, LineIndex>,
}

impl IdTable {
    fn grade(&self, id: &str, context: &str) -> Result<GradeIndex, ConfigurationError> {
        self.grades
            .get(id)
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownId {
                kind: EntityKind::Grade,
                id: id.to_string(),
                context: context.to_string(),
            })
    }

    fn line(&self, id: &str, context: &str) -> Result<LineIndex, ConfigurationError> {
        self.lines
            .get(id)
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownId {
                kind: EntityKind::Line,
                id: id.to_string(),
                context: context.to_string(),
            })
    }
}

fn resolve_date(
    calendar: &Calendar,
    date: NaiveDate,
    entity: impl FnOnce() -> String,
    field: &'static str,
) -> Result<DayIndex, ConfigurationError> {
    calendar
        .day_of(date)
        .ok_or_else(|| ConfigurationError::DateOutsideCalendar {
            entity: entity(),
            field,
            date,
        })
}

fn build_instance(document: InstanceDocument) -> Result<Instance, ConfigurationError> {
    let calendar = Calendar::from_dates(document.demand.iter().map(|row| row.date))?;
    let mut builder = InstanceBuilder::new(calendar);
    let mut ids = IdTable {
        grades: FxHashMap::default(),
        lines: FxHashMap::default(),
    };

    // Duplicates are reported by `InstanceBuilder::build`; the first
    // occurrence wins for id resolution.
    for record in &document.lines {
        let index = builder.add_line(record.id.clone(), record.capacity);
        ids.lines.entry(record.id.clone()).or_insert(index);
    }
    for record in &document.grades {
        let index = builder.add_grade(record.id.clone());
        ids.grades.entry(record.id.clone()).or_insert(index);
    }

    for (position, record) in document.grades.iter().enumerate() {
        let grade = GradeIndex::new(position);
        builder
            .set_initial_inventory(grade, record.initial_inventory)
            .set_inventory_bounds(
                grade,
                record.min_inventory,
                record.max_inventory.unwrap_or(UNBOUNDED_INVENTORY),
            )
            .set_min_closing_inventory(grade, record.min_closing_inventory);
        for line_id in &record.lines {
            let line = ids.line(line_id, &format!("grade `{}`", record.id))?;
            builder.allow_line(grade, line);
        }
    }

    for (position, record) in document.lines.iter().enumerate() {
        let line = LineIndex::new(position);
        for &date in &record.shutdown_dates {
            let day = resolve_date(&calendar, date, || format!("line `{}`", record.id), "shutdown_dates")?;
            builder.add_shutdown_day(line, day);
        }
        if let Some(run) = &record.in_progress {
            let grade = ids.grade(&run.grade, &format!("in-progress run of line `{}`", record.id))?;
            builder.set_in_progress(
                line,
                InProgressRun::new(grade, run.remaining_days).with_elapsed_days(run.elapsed_days),
            );
        }
    }

    for record in &document.grade_lines {
        let context = format!("grade_lines entry `{}`/`{}`", record.grade, record.line);
        let grade = ids.grade(&record.grade, &context)?;
        let line = ids.line(&record.line, &context)?;
        if let Some(days) = record.min_run_days {
            builder.set_min_run_days(grade, line, days);
        }
        if let Some(days) = record.max_run_days {
            builder.set_max_run_days(grade, line, days);
        }
        if let Some(allowed) = record.rerun_allowed {
            builder.set_rerun_allowed(grade, line, allowed);
        }
        if let Some(date) = record.force_start_date {
            let day = resolve_date(&calendar, date, || context.clone(), "force_start_date")?;
            builder.set_forced_start(grade, line, day);
        }
    }

    for record in &document.transitions {
        let context = format!("transition rule of line `{}`", record.line);
        let line = ids.line(&record.line, &context)?;
        let from = ids.grade(&record.from, &context)?;
        builder.restrict_transitions(line, from);
        for to_id in &record.to {
            let to = ids.grade(to_id, &context)?;
            builder.allow_transition(line, from, to);
        }
    }

    for record in &document.demand {
        let grade = ids.grade(&record.grade, "demand")?;
        let day = resolve_date(&calendar, record.date, || format!("grade `{}`", record.grade), "demand")?;
        builder.add_demand(grade, day, record.quantity);
    }

    let instance = builder.build()?;
    tracing::debug!(
        grades = instance.num_grades(),
        lines = instance.num_lines(),
        days = instance.num_core_days(),
        start = %calendar.start(),
        "loaded instance"
    );
    Ok(instance)
}

/// Loads an instance from a JSON string.
pub fn load_instance_from_str(json: &str) -> Result<Instance, LoadError> {
    let document: InstanceDocument = serde_json::from_str(json)?;
    Ok(build_instance(document)?)
}

/// Loads an instance from a JSON reader.
pub fn load_instance_from_reader<R: Read>(reader: R) -> Result<Instance, LoadError> {
    let document: InstanceDocument = serde_json::from_reader(reader)?;
    Ok(build_instance(document)?)
}

/// Loads an instance from a JSON file.
pub fn load_instance_from_path<P: AsRef<Path>>(path: P) -> Result<Instance, LoadError> {
    let file = std::fs::File::open(path)?;
    load_instance_from_reader(std::io::BufReader::new(file))
}

/// Loads a `SolveConfig` from a JSON file; absent fields take defaults.
pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> Result<SolveConfig, LoadError> {
    let file = std::fs::File::open(path)?;
    let config: SolveConfig = serde_json::from_reader(std::io::BufReader::new(file))?;
    config.validate()?;
    Ok(config)
}
