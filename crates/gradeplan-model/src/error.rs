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

//! Errors raised while assembling or validating an instance or a solve
//! configuration. Every variant names the offending entity and field so a
//! caller can point the planner at the exact input row.

use chrono::NaiveDate;

/// The kind of entity an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Grade,
    Line,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Grade => write!(f, "grade"),
            EntityKind::Line => write!(f, "line"),
        }
    }
}

/// A malformed instance or configuration. Fatal; raised before solving.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("calendar is empty: no demand dates were given")]
    EmptyCalendar,

    #[error("calendar is not contiguous: {previous} is followed by {next}")]
    CalendarGap { previous: NaiveDate, next: NaiveDate },

    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: EntityKind, id: String },

    #[error("unknown {kind} id `{id}` referenced by {context}")]
    UnknownId {
        kind: EntityKind,
        id: String,
        context: String,
    },

    #[error("line `{line}`: capacity must be non-negative, got {capacity}")]
    NegativeCapacity { line: String, capacity: i64 },

    #[error("grade `{grade}`: `{field}` must be non-negative, got {value}")]
    NegativeQuantity {
        grade: String,
        field: &'static str,
        value: i64,
    },

    #[error("grade `{grade}`: min_inventory {min} exceeds max_inventory {max}")]
    InventoryBounds { grade: String, min: i64, max: i64 },

    #[error("grade `{grade}` on line `{line}`: invalid run bounds (min {min}, max {max})")]
    RunBounds {
        grade: String,
        line: String,
        min: usize,
        max: usize,
    },

    #[error(
        "grade `{grade}` on line `{line}`: forced start day {day} is outside the horizon of {num_days} days"
    )]
    ForcedStartOutsideHorizon {
        grade: String,
        line: String,
        day: usize,
        num_days: usize,
    },

    #[error("grade `{grade}`: forced start on line `{line}`, which the grade may not run on")]
    ForcedStartOnDisallowedLine { grade: String, line: String },

    #[error("grade `{grade}` has a total demand of {demand} but no allowed lines")]
    DemandWithoutLines { grade: String, demand: i64 },

    #[error("line `{line}`: shutdown day {day} is outside the horizon of {num_days} days")]
    ShutdownOutsideHorizon {
        line: String,
        day: usize,
        num_days: usize,
    },

    #[error("{entity}: `{field}` date {date} is outside the planning calendar")]
    DateOutsideCalendar {
        entity: String,
        field: &'static str,
        date: NaiveDate,
    },

    #[error("line `{line}`: in-progress grade `{grade}` may not run on this line")]
    InProgressOnDisallowedLine { line: String, grade: String },

    #[error("line `{line}`: in-progress run has no remaining days")]
    InProgressWithoutRemaining { line: String },

    #[error("invalid configuration `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_entity() {
        let err = ConfigurationError::NegativeCapacity {
            line: "L1".to_string(),
            capacity: -5,
        };
        assert_eq!(
            err.to_string(),
            "line `L1`: capacity must be non-negative, got -5"
        );

        let err = ConfigurationError::UnknownId {
            kind: EntityKind::Grade,
            id: "X".to_string(),
            context: "demand".to_string(),
        };
        assert_eq!(err.to_string(), "unknown grade id `X` referenced by demand");
    }
}
