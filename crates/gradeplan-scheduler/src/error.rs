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

use gradeplan_model::error::ConfigurationError;
use gradeplan_search::{backend::BackendError, model::ModelError};

/// An internal invariant broken while encoding an instance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("grade `{grade}`: reachable inventory overflows at day {day}")]
    InventoryOverflow { grade: String, day: usize },

    #[error("grade `{grade}`: combined line capacity overflows")]
    CapacityOverflow { grade: String },

    #[error("missing `{table}` variable for grade `{grade}` on line `{line}` at day {day}")]
    MissingVariable {
        table: &'static str,
        grade: String,
        line: String,
        day: usize,
    },
}

/// Every fatal failure of a scheduling run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("model build error: {0}")]
    Build(#[from] BuildError),

    #[error("model rejected by the backend: {0}")]
    ModelInvalid(ModelError),

    #[error("backend error: {0}")]
    Backend(BackendError),

    #[error("solve was already called on this driver")]
    AlreadySolved,
}

impl From<BackendError> for ScheduleError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::ModelInvalid(model_error) => ScheduleError::ModelInvalid(model_error),
            other => ScheduleError::Backend(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_model_errors_become_model_invalid() {
        let err: ScheduleError = BackendError::ModelInvalid(ModelError::ObjectiveOverflow).into();
        match err {
            ScheduleError::ModelInvalid(ModelError::ObjectiveOverflow) => {}
            other => panic!("expected ModelInvalid, got {:?}", other),
        }

        let err: ScheduleError = BackendError::NoWorkers.into();
        match err {
            ScheduleError::Backend(BackendError::NoWorkers) => {}
            other => panic!("expected Backend(NoWorkers), got {:?}", other),
        }
    }

    #[test]
    fn test_messages_carry_the_source() {
        let err: ScheduleError = ConfigurationError::InvalidConfig {
            field: "worker_count",
            reason: "at least one worker is required".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "configuration error: invalid configuration `worker_count`: at least one worker is required"
        );
    }
}
