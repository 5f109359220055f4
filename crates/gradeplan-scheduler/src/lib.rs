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

//! # Gradeplan Scheduler
//!
//! Plans which grade runs on which production line on which day so that
//! demand is met from inventory with as few stockouts and grade switches as
//! possible.
//!
//! ## Pipeline
//!
//! 1. **`encoding`**: `ModelBuilder` turns an `Instance` into a `CpModel`
//!    whose constraints are tagged with a `ConstraintFamily`.
//! 2. **`objective`**: `ObjectiveFunction` weighs stockouts and transitions.
//! 3. **`driver`**: `SolverDriver` runs a `SolverBackend` (by default the
//!    branch-and-bound portfolio) and records every improvement as an
//!    `IncumbentSnapshot` (**`snapshot`**).
//! 4. **`extract`**: `SolutionExtractor` reads runs, series and transition
//!    counts out of the best snapshot.
//! 5. **`result`**: `ScheduleResult`, the serializable report, with
//!    **`diagnostics`** attached when no schedule exists.
//!
//! ```no_run
//! use gradeplan_model::{config::SolveConfig, loading::load_instance_from_path};
//!
//! let instance = load_instance_from_path("instance.json").unwrap();
//! let result = gradeplan_scheduler::plan(&instance, &SolveConfig::default()).unwrap();
//! println!("{}", result.to_json_pretty().unwrap());
//! ```

pub mod diagnostics;
pub mod driver;
pub mod encoding;
pub mod error;
pub mod extract;
pub mod logging;
pub mod objective;
pub mod result;
pub mod snapshot;

use crate::{driver::SolverDriver, error::ScheduleError, result::ScheduleResult};
use gradeplan_model::{config::SolveConfig, instance::Instance};

/// Solves `instance` under `config` and builds the report.
///
/// A rejected model is returned as `ScheduleError::ModelInvalid`; callers
/// that want a report for it use `ScheduleResult::model_invalid`.
pub fn plan(instance: &Instance, config: &SolveConfig) -> Result<ScheduleResult, ScheduleError> {
    let outcome = SolverDriver::new(instance, config).solve()?;
    Ok(ScheduleResult::from_outcome(instance, &outcome))
}
