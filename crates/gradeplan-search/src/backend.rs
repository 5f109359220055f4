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

//! # Solver Backends
//!
//! The seam between the scheduler and whatever searches a `CpModel`. A
//! backend receives the model, the search parameters and an improvement
//! callback, and returns a `SolverOutcome`. Structural defects of the model
//! surface as `BackendError::ModelInvalid`, never as an infeasible outcome.

use crate::{
    incumbent::ImprovementCallback,
    model::{CpModel, ModelError},
    result::SolverOutcome,
};
use std::time::Duration;

/// Limits and knobs of one solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParameters {
    /// Wall-clock budget of the whole solve.
    pub time_limit: Duration,
    /// Number of parallel search workers; at least one is always used.
    pub num_workers: usize,
    /// Seed for every randomized choice. Equal seeds and worker counts give
    /// equal searches up to thread timing.
    pub seed: u64,
    /// Emit periodic progress lines through `tracing`.
    pub log_progress: bool,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(600),
            num_workers: 8,
            seed: 42,
            log_progress: false,
        }
    }
}

impl std::fmt::Display for SearchParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SearchParameters(time_limit: {:.3}s, workers: {}, seed: {}, log: {})",
            self.time_limit.as_secs_f64(),
            self.num_workers,
            self.seed,
            self.log_progress
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("model is invalid: {0}")]
    ModelInvalid(#[from] ModelError),

    #[error("search worker `{worker}` panicked")]
    WorkerPanicked { worker: String },

    #[error("no search workers configured")]
    NoWorkers,
}

/// A combinatorial search engine able to minimize a `CpModel`.
pub trait SolverBackend {
    fn name(&self) -> &str;

    /// Minimizes `model` within `parameters`, reporting each strict
    /// improvement to `callback` in order.
    fn solve(
        &mut self,
        model: &CpModel,
        parameters: &SearchParameters,
        callback: &mut (dyn ImprovementCallback + Send),
    ) -> Result<SolverOutcome, BackendError>;
}
