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

use crate::{
    assignment::Assignment,
    model::CpModel,
    monitor::search_monitor::{SearchCommand, SearchMonitor},
};
use std::time::{Duration, Instant};

/// Emits periodic progress lines through `tracing`.
///
/// Never requests termination.
#[derive(Debug, Clone)]
pub struct LogMonitor {
    worker: String,
    start_time: Instant,
    last_log_time: Instant,
    log_interval: Duration,
    clock_check_mask: u64,
    steps: u64,
    solutions: u64,
    best_objective: Option<i64>,
}

impl LogMonitor {
    pub fn new(worker: impl Into<String>, log_interval: Duration, clock_check_mask: u64) -> Self {
        let now = Instant::now();
        Self {
            worker: worker.into(),
            start_time: now,
            last_log_time: now,
            log_interval,
            clock_check_mask,
            steps: 0,
            solutions: 0,
            best_objective: None,
        }
    }

    /// One line per second, clock read every 4096 steps.
    pub fn for_worker(worker: impl Into<String>) -> Self {
        Self::new(worker, Duration::from_secs(1), 4095)
    }

    #[inline]
    fn log_line(&mut self) {
        let now = Instant::now();
        tracing::info!(
            worker = %self.worker,
            elapsed_s = format!("{:.1}", now.duration_since(self.start_time).as_secs_f32()),
            steps = self.steps,
            solutions = self.solutions,
            best = ?self.best_objective,
            "search progress"
        );
        self.last_log_time = now;
    }
}

impl std::fmt::Display for LogMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LogMonitor(worker: {}, log_interval: {}s, clock_check_mask: {})",
            self.worker,
            self.log_interval.as_secs(),
            self.clock_check_mask
        )
    }
}

impl SearchMonitor for LogMonitor {
    fn name(&self) -> &str {
        "LogMonitor"
    }

    fn on_enter_search(&mut self, model: &CpModel) {
        self.start_time = Instant::now();
        self.last_log_time = self.start_time;
        self.steps = 0;
        self.solutions = 0;
        self.best_objective = None;
        tracing::info!(worker = %self.worker, model = %model, "search started");
    }

    fn on_exit_search(&mut self) {
        tracing::info!(
            worker = %self.worker,
            steps = self.steps,
            solutions = self.solutions,
            best = ?self.best_objective,
            "search finished"
        );
    }

    fn on_solution_found(&mut self, assignment: &Assignment) {
        self.solutions += 1;
        self.best_objective = Some(assignment.objective());
        tracing::info!(
            worker = %self.worker,
            objective = assignment.objective(),
            elapsed_ms = self.start_time.elapsed().as_millis() as u64,
            "improving solution"
        );
    }

    #[inline]
    fn on_step(&mut self) {
        self.steps = self.steps.wrapping_add(1);
        if (self.steps & self.clock_check_mask) == 0
            && self.last_log_time.elapsed() >= self.log_interval
        {
            self.log_line();
        }
    }

    #[inline(always)]
    fn search_command(&self) -> SearchCommand {
        SearchCommand::Continue
    }
}
