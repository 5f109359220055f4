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

//! # Portfolio Solver
//!
//! Runs a portfolio of `PortfolioWorker`s in parallel on one `CpModel`.
//!
//! - Each worker runs on its own scoped thread with a `CompositeMonitor`
//!   made of an `InterruptMonitor` on the shared stop flag, a
//!   `TimeLimitMonitor` and, optionally, a `LogMonitor`.
//! - All workers share one `SharedIncumbent`, which also drives the
//!   improvement callback.
//! - The first worker that exhausts its search tree raises the stop flag.
//!   Exhaustion under the shared bound proves the incumbent optimal, or the
//!   model infeasible when there is no incumbent.
//!
//! Outcome classification:
//!
//! | exhausted | incumbent | result       |
//! |-----------|-----------|--------------|
//! | yes       | yes       | `Optimal`    |
//! | yes       | no        | `Infeasible` |
//! | no        | yes       | `Feasible`   |
//! | no        | no        | `Unknown`    |

use crate::{
    assignment::Assignment,
    backend::BackendError,
    incumbent::{ImprovementCallback, SharedIncumbent},
    model::CpModel,
    monitor::{
        composite::CompositeMonitor, interrupt::InterruptMonitor, log::LogMonitor,
        time_limit::TimeLimitMonitor,
    },
    portfolio::{PortfolioContext, PortfolioWorker, PortfolioWorkerResult, WorkerTermination},
    result::{SolverOutcome, SolverResult, TerminationReason},
    stats::{SearchCounters, SolverStatistics, SolverStatisticsBuilder},
};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

pub struct PortfolioSolver<'a> {
    workers: Vec<Box<dyn PortfolioWorker + Send + 'a>>,
    stop_signal: AtomicBool,
    time_limit: Duration,
    log_progress: bool,
}

impl std::fmt::Debug for PortfolioSolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self
            .workers
            .iter()
            .map(|w| w.name())
            .collect::<Vec<&str>>()
            .join(", ");
        f.debug_struct("PortfolioSolver")
            .field("workers", &names)
            .field("time_limit", &self.time_limit)
            .field("log_progress", &self.log_progress)
            .finish()
    }
}

impl<'a> PortfolioSolver<'a> {
    #[inline]
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    #[inline]
    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// The flag that stops every worker once raised.
    #[inline]
    pub fn stop_signal(&self) -> &AtomicBool {
        &self.stop_signal
    }

    /// Validates `model`, runs the portfolio and classifies the outcome.
    pub fn solve(
        &mut self,
        model: &CpModel,
        callback: &mut (dyn ImprovementCallback + Send),
    ) -> Result<SolverOutcome, BackendError> {
        if self.workers.is_empty() {
            return Err(BackendError::NoWorkers);
        }
        model.validate()?;

        let start_time = Instant::now();
        self.stop_signal.store(false, Ordering::Relaxed);

        let incumbent = SharedIncumbent::with_callback(callback);
        let results = self.run_portfolio_parallel(model, &incumbent)?;

        let improvements = incumbent.improvements();
        let best = incumbent.into_best();
        Ok(self.construct_outcome(start_time, improvements, best, results))
    }

    fn run_portfolio_parallel(
        &mut self,
        model: &CpModel,
        incumbent: &SharedIncumbent<'_>,
    ) -> Result<Vec<PortfolioWorkerResult>, BackendError> {
        let time_limit = self.time_limit;
        let log_progress = self.log_progress;
        let stop_signal = &self.stop_signal;
        let names: Vec<String> = self.workers.iter().map(|w| w.name().to_string()).collect();

        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.workers.len());

            for worker in &mut self.workers {
                let handle = scope.spawn(move || {
                    let mut monitor = CompositeMonitor::new();
                    monitor.add_monitor(InterruptMonitor::new(stop_signal));
                    monitor.add_monitor(TimeLimitMonitor::new(time_limit));
                    if log_progress {
                        monitor.add_monitor(LogMonitor::for_worker(worker.name()));
                    }

                    let context =
                        PortfolioContext::new(model, incumbent, &mut monitor, stop_signal);
                    let result = worker.solve(context);

                    if result.is_exhausted() {
                        tracing::debug!(
                            worker = worker.name(),
                            "search exhausted, signaling stop to the portfolio"
                        );
                        stop_signal.store(true, Ordering::Relaxed);
                    }
                    result
                });
                handles.push(handle);
            }

            let mut results = Vec::with_capacity(handles.len());
            let mut panicked = None;
            for (handle, name) in handles.into_iter().zip(&names) {
                match handle.join() {
                    Ok(result) => results.push(result),
                    Err(_) => {
                        stop_signal.store(true, Ordering::Relaxed);
                        panicked.get_or_insert_with(|| name.clone());
                    }
                }
            }

            match panicked {
                Some(worker) => Err(BackendError::WorkerPanicked { worker }),
                None => Ok(results),
            }
        })
    }

    fn build_statistics(
        &self,
        start_time: Instant,
        improvements: u64,
        results: &[PortfolioWorkerResult],
        num_families: usize,
    ) -> SolverStatistics {
        let mut counters = SearchCounters::with_families(num_families);
        for result in results {
            counters.merge(&result.counters);
        }
        SolverStatisticsBuilder::new()
            .solutions_found(improvements)
            .used_threads(results.len())
            .counters(counters)
            .solve_duration(start_time.elapsed())
            .build()
    }

    fn construct_outcome(
        &self,
        start_time: Instant,
        improvements: u64,
        best: Option<Assignment>,
        results: Vec<PortfolioWorkerResult>,
    ) -> SolverOutcome {
        let num_families = results
            .iter()
            .map(|r| r.counters.family_conflicts.len())
            .max()
            .unwrap_or(0);
        let stats = self.build_statistics(start_time, improvements, &results, num_families);
        let exhausted = results.iter().any(PortfolioWorkerResult::is_exhausted);

        match (exhausted, best) {
            (true, Some(best)) => SolverOutcome::new(
                SolverResult::Optimal(best),
                TerminationReason::OptimalityProven,
                stats,
            ),
            (true, None) => SolverOutcome::new(
                SolverResult::Infeasible,
                TerminationReason::InfeasibilityProven,
                stats,
            ),
            (false, Some(best)) => SolverOutcome::new(
                SolverResult::Feasible(best),
                TerminationReason::Aborted(Self::abort_reason(&results)),
                stats,
            ),
            (false, None) => SolverOutcome::new(
                SolverResult::Unknown,
                TerminationReason::Aborted(Self::abort_reason(&results)),
                stats,
            ),
        }
    }

    fn abort_reason(results: &[PortfolioWorkerResult]) -> String {
        results
            .iter()
            .find_map(|r| match &r.termination {
                WorkerTermination::Aborted(reason) => Some(reason.clone()),
                WorkerTermination::SearchExhausted => None,
            })
            .unwrap_or_else(|| "search stopped without proof".to_string())
    }
}

pub struct SolverBuilder<'a> {
    workers: Vec<Box<dyn PortfolioWorker + Send + 'a>>,
    time_limit: Duration,
    log_progress: bool,
}

impl Default for SolverBuilder<'_> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SolverBuilder<'a> {
    #[inline]
    pub fn new() -> Self {
        Self {
            workers: Vec::new(),
            time_limit: Duration::MAX,
            log_progress: false,
        }
    }

    #[inline]
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    #[inline]
    pub fn with_progress_logging(mut self, enabled: bool) -> Self {
        self.log_progress = enabled;
        self
    }

    #[inline]
    pub fn add_worker<W>(mut self, worker: W) -> Self
    where
        W: PortfolioWorker + Send + 'a,
    {
        self.workers.push(Box::new(worker));
        self
    }

    #[inline]
    pub fn add_worker_boxed(mut self, worker: Box<dyn PortfolioWorker + Send + 'a>) -> Self {
        self.workers.push(worker);
        self
    }

    #[inline]
    pub fn build(self) -> PortfolioSolver<'a> {
        PortfolioSolver {
            workers: self.workers,
            stop_signal: AtomicBool::new(false),
            time_limit: self.time_limit,
            log_progress: self.log_progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        incumbent::IgnoreImprovements, monitor::search_monitor::SearchCommand,
        result::SolveStatus,
    };

    /// Installs a fixed list of objectives, then either exhausts or spins.
    struct ScriptedWorker {
        objectives: Vec<i64>,
        exhaust: bool,
    }

    impl PortfolioWorker for ScriptedWorker {
        fn solve(&mut self, context: PortfolioContext<'_, '_>) -> PortfolioWorkerResult {
            context.monitor.on_enter_search(context.model);
            for &objective in &self.objectives {
                context.incumbent.try_install(&Assignment::new(objective, vec![]));
            }
            let result = loop {
                if self.exhaust {
                    break PortfolioWorkerResult::exhausted(SearchCounters::default());
                }
                if let SearchCommand::Terminate(reason) = context.monitor.search_command() {
                    break PortfolioWorkerResult::aborted(reason, SearchCounters::default());
                }
                context.monitor.on_step();
                std::thread::yield_now();
            };
            context.monitor.on_exit_search();
            result
        }

        fn name(&self) -> &str {
            "ScriptedWorker"
        }
    }

    struct PanickingWorker;

    impl PortfolioWorker for PanickingWorker {
        fn solve(&mut self, _context: PortfolioContext<'_, '_>) -> PortfolioWorkerResult {
            panic!("worker failure");
        }

        fn name(&self) -> &str {
            "PanickingWorker"
        }
    }

    #[test]
    fn test_exhausting_worker_proves_optimality_and_stops_others() {
        let mut seen = Vec::new();
        let mut record = |a: &Assignment, _elapsed: Duration| seen.push(a.objective());
        let mut solver = SolverBuilder::new()
            .with_time_limit(Duration::from_secs(30))
            .add_worker(ScriptedWorker {
                objectives: vec![10, 5],
                exhaust: true,
            })
            .add_worker(ScriptedWorker {
                objectives: vec![],
                exhaust: false,
            })
            .build();

        let outcome = solver.solve(&CpModel::new(), &mut record).unwrap();
        assert_eq!(outcome.status(), SolveStatus::Optimal);
        assert_eq!(outcome.reason, TerminationReason::OptimalityProven);
        assert_eq!(outcome.result.assignment().map(|a| a.objective()), Some(5));
        assert_eq!(outcome.statistics.solutions_found, 2);
        assert_eq!(outcome.statistics.used_threads, 2);
        assert_eq!(seen, vec![10, 5]);
    }

    #[test]
    fn test_exhaustion_without_incumbent_is_infeasible() {
        let mut solver = SolverBuilder::new()
            .add_worker(ScriptedWorker {
                objectives: vec![],
                exhaust: true,
            })
            .build();
        let outcome = solver
            .solve(&CpModel::new(), &mut IgnoreImprovements)
            .unwrap();
        assert_eq!(outcome.status(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_time_limit_with_incumbent_is_feasible() {
        let mut solver = SolverBuilder::new()
            .with_time_limit(Duration::ZERO)
            .add_worker(ScriptedWorker {
                objectives: vec![7],
                exhaust: false,
            })
            .build();
        let outcome = solver
            .solve(&CpModel::new(), &mut IgnoreImprovements)
            .unwrap();
        assert_eq!(outcome.status(), SolveStatus::Feasible);
        match outcome.reason {
            TerminationReason::Aborted(reason) => assert!(reason.contains("time limit")),
            other => panic!("expected Aborted, got {:?}", other),
        }
    }

    #[test]
    fn test_time_limit_without_incumbent_is_unknown() {
        let mut solver = SolverBuilder::new()
            .with_time_limit(Duration::ZERO)
            .add_worker(ScriptedWorker {
                objectives: vec![],
                exhaust: false,
            })
            .build();
        let outcome = solver
            .solve(&CpModel::new(), &mut IgnoreImprovements)
            .unwrap();
        assert_eq!(outcome.status(), SolveStatus::Unknown);
    }

    #[test]
    fn test_panicking_worker_is_reported() {
        let mut solver = SolverBuilder::new()
            .with_time_limit(Duration::from_secs(30))
            .add_worker(PanickingWorker)
            .add_worker(ScriptedWorker {
                objectives: vec![],
                exhaust: false,
            })
            .build();
        match solver.solve(&CpModel::new(), &mut IgnoreImprovements) {
            Err(BackendError::WorkerPanicked { worker }) => assert_eq!(worker, "PanickingWorker"),
            other => panic!("expected WorkerPanicked, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_model_is_rejected_before_search() {
        let mut model = CpModel::new();
        model.new_int_var(2, 1, "broken");
        let mut solver = SolverBuilder::new()
            .add_worker(PanickingWorker)
            .build();
        assert!(matches!(
            solver.solve(&model, &mut IgnoreImprovements),
            Err(BackendError::ModelInvalid(_))
        ));
    }

    #[test]
    fn test_no_workers_is_an_error() {
        let mut solver = SolverBuilder::new().build();
        assert_eq!(
            solver.solve(&CpModel::new(), &mut IgnoreImprovements),
            Err(BackendError::NoWorkers)
        );
    }
}
