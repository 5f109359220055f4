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
    incumbent::SharedIncumbent, model::CpModel, monitor::search_monitor::SearchMonitor,
    stats::SearchCounters,
};
use std::sync::atomic::AtomicBool;

/// Everything a portfolio worker sees of the shared solve.
pub struct PortfolioContext<'a, 'cb> {
    pub model: &'a CpModel,
    pub incumbent: &'a SharedIncumbent<'cb>,
    pub monitor: &'a mut dyn SearchMonitor,
    pub stop: &'a AtomicBool,
}

impl<'a, 'cb> PortfolioContext<'a, 'cb> {
    #[inline(always)]
    pub fn new(
        model: &'a CpModel,
        incumbent: &'a SharedIncumbent<'cb>,
        monitor: &'a mut dyn SearchMonitor,
        stop: &'a AtomicBool,
    ) -> Self {
        Self {
            model,
            incumbent,
            monitor,
            stop,
        }
    }
}

impl std::fmt::Debug for PortfolioContext<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioContext")
            .field("model", &format_args!("{}", self.model))
            .field("incumbent", &self.incumbent)
            .field("monitor", &self.monitor.name())
            .field("stop", &self.stop)
            .finish()
    }
}

/// Why a worker returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerTermination {
    /// The worker explored its whole tree. Combined with the shared
    /// incumbent, this proves optimality or infeasibility.
    SearchExhausted,
    /// A monitor stopped the worker.
    Aborted(String),
}

impl std::fmt::Display for WorkerTermination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerTermination::SearchExhausted => write!(f, "Search Exhausted"),
            WorkerTermination::Aborted(reason) => write!(f, "Aborted: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioWorkerResult {
    pub termination: WorkerTermination,
    pub counters: SearchCounters,
}

impl PortfolioWorkerResult {
    #[inline]
    pub fn exhausted(counters: SearchCounters) -> Self {
        Self {
            termination: WorkerTermination::SearchExhausted,
            counters,
        }
    }

    #[inline]
    pub fn aborted<R>(reason: R, counters: SearchCounters) -> Self
    where
        R: Into<String>,
    {
        Self {
            termination: WorkerTermination::Aborted(reason.into()),
            counters,
        }
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.termination == WorkerTermination::SearchExhausted
    }
}

/// A search strategy run as one thread of the portfolio.
///
/// Workers publish assignments through `context.incumbent` and must stop
/// promptly once `context.monitor` requests termination.
pub trait PortfolioWorker {
    fn solve(&mut self, context: PortfolioContext<'_, '_>) -> PortfolioWorkerResult;
    fn name(&self) -> &str;
}
