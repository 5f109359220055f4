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

use crate::{assignment::Assignment, stats::SolverStatistics};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverResult {
    /// We have proven that the model has no feasible assignment.
    Infeasible,
    /// We have found an assignment and proven its optimality.
    Optimal(Assignment),
    /// We have found a feasible assignment, but not proven its optimality.
    Feasible(Assignment),
    /// The search stopped without an assignment and without proving
    /// infeasibility.
    Unknown,
}

/// The four-way classification of a `SolverResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "OPTIMAL"),
            SolveStatus::Feasible => write!(f, "FEASIBLE"),
            SolveStatus::Infeasible => write!(f, "INFEASIBLE"),
            SolveStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl SolverResult {
    #[inline]
    pub fn status(&self) -> SolveStatus {
        match self {
            SolverResult::Infeasible => SolveStatus::Infeasible,
            SolverResult::Optimal(_) => SolveStatus::Optimal,
            SolverResult::Feasible(_) => SolveStatus::Feasible,
            SolverResult::Unknown => SolveStatus::Unknown,
        }
    }

    #[inline]
    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            SolverResult::Optimal(a) | SolverResult::Feasible(a) => Some(a),
            SolverResult::Infeasible | SolverResult::Unknown => None,
        }
    }
}

impl std::fmt::Display for SolverResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverResult::Infeasible => write!(f, "Infeasible"),
            SolverResult::Optimal(a) => write!(f, "Optimal(objective={})", a.objective()),
            SolverResult::Feasible(a) => write!(f, "Feasible(objective={})", a.objective()),
            SolverResult::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The search tree was exhausted with an assignment in hand.
    OptimalityProven,
    /// The search tree was exhausted without any assignment.
    InfeasibilityProven,
    /// A search limit or interrupt stopped the search.
    Aborted(String),
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::OptimalityProven => write!(f, "Optimality Proven"),
            TerminationReason::InfeasibilityProven => write!(f, "Infeasibility Proven"),
            TerminationReason::Aborted(reason) => write!(f, "Aborted: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverOutcome {
    pub result: SolverResult,
    pub reason: TerminationReason,
    pub statistics: SolverStatistics,
}

impl SolverOutcome {
    #[inline]
    pub fn new(
        result: SolverResult,
        reason: TerminationReason,
        statistics: SolverStatistics,
    ) -> Self {
        Self {
            result,
            reason,
            statistics,
        }
    }

    #[inline]
    pub fn status(&self) -> SolveStatus {
        self.result.status()
    }

    #[inline]
    pub fn is_optimal(&self) -> bool {
        matches!(self.result, SolverResult::Optimal(_))
    }

    #[inline]
    pub fn is_feasible(&self) -> bool {
        matches!(self.result, SolverResult::Feasible(_))
    }

    #[inline]
    pub fn is_infeasible(&self) -> bool {
        matches!(self.result, SolverResult::Infeasible)
    }

    #[inline]
    pub fn has_solution(&self) -> bool {
        self.result.assignment().is_some()
    }
}

impl std::fmt::Display for SolverOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SolverOutcome(result: {}, reason: {}, solutions: {}, duration: {:.3}s)",
            self.result,
            self.reason,
            self.statistics.solutions_found,
            self.statistics.solve_duration.as_secs_f64()
        )
    }
}
