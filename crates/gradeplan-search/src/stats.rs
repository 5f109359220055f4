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

use std::time::Duration;

/// Statistics collected during one solve.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SolverStatistics {
    /// Number of improving solutions installed in the shared incumbent.
    pub solutions_found: u64,
    /// Number of worker threads that took part.
    pub used_threads: usize,
    /// Search nodes expanded, summed over workers.
    pub nodes_explored: u64,
    /// Propagation failures, summed over workers.
    pub conflicts: u64,
    /// Nodes cut off by the objective bound, summed over workers.
    pub bound_prunings: u64,
    /// Propagation failures per constraint family, indexed by `FamilyId`.
    pub family_conflicts: Vec<u64>,
    /// Wall-clock duration of the solve.
    pub solve_duration: Duration,
}

impl std::fmt::Display for SolverStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solver Statistics:")?;
        writeln!(f, "  Solutions Found: {}", self.solutions_found)?;
        writeln!(f, "  Used Threads: {}", self.used_threads)?;
        writeln!(f, "  Nodes Explored: {}", self.nodes_explored)?;
        writeln!(f, "  Conflicts: {}", self.conflicts)?;
        writeln!(f, "  Bound Prunings: {}", self.bound_prunings)?;
        writeln!(
            f,
            "  Solve Duration (secs): {:.3}",
            self.solve_duration.as_secs_f64()
        )
    }
}

/// Counters a single worker accumulates while searching.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchCounters {
    pub nodes_explored: u64,
    pub conflicts: u64,
    pub bound_prunings: u64,
    pub family_conflicts: Vec<u64>,
}

impl SearchCounters {
    #[inline]
    pub fn with_families(num_families: usize) -> Self {
        Self {
            family_conflicts: vec![0; num_families],
            ..Self::default()
        }
    }

    /// Adds `other` into `self`, growing the family table if needed.
    pub fn merge(&mut self, other: &SearchCounters) {
        self.nodes_explored += other.nodes_explored;
        self.conflicts += other.conflicts;
        self.bound_prunings += other.bound_prunings;
        if self.family_conflicts.len() < other.family_conflicts.len() {
            self.family_conflicts.resize(other.family_conflicts.len(), 0);
        }
        for (total, &count) in self.family_conflicts.iter_mut().zip(&other.family_conflicts) {
            *total += count;
        }
    }
}

/// Builder for `SolverStatistics`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverStatisticsBuilder {
    solutions_found: u64,
    used_threads: usize,
    counters: SearchCounters,
    solve_duration: Duration,
}

impl Default for SolverStatisticsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverStatisticsBuilder {
    #[inline]
    pub fn new() -> Self {
        Self {
            solutions_found: 0,
            used_threads: 1,
            counters: SearchCounters::default(),
            solve_duration: Duration::ZERO,
        }
    }

    #[inline]
    pub fn solutions_found(mut self, solutions_found: u64) -> Self {
        self.solutions_found = solutions_found;
        self
    }

    #[inline]
    pub fn used_threads(mut self, used_threads: usize) -> Self {
        self.used_threads = used_threads;
        self
    }

    /// Sets the summed worker counters.
    #[inline]
    pub fn counters(mut self, counters: SearchCounters) -> Self {
        self.counters = counters;
        self
    }

    #[inline]
    pub fn solve_duration(mut self, solve_duration: Duration) -> Self {
        self.solve_duration = solve_duration;
        self
    }

    #[inline]
    pub fn build(self) -> SolverStatistics {
        SolverStatistics {
            solutions_found: self.solutions_found,
            used_threads: self.used_threads,
            nodes_explored: self.counters.nodes_explored,
            conflicts: self.counters.conflicts,
            bound_prunings: self.counters.bound_prunings,
            family_conflicts: self.counters.family_conflicts,
            solve_duration: self.solve_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_constructs_expected_struct() {
        let mut counters = SearchCounters::with_families(2);
        counters.nodes_explored = 40;
        counters.family_conflicts[1] = 3;

        let stats = SolverStatisticsBuilder::new()
            .solutions_found(3)
            .used_threads(8)
            .counters(counters)
            .solve_duration(Duration::from_millis(1234))
            .build();

        assert_eq!(stats.solutions_found, 3);
        assert_eq!(stats.used_threads, 8);
        assert_eq!(stats.nodes_explored, 40);
        assert_eq!(stats.family_conflicts, vec![0, 3]);

        let rendered = format!("{}", stats);
        assert!(rendered.contains("Solver Statistics:"));
        assert!(rendered.contains("Solve Duration (secs): 1.234"));
    }

    #[test]
    fn test_merge_sums_counters() {
        let mut total = SearchCounters::default();
        let mut a = SearchCounters::with_families(3);
        a.conflicts = 2;
        a.family_conflicts[0] = 2;
        let mut b = SearchCounters::with_families(3);
        b.conflicts = 5;
        b.family_conflicts[0] = 1;
        b.family_conflicts[2] = 4;

        total.merge(&a);
        total.merge(&b);
        assert_eq!(total.conflicts, 7);
        assert_eq!(total.family_conflicts, vec![3, 0, 4]);
    }
}
