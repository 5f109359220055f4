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

//! # Branch-and-Bound Search
//!
//! One depth-first search over a `CpModel`.
//!
//! Each step asks the monitor whether to continue, pops the next open
//! branch, restores the domains to the branch's trail mark, applies the
//! restriction and propagates together with the objective cutoff taken from
//! the shared incumbent. A node that survives propagation either becomes a
//! solution (every domain fixed) or is split in two.
//!
//! Emptying the stack proves that no assignment strictly better than the
//! shared incumbent exists.

use crate::{
    branching::{Brancher, ValueOrder},
    domain::Domains,
    propagation::{Conflict, Propagator},
    stack::{Branch, SearchStack},
};
use gradeplan_search::{
    assignment::Assignment,
    incumbent::SharedIncumbent,
    model::CpModel,
    monitor::search_monitor::{SearchCommand, SearchMonitor},
    portfolio::PortfolioWorkerResult,
    stats::SearchCounters,
};

pub struct BnbSearch<'m> {
    model: &'m CpModel,
    domains: Domains,
    propagator: Propagator,
    stack: SearchStack,
    brancher: Brancher,
    counters: SearchCounters,
}

impl std::fmt::Debug for BnbSearch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BnbSearch")
            .field("domains", &format_args!("{}", self.domains))
            .field("open_branches", &self.stack.len())
            .field("order", &self.brancher.order())
            .field("counters", &self.counters)
            .finish()
    }
}

impl<'m> BnbSearch<'m> {
    pub fn new(model: &'m CpModel, order: ValueOrder, seed: u64) -> Self {
        Self {
            model,
            domains: Domains::from_model(model),
            propagator: Propagator::new(model),
            stack: SearchStack::preallocated(model.num_vars()),
            brancher: Brancher::new(model, order, seed),
            counters: SearchCounters::with_families(model.num_families()),
        }
    }

    /// Searches until the tree is exhausted or `monitor` terminates.
    pub fn run(
        mut self,
        incumbent: &SharedIncumbent<'_>,
        monitor: &mut dyn SearchMonitor,
    ) -> PortfolioWorkerResult {
        monitor.on_enter_search(self.model);
        let result = self.search(incumbent, monitor);
        monitor.on_exit_search();
        result
    }

    fn search(
        &mut self,
        incumbent: &SharedIncumbent<'_>,
        monitor: &mut dyn SearchMonitor,
    ) -> PortfolioWorkerResult {
        if let SearchCommand::Terminate(reason) = monitor.search_command() {
            return PortfolioWorkerResult::aborted(reason, std::mem::take(&mut self.counters));
        }
        monitor.on_step();

        // Root node.
        self.counters.nodes_explored += 1;
        self.propagator
            .set_cutoff(self.model, incumbent.upper_bound());
        self.propagator.enqueue_all();
        if self.propagate() {
            self.expand(incumbent, monitor);
        }

        loop {
            if let SearchCommand::Terminate(reason) = monitor.search_command() {
                return PortfolioWorkerResult::aborted(reason, std::mem::take(&mut self.counters));
            }
            monitor.on_step();

            let Some(branch) = self.stack.pop() else {
                return PortfolioWorkerResult::exhausted(std::mem::take(&mut self.counters));
            };

            self.domains.backtrack_to(branch.mark);
            self.counters.nodes_explored += 1;

            self.propagator
                .set_cutoff(self.model, incumbent.upper_bound());
            self.propagator.enqueue_cutoff();
            if self
                .propagator
                .restrict(&mut self.domains, branch.var, branch.lo, branch.hi)
                .is_err()
            {
                self.counters.conflicts += 1;
                continue;
            }
            if self.propagate() {
                self.expand(incumbent, monitor);
            }
        }
    }

    /// Propagates to a fixpoint. Returns `false` on conflict.
    #[inline]
    fn propagate(&mut self) -> bool {
        match self.propagator.propagate(self.model, &mut self.domains) {
            Ok(()) => true,
            Err(Conflict::Cutoff) => {
                self.counters.bound_prunings += 1;
                false
            }
            Err(Conflict::Constraint(index)) => {
                self.counters.conflicts += 1;
                let family = self.model.constraint_family(index).get();
                if let Some(count) = self.counters.family_conflicts.get_mut(family) {
                    *count += 1;
                }
                false
            }
        }
    }

    fn expand(&mut self, incumbent: &SharedIncumbent<'_>, monitor: &mut dyn SearchMonitor) {
        let Some(var) = self.brancher.select(&self.domains) else {
            self.handle_solution(incumbent, monitor);
            return;
        };

        let ((first_lo, first_hi), (second_lo, second_hi)) =
            self.brancher.split(&self.domains, var);
        let mark = self.domains.mark();
        self.stack.push_children(
            Branch {
                var,
                lo: first_lo,
                hi: first_hi,
                mark,
            },
            Branch {
                var,
                lo: second_lo,
                hi: second_hi,
                mark,
            },
        );
    }

    fn handle_solution(
        &mut self,
        incumbent: &SharedIncumbent<'_>,
        monitor: &mut dyn SearchMonitor,
    ) {
        let values = self.domains.lower_bounds().to_vec();
        debug_assert!(
            self.model.is_feasible(&values),
            "called `BnbSearch::handle_solution` with an assignment violating the model"
        );

        let objective = self.model.objective().evaluate(&values);
        let objective = objective.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        let assignment = Assignment::new(objective, values);
        if incumbent.try_install(&assignment) {
            monitor.on_solution_found(&assignment);
        } else {
            self.counters.bound_prunings += 1;
        }
    }
}
