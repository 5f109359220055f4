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

use crate::{bnb::BnbSearch, branching::ValueOrder};
use gradeplan_search::{
    backend::{BackendError, SearchParameters, SolverBackend},
    incumbent::ImprovementCallback,
    model::CpModel,
    portfolio::{PortfolioContext, PortfolioWorker, PortfolioWorkerResult},
    result::SolverOutcome,
    solver::SolverBuilder,
};

/// One branch-and-bound search run as a portfolio member.
#[derive(Debug, Clone)]
pub struct BnbWorker {
    name: String,
    order: ValueOrder,
    seed: u64,
}

impl BnbWorker {
    #[inline]
    pub fn new(name: impl Into<String>, order: ValueOrder, seed: u64) -> Self {
        Self {
            name: name.into(),
            order,
            seed,
        }
    }

    /// The worker occupying portfolio slot `slot`: slot 0 searches values
    /// ascending, slot 1 descending, every further slot in a random order
    /// seeded with `seed + slot`.
    pub fn for_slot(slot: usize, seed: u64) -> Self {
        let order = match slot {
            0 => ValueOrder::Ascending,
            1 => ValueOrder::Descending,
            _ => ValueOrder::Random,
        };
        Self::new(
            format!("bnb-{slot}-{order}"),
            order,
            seed.wrapping_add(slot as u64),
        )
    }

    #[inline]
    pub fn order(&self) -> ValueOrder {
        self.order
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl PortfolioWorker for BnbWorker {
    fn solve(&mut self, context: PortfolioContext<'_, '_>) -> PortfolioWorkerResult {
        tracing::debug!(worker = %self.name, seed = self.seed, "worker started");
        let search = BnbSearch::new(context.model, self.order, self.seed);
        let result = search.run(context.incumbent, context.monitor);
        tracing::debug!(
            worker = %self.name,
            termination = %result.termination,
            nodes = result.counters.nodes_explored,
            conflicts = result.counters.conflicts,
            "worker finished"
        );
        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Runs `SearchParameters::num_workers` `BnbWorker`s as a parallel portfolio.
#[derive(Debug, Clone, Copy, Default)]
pub struct BnbBackend;

impl BnbBackend {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl SolverBackend for BnbBackend {
    fn name(&self) -> &str {
        "BnbBackend"
    }

    fn solve(
        &mut self,
        model: &CpModel,
        parameters: &SearchParameters,
        callback: &mut (dyn ImprovementCallback + Send),
    ) -> Result<SolverOutcome, BackendError> {
        let num_workers = parameters.num_workers.max(1);
        let mut builder = SolverBuilder::new()
            .with_time_limit(parameters.time_limit)
            .with_progress_logging(parameters.log_progress);
        for slot in 0..num_workers {
            builder = builder.add_worker(BnbWorker::for_slot(slot, parameters.seed));
        }

        tracing::info!(
            model = %model,
            parameters = %parameters,
            "starting branch-and-bound portfolio"
        );
        let outcome = builder.build().solve(model, callback)?;
        tracing::info!(
            status = %outcome.status(),
            reason = %outcome.reason,
            nodes = outcome.statistics.nodes_explored,
            solutions = outcome.statistics.solutions_found,
            duration_ms = outcome.statistics.solve_duration.as_millis() as u64,
            "branch-and-bound portfolio finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradeplan_search::{
        assignment::Assignment,
        model::{LinearExpr, Literal},
        result::{SolveStatus, TerminationReason},
    };
    use std::time::Duration;

    /// Choose a subset of items with total weight at least 7; minimize cost.
    fn build_cover_model() -> CpModel {
        let mut model = CpModel::new();
        let f = model.declare_family("cover");
        let weights = [2, 3, 4, 5];
        let costs = [3, 4, 5, 7];
        let items: Vec<_> = (0..4).map(|i| model.new_bool_var(format!("x{i}"))).collect();
        model.add_ge(
            items.iter().zip(weights).map(|(&x, w)| (x, w)).collect(),
            7,
            f,
        );
        model.minimize(items.iter().zip(costs).map(|(&x, c)| (x, c)).collect());
        model.add_decision_vars(items.iter().copied());
        model
    }

    #[test]
    fn test_for_slot_assigns_orders_and_seeds() {
        assert_eq!(BnbWorker::for_slot(0, 42).order(), ValueOrder::Ascending);
        assert_eq!(BnbWorker::for_slot(1, 42).order(), ValueOrder::Descending);
        let third = BnbWorker::for_slot(2, 42);
        assert_eq!(third.order(), ValueOrder::Random);
        assert_eq!(third.seed(), 44);
        assert_eq!(third.name(), "bnb-2-random");
    }

    #[test]
    fn test_backend_proves_optimum_with_several_workers() {
        let model = build_cover_model();
        let mut seen = Vec::new();
        let mut record = |a: &Assignment, _elapsed: Duration| seen.push(a.objective());
        let parameters = SearchParameters {
            time_limit: Duration::from_secs(60),
            num_workers: 4,
            seed: 1,
            log_progress: false,
        };

        let outcome = BnbBackend::new()
            .solve(&model, &parameters, &mut record)
            .unwrap();
        assert_eq!(outcome.status(), SolveStatus::Optimal);
        assert_eq!(outcome.reason, TerminationReason::OptimalityProven);
        // 2 + 5 = 7 costs 3 + 7 = 10; 3 + 4 = 7 costs 4 + 5 = 9.
        assert_eq!(outcome.result.assignment().map(|a| a.objective()), Some(9));
        assert_eq!(seen.last(), Some(&9));
        assert!(seen.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_backend_reports_invalid_model() {
        let mut model = CpModel::new();
        let f = model.declare_family("f");
        let x = model.new_int_var(0, 4, "x");
        model.add_clause([Literal::pos(x)], f);

        let result = BnbBackend::new().solve(
            &model,
            &SearchParameters::default(),
            &mut |_: &Assignment, _: Duration| {},
        );
        assert!(matches!(result, Err(BackendError::ModelInvalid(_))));
    }

    #[test]
    fn test_backend_zero_deadline_is_unknown() {
        let model = build_cover_model();
        let parameters = SearchParameters {
            time_limit: Duration::ZERO,
            num_workers: 2,
            ..SearchParameters::default()
        };
        let outcome = BnbBackend::new()
            .solve(&model, &parameters, &mut |_: &Assignment, _: Duration| {})
            .unwrap();
        assert_eq!(outcome.status(), SolveStatus::Unknown);
    }

    #[test]
    fn test_single_worker_runs_are_reproducible() {
        let model = build_cover_model();
        let parameters = SearchParameters {
            time_limit: Duration::from_secs(60),
            num_workers: 1,
            seed: 5,
            log_progress: false,
        };
        let mut first = Vec::new();
        let mut second = Vec::new();
        BnbBackend::new()
            .solve(&model, &parameters, &mut |a: &Assignment, _: Duration| {
                first.push(a.values().to_vec())
            })
            .unwrap();
        BnbBackend::new()
            .solve(&model, &parameters, &mut |a: &Assignment, _: Duration| {
                second.push(a.values().to_vec())
            })
            .unwrap();
        assert_eq!(first, second);
    }
}
