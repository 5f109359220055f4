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

//! # Propagation
//!
//! Shrinks domains to a fixpoint of the model's constraints plus the
//! objective cutoff. Every rule only removes values that cannot take part in
//! any assignment satisfying the constraint, so a failure is a proof that the
//! current node holds no solution.
//!
//! - `Linear`: bound consistency. With `min`/`max` the smallest and largest
//!   value the left-hand side can take, each term is limited to what the
//!   remaining terms leave of `[lo, hi]`.
//! - `Clause`: unit propagation. A clause with every literal false fails; a
//!   clause with one unassigned literal and no true literal forces it.
//! - `SupplyBalance`: with `A = opening + sum(inflows)` and demand `D`,
//!   `closing` is bounded by `max(0, A - D)` and `shortfall` by
//!   `max(0, D - A)` forwards, and bounds of either output narrow `A`
//!   (and through it each term) backwards.
//! - The objective cutoff is the linear constraint `objective <= best - 1`
//!   against the shared incumbent.
//!
//! Constraints are scheduled through per-variable watch lists and a FIFO
//! queue; a `FixedBitSet` keeps every constraint in the queue at most once.

use crate::domain::{Domains, Wipeout};
use fixedbitset::FixedBitSet;
use gradeplan_search::{
    index::{ConstraintIndex, VarId},
    model::{Constraint, CpModel, Literal, SupplyBalance},
};
use std::collections::VecDeque;

/// What made propagation fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// A model constraint has no support left.
    Constraint(ConstraintIndex),
    /// No assignment below the current cutoff remains.
    Cutoff,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conflict::Constraint(index) => write!(f, "Conflict({})", index),
            Conflict::Cutoff => write!(f, "Conflict(cutoff)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Failed;

impl From<Wipeout> for Failed {
    #[inline(always)]
    fn from(_: Wipeout) -> Self {
        Failed
    }
}

#[inline]
fn div_floor(a: i128, b: i128) -> i128 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

#[inline]
fn div_ceil(a: i128, b: i128) -> i128 {
    let q = a / b;
    if a % b != 0 && ((a < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}

#[inline(always)]
fn clamp_i64(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[inline(always)]
fn term_range(domains: &Domains, var: VarId, coef: i64) -> (i128, i128) {
    let a = coef as i128 * domains.lo(var) as i128;
    let b = coef as i128 * domains.hi(var) as i128;
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone)]
pub struct Propagator {
    /// `watches[var]` lists the slots to wake when `var` changes. Slot
    /// `num_constraints` is the objective cutoff.
    watches: Vec<Vec<usize>>,
    queue: VecDeque<usize>,
    queued: FixedBitSet,
    cutoff_slot: usize,
    /// Upper bound on the objective terms, constant already removed.
    cutoff: Option<i64>,
    scratch: Vec<(i128, i128)>,
}

impl Propagator {
    pub fn new(model: &CpModel) -> Self {
        let num_constraints = model.num_constraints();
        let mut watches = vec![Vec::new(); model.num_vars()];
        for (slot, constraint) in model.constraints().iter().enumerate() {
            constraint.for_each_var(|var| {
                let list = &mut watches[var.get()];
                if list.last() != Some(&slot) {
                    list.push(slot);
                }
            });
        }
        for &(var, _) in model.objective().terms() {
            let list = &mut watches[var.get()];
            if list.last() != Some(&num_constraints) {
                list.push(num_constraints);
            }
        }

        Self {
            watches,
            queue: VecDeque::with_capacity(num_constraints + 1),
            queued: FixedBitSet::with_capacity(num_constraints + 1),
            cutoff_slot: num_constraints,
            cutoff: None,
            scratch: Vec::new(),
        }
    }

    /// Sets the cutoff from the objective of the best known assignment.
    /// `i64::MAX` means there is none.
    pub fn set_cutoff(&mut self, model: &CpModel, best_objective: i64) {
        self.cutoff = (best_objective != i64::MAX).then(|| {
            best_objective
                .saturating_sub(1)
                .saturating_sub(model.objective().constant())
        });
    }

    #[inline]
    pub fn cutoff(&self) -> Option<i64> {
        self.cutoff
    }

    #[inline(always)]
    fn enqueue(&mut self, slot: usize) {
        if !self.queued.put(slot) {
            self.queue.push_back(slot);
        }
    }

    #[inline]
    pub fn enqueue_all(&mut self) {
        for slot in 0..=self.cutoff_slot {
            self.enqueue(slot);
        }
    }

    #[inline]
    pub fn enqueue_cutoff(&mut self) {
        self.enqueue(self.cutoff_slot);
    }

    fn clear_queue(&mut self) {
        self.queue.clear();
        self.queued.clear();
    }

    /// Restricts `var` to `[lo, hi]` and wakes its watchers on change.
    #[inline]
    pub fn restrict(
        &mut self,
        domains: &mut Domains,
        var: VarId,
        lo: i64,
        hi: i64,
    ) -> Result<(), Wipeout> {
        if domains.restrict(var, lo, hi)? {
            for i in 0..self.watches[var.get()].len() {
                let slot = self.watches[var.get()][i];
                self.enqueue(slot);
            }
        }
        Ok(())
    }

    /// Runs queued constraints until the queue is empty or one fails.
    pub fn propagate(&mut self, model: &CpModel, domains: &mut Domains) -> Result<(), Conflict> {
        while let Some(slot) = self.queue.pop_front() {
            self.queued.set(slot, false);

            let outcome = if slot == self.cutoff_slot {
                match self.cutoff {
                    Some(cutoff) => self
                        .propagate_linear(domains, model.objective().terms(), None, Some(cutoff))
                        .map_err(|_| Conflict::Cutoff),
                    None => Ok(()),
                }
            } else {
                let index = ConstraintIndex::new(slot);
                let result = match model.constraint(index) {
                    Constraint::Linear { terms, lo, hi } => {
                        self.propagate_linear(domains, terms, *lo, *hi)
                    }
                    Constraint::Clause { literals } => self.propagate_clause(domains, literals),
                    Constraint::SupplyBalance(balance) => {
                        self.propagate_supply_balance(domains, balance)
                    }
                };
                result.map_err(|_| Conflict::Constraint(index))
            };

            if let Err(conflict) = outcome {
                self.clear_queue();
                return Err(conflict);
            }
        }
        Ok(())
    }

    fn propagate_linear(
        &mut self,
        domains: &mut Domains,
        terms: &[(VarId, i64)],
        lo: Option<i64>,
        hi: Option<i64>,
    ) -> Result<(), Failed> {
        let mut ranges = std::mem::take(&mut self.scratch);
        ranges.clear();

        let mut min_sum: i128 = 0;
        let mut max_sum: i128 = 0;
        for &(var, coef) in terms {
            let range = term_range(domains, var, coef);
            min_sum += range.0;
            max_sum += range.1;
            ranges.push(range);
        }

        let result = if hi.is_some_and(|hi| min_sum > hi as i128)
            || lo.is_some_and(|lo| max_sum < lo as i128)
        {
            Err(Failed)
        } else {
            self.tighten_linear_terms(domains, terms, &ranges, (min_sum, max_sum), lo, hi)
        };

        self.scratch = ranges;
        result
    }

    fn tighten_linear_terms(
        &mut self,
        domains: &mut Domains,
        terms: &[(VarId, i64)],
        ranges: &[(i128, i128)],
        (min_sum, max_sum): (i128, i128),
        lo: Option<i64>,
        hi: Option<i64>,
    ) -> Result<(), Failed> {
        for (&(var, coef), &(term_min, term_max)) in terms.iter().zip(ranges) {
            let coef = coef as i128;
            if let Some(hi) = hi {
                // coef * var <= hi - (min_sum - term_min)
                let rest = hi as i128 - (min_sum - term_min);
                if coef > 0 {
                    self.restrict(domains, var, i64::MIN, clamp_i64(div_floor(rest, coef)))?;
                } else {
                    self.restrict(domains, var, clamp_i64(div_ceil(rest, coef)), i64::MAX)?;
                }
            }
            if let Some(lo) = lo {
                // coef * var >= lo - (max_sum - term_max)
                let rest = lo as i128 - (max_sum - term_max);
                if coef > 0 {
                    self.restrict(domains, var, clamp_i64(div_ceil(rest, coef)), i64::MAX)?;
                } else {
                    self.restrict(domains, var, i64::MIN, clamp_i64(div_floor(rest, coef)))?;
                }
            }
        }
        Ok(())
    }

    fn propagate_clause(
        &mut self,
        domains: &mut Domains,
        literals: &[Literal],
    ) -> Result<(), Failed> {
        let mut open = None;
        let mut num_open = 0usize;
        for &literal in literals {
            match domains.fixed_value(literal.var()) {
                Some(value) if value == literal.satisfying_value() => return Ok(()),
                Some(_) => {}
                None => {
                    num_open += 1;
                    open = Some(literal);
                }
            }
        }

        match (num_open, open) {
            (0, _) => Err(Failed),
            (1, Some(literal)) => {
                let value = literal.satisfying_value();
                self.restrict(domains, literal.var(), value, value)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn propagate_supply_balance(
        &mut self,
        domains: &mut Domains,
        balance: &SupplyBalance,
    ) -> Result<(), Failed> {
        let demand = balance.demand as i128;
        let mut available_lo = domains.lo(balance.opening) as i128;
        let mut available_hi = domains.hi(balance.opening) as i128;
        for &var in &balance.inflows {
            available_lo += domains.lo(var) as i128;
            available_hi += domains.hi(var) as i128;
        }

        // Forward.
        self.restrict(
            domains,
            balance.closing,
            clamp_i64((available_lo - demand).max(0)),
            clamp_i64((available_hi - demand).max(0)),
        )?;
        self.restrict(
            domains,
            balance.shortfall,
            clamp_i64((demand - available_hi).max(0)),
            clamp_i64((demand - available_lo).max(0)),
        )?;

        // Backward onto the available quantity.
        let mut target_lo = available_lo;
        let mut target_hi = available_hi;

        target_hi = target_hi.min(demand + domains.hi(balance.closing) as i128);
        let closing_lo = domains.lo(balance.closing) as i128;
        if closing_lo > 0 {
            target_lo = target_lo.max(demand + closing_lo);
        }

        target_lo = target_lo.max(demand - domains.hi(balance.shortfall) as i128);
        let shortfall_lo = domains.lo(balance.shortfall) as i128;
        if shortfall_lo > 0 {
            target_hi = target_hi.min(demand - shortfall_lo);
        }

        if target_lo > target_hi {
            return Err(Failed);
        }
        if target_lo == available_lo && target_hi == available_hi {
            return Ok(());
        }

        // Each term keeps what the others cannot supply or absorb.
        for &var in std::iter::once(&balance.opening).chain(&balance.inflows) {
            let (lo, hi) = (domains.lo(var) as i128, domains.hi(var) as i128);
            let others_hi = available_hi - hi;
            let others_lo = available_lo - lo;
            self.restrict(
                domains,
                var,
                clamp_i64(target_lo - others_hi),
                clamp_i64(target_hi - others_lo),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradeplan_search::model::LinearExpr;

    fn run(model: &CpModel) -> (Domains, Result<(), Conflict>) {
        let mut domains = Domains::from_model(model);
        let mut propagator = Propagator::new(model);
        propagator.enqueue_all();
        let result = propagator.propagate(model, &mut domains);
        (domains, result)
    }

    #[test]
    fn test_floor_and_ceil_division() {
        assert_eq!(div_floor(7, 2), 3);
        assert_eq!(div_floor(-7, 2), -4);
        assert_eq!(div_floor(7, -2), -4);
        assert_eq!(div_ceil(7, 2), 4);
        assert_eq!(div_ceil(-7, 2), -3);
        assert_eq!(div_ceil(-7, -2), 4);
        assert_eq!(div_ceil(6, 3), 2);
    }

    #[test]
    fn test_linear_capacity_link() {
        // prod - 100 * b = 0 with b fixed to 1 forces prod = 100.
        let mut model = CpModel::new();
        let f = model.declare_family("capacity");
        let b = model.new_bool_var("b");
        let prod = model.new_int_var(0, 100, "prod");
        model.add_eq(LinearExpr::new().term(prod, 1).term(b, -100), 0, f);
        model.add_fixed(b, 1, f);

        let (domains, result) = run(&model);
        assert_eq!(result, Ok(()));
        assert_eq!(domains.fixed_value(prod), Some(100));
    }

    #[test]
    fn test_linear_at_most_one() {
        let mut model = CpModel::new();
        let f = model.declare_family("single");
        let a = model.new_bool_var("a");
        let b = model.new_bool_var("b");
        let c = model.new_bool_var("c");
        model.add_le(LinearExpr::new().term(a, 1).term(b, 1).term(c, 1), 1, f);
        model.add_fixed(b, 1, f);

        let (domains, result) = run(&model);
        assert_eq!(result, Ok(()));
        assert_eq!(domains.fixed_value(a), Some(0));
        assert_eq!(domains.fixed_value(c), Some(0));
    }

    #[test]
    fn test_linear_conflict_reports_constraint() {
        let mut model = CpModel::new();
        let f = model.declare_family("f");
        let x = model.new_int_var(0, 3, "x");
        let c = model.add_ge(LinearExpr::new().term(x, 2), 7, f);

        let (_, result) = run(&model);
        assert_eq!(result, Err(Conflict::Constraint(c)));
    }

    #[test]
    fn test_clause_unit_propagation() {
        let mut model = CpModel::new();
        let f = model.declare_family("run-start");
        let start = model.new_bool_var("start");
        let prev = model.new_bool_var("prev");
        let cur = model.new_bool_var("cur");
        // start | !cur | prev
        model.add_clause([Literal::pos(start), Literal::neg(cur), Literal::pos(prev)], f);
        model.add_fixed(cur, 1, f);
        model.add_fixed(prev, 0, f);

        let (domains, result) = run(&model);
        assert_eq!(result, Ok(()));
        assert_eq!(domains.fixed_value(start), Some(1));
    }

    #[test]
    fn test_supply_balance_forward() {
        let mut model = CpModel::new();
        let f = model.declare_family("balance");
        let open = model.new_constant(20, "open");
        let made = model.new_int_var(0, 100, "made");
        let close = model.new_int_var(0, 1000, "close");
        let short = model.new_int_var(0, 1000, "short");
        model.add_supply_balance(
            SupplyBalance {
                opening: open,
                inflows: vec![made],
                demand: 50,
                closing: close,
                shortfall: short,
            },
            f,
        );

        let (domains, result) = run(&model);
        assert_eq!(result, Ok(()));
        assert_eq!((domains.lo(close), domains.hi(close)), (0, 70));
        assert_eq!((domains.lo(short), domains.hi(short)), (0, 30));
    }

    #[test]
    fn test_supply_balance_backward_forces_production() {
        let mut model = CpModel::new();
        let f = model.declare_family("balance");
        let open = model.new_constant(0, "open");
        let made = model.new_int_var(0, 100, "made");
        let close = model.new_int_var(0, 50, "close");
        let short = model.new_int_var(0, 1000, "short");
        model.add_supply_balance(
            SupplyBalance {
                opening: open,
                inflows: vec![made],
                demand: 50,
                closing: close,
                shortfall: short,
            },
            f,
        );
        // No stockout allowed.
        model.add_fixed(short, 0, f);

        let (domains, result) = run(&model);
        assert_eq!(result, Ok(()));
        assert_eq!((domains.lo(made), domains.hi(made)), (50, 100));
    }

    #[test]
    fn test_supply_balance_closing_target_wipes_out() {
        let mut model = CpModel::new();
        let f = model.declare_family("balance");
        let open = model.new_constant(0, "open");
        let made = model.new_int_var(0, 40, "made");
        let close = model.new_int_var(0, 50, "close");
        let short = model.new_int_var(0, 1000, "short");
        let balance = model.add_supply_balance(
            SupplyBalance {
                opening: open,
                inflows: vec![made],
                demand: 10,
                closing: close,
                shortfall: short,
            },
            f,
        );
        model.add_ge(LinearExpr::new().term(close, 1), 50, f);

        let (_, result) = run(&model);
        assert!(matches!(result, Err(Conflict::Constraint(c)) if c == balance || c.get() == 1));
    }

    #[test]
    fn test_cutoff_prunes_objective() {
        let mut model = CpModel::new();
        let x = model.new_int_var(0, 10, "x");
        let y = model.new_int_var(0, 10, "y");
        model.minimize(LinearExpr::new().term(x, 10).term(y, 1));

        let mut domains = Domains::from_model(&model);
        let mut propagator = Propagator::new(&model);
        propagator.set_cutoff(&model, 25);
        propagator.enqueue_all();
        assert_eq!(propagator.propagate(&model, &mut domains), Ok(()));
        assert_eq!(domains.hi(x), 2);
        assert_eq!(domains.hi(y), 10);

        propagator.set_cutoff(&model, 0);
        propagator.enqueue_cutoff();
        assert_eq!(
            propagator.propagate(&model, &mut domains),
            Err(Conflict::Cutoff)
        );
    }
}
