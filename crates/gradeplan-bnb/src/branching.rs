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

//! # Branching
//!
//! Variable selection takes the first unfixed variable of the model's
//! decision order, then the first unfixed variable by index. The chosen
//! domain is bisected; the value order decides which half is explored first.
//! Variables outside the decision order always try their lower half first,
//! which keeps auxiliary quantities small.

use crate::domain::Domains;
use fixedbitset::FixedBitSet;
use gradeplan_search::{index::VarId, model::CpModel};
use rand::{Rng, SeedableRng, rngs::StdRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueOrder {
    /// Lower half first.
    Ascending,
    /// Upper half first.
    Descending,
    /// A seeded coin flip per node.
    Random,
}

impl std::fmt::Display for ValueOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueOrder::Ascending => write!(f, "ascending"),
            ValueOrder::Descending => write!(f, "descending"),
            ValueOrder::Random => write!(f, "random"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Brancher {
    order: ValueOrder,
    rng: StdRng,
    decision_order: Vec<VarId>,
    is_decision: FixedBitSet,
}

impl Brancher {
    pub fn new(model: &CpModel, order: ValueOrder, seed: u64) -> Self {
        let mut is_decision = FixedBitSet::with_capacity(model.num_vars());
        for var in model.decision_order() {
            is_decision.insert(var.get());
        }
        Self {
            order,
            rng: StdRng::seed_from_u64(seed),
            decision_order: model.decision_order().to_vec(),
            is_decision,
        }
    }

    #[inline]
    pub fn order(&self) -> ValueOrder {
        self.order
    }

    /// The next variable to branch on, or `None` if every domain is fixed.
    pub fn select(&self, domains: &Domains) -> Option<VarId> {
        if domains.all_fixed() {
            return None;
        }
        self.decision_order
            .iter()
            .copied()
            .find(|&var| !domains.is_fixed(var))
            .or_else(|| {
                (0..domains.len())
                    .map(VarId::new)
                    .find(|&var| !domains.is_fixed(var))
            })
    }

    /// Splits the domain of `var` in two halves, returned in exploration order.
    pub fn split(&mut self, domains: &Domains, var: VarId) -> ((i64, i64), (i64, i64)) {
        let (lo, hi) = (domains.lo(var), domains.hi(var));
        debug_assert!(
            lo < hi,
            "called `Brancher::split` on fixed variable {}: [{}, {}]",
            var,
            lo,
            hi
        );
        let mid = (lo as i128 + (hi as i128 - lo as i128) / 2) as i64;
        let lower = (lo, mid);
        let upper = (mid + 1, hi);

        if !self.is_decision.contains(var.get()) {
            return (lower, upper);
        }
        let ascending = match self.order {
            ValueOrder::Ascending => true,
            ValueOrder::Descending => false,
            ValueOrder::Random => self.rng.random_bool(0.5),
        };
        if ascending { (lower, upper) } else { (upper, lower) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> (CpModel, VarId, VarId, VarId) {
        let mut model = CpModel::new();
        let aux = model.new_int_var(0, 9, "aux");
        let b = model.new_bool_var("b");
        let fixed = model.new_constant(3, "fixed");
        model.add_decision_vars([fixed, b]);
        (model, aux, b, fixed)
    }

    #[test]
    fn test_select_prefers_decision_variables() {
        let (model, aux, b, _) = model();
        let brancher = Brancher::new(&model, ValueOrder::Ascending, 0);
        let mut domains = Domains::from_model(&model);
        assert_eq!(brancher.select(&domains), Some(b));

        domains.restrict(b, 1, 1).unwrap();
        assert_eq!(brancher.select(&domains), Some(aux));

        domains.restrict(aux, 4, 4).unwrap();
        assert_eq!(brancher.select(&domains), None);
    }

    #[test]
    fn test_split_follows_value_order_for_decisions_only() {
        let (model, aux, b, _) = model();
        let domains = Domains::from_model(&model);

        let mut descending = Brancher::new(&model, ValueOrder::Descending, 0);
        assert_eq!(descending.split(&domains, b), ((1, 1), (0, 0)));
        assert_eq!(descending.split(&domains, aux), ((0, 4), (5, 9)));

        let mut ascending = Brancher::new(&model, ValueOrder::Ascending, 0);
        assert_eq!(ascending.split(&domains, b), ((0, 0), (1, 1)));
    }

    #[test]
    fn test_random_order_is_reproducible_per_seed() {
        let (model, _, b, _) = model();
        let domains = Domains::from_model(&model);
        let mut first = Brancher::new(&model, ValueOrder::Random, 7);
        let mut second = Brancher::new(&model, ValueOrder::Random, 7);
        for _ in 0..32 {
            assert_eq!(first.split(&domains, b), second.split(&domains, b));
        }
    }
}
