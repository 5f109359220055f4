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

//! # Finite-Domain Model
//!
//! `CpModel` is the solver-agnostic encoding target. It holds:
//!
//! - variables with an initial `[lower, upper]` domain (booleans are `[0, 1]`),
//! - constraints:
//!   - `Linear`: `lo <= sum(coef * var) <= hi`, either side optional,
//!   - `Clause`: a disjunction of boolean literals,
//!   - `SupplyBalance`: `closing = max(0, opening + sum(inflows) - demand)`
//!     and `shortfall = max(0, demand - opening - sum(inflows))`,
//! - a linear objective to minimize,
//! - a decision order hint consulted first by branching.
//!
//! Every constraint carries the `FamilyId` it was declared under.
//! `CpModel::validate` rejects structurally broken models (dangling
//! variables, non-boolean literals, empty declared domains, objectives that
//! may not fit in `i64`); a backend reports such models as invalid rather
//! than infeasible.

use crate::index::{ConstraintIndex, FamilyId, VarId};
use smallvec::SmallVec;

/// A boolean variable or its negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    var: VarId,
    positive: bool,
}

impl Literal {
    /// The literal that holds when `var = 1`.
    #[inline]
    pub const fn pos(var: VarId) -> Self {
        Self { var, positive: true }
    }

    /// The literal that holds when `var = 0`.
    #[inline]
    pub const fn neg(var: VarId) -> Self {
        Self {
            var,
            positive: false,
        }
    }

    #[inline]
    pub const fn var(&self) -> VarId {
        self.var
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.positive
    }

    #[inline]
    pub const fn negated(&self) -> Self {
        Self {
            var: self.var,
            positive: !self.positive,
        }
    }

    /// The value `var` takes when this literal holds.
    #[inline]
    pub const fn satisfying_value(&self) -> i64 {
        if self.positive { 1 } else { 0 }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.positive {
            write!(f, "{}", self.var)
        } else {
            write!(f, "!{}", self.var)
        }
    }
}

/// `sum(coef * var) + constant`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    terms: Vec<(VarId, i64)>,
    constant: i64,
}

impl LinearExpr {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `coef * var`; zero coefficients are dropped.
    #[inline]
    pub fn add_term(&mut self, var: VarId, coef: i64) -> &mut Self {
        if coef != 0 {
            self.terms.push((var, coef));
        }
        self
    }

    /// Builder-style `add_term`.
    #[inline]
    pub fn term(mut self, var: VarId, coef: i64) -> Self {
        self.add_term(var, coef);
        self
    }

    #[inline]
    pub fn add_constant(&mut self, constant: i64) -> &mut Self {
        self.constant = self.constant.saturating_add(constant);
        self
    }

    #[inline]
    pub fn terms(&self) -> &[(VarId, i64)] {
        &self.terms
    }

    #[inline]
    pub fn constant(&self) -> i64 {
        self.constant
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluates the expression against a full value vector.
    #[inline]
    pub fn evaluate(&self, values: &[i64]) -> i128 {
        self.terms
            .iter()
            .fold(self.constant as i128, |acc, &(var, coef)| {
                acc + coef as i128 * values[var.get()] as i128
            })
    }
}

impl FromIterator<(VarId, i64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VarId, i64)>>(iter: I) -> Self {
        let mut expr = LinearExpr::new();
        for (var, coef) in iter {
            expr.add_term(var, coef);
        }
        expr
    }
}

/// `closing = max(0, opening + sum(inflows) - demand)` and
/// `shortfall = max(0, demand - opening - sum(inflows))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyBalance {
    pub opening: VarId,
    pub inflows: Vec<VarId>,
    pub demand: i64,
    pub closing: VarId,
    pub shortfall: VarId,
}

/// A constraint of a `CpModel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// `lo <= sum(coef * var) <= hi`; the expression's constant is folded
    /// into the bounds.
    Linear {
        terms: Vec<(VarId, i64)>,
        lo: Option<i64>,
        hi: Option<i64>,
    },
    /// At least one literal holds.
    Clause { literals: SmallVec<[Literal; 4]> },
    SupplyBalance(SupplyBalance),
}

impl Constraint {
    /// Calls `f` for every variable the constraint mentions.
    pub fn for_each_var<F: FnMut(VarId)>(&self, mut f: F) {
        match self {
            Constraint::Linear { terms, .. } => terms.iter().for_each(|&(var, _)| f(var)),
            Constraint::Clause { literals } => literals.iter().for_each(|lit| f(lit.var())),
            Constraint::SupplyBalance(balance) => {
                f(balance.opening);
                balance.inflows.iter().for_each(|&var| f(var));
                f(balance.closing);
                f(balance.shortfall);
            }
        }
    }

    /// Returns `true` if `values` satisfies the constraint.
    pub fn is_satisfied_by(&self, values: &[i64]) -> bool {
        match self {
            Constraint::Linear { terms, lo, hi } => {
                let sum: i128 = terms
                    .iter()
                    .map(|&(var, coef)| coef as i128 * values[var.get()] as i128)
                    .sum();
                lo.is_none_or(|lo| sum >= lo as i128) && hi.is_none_or(|hi| sum <= hi as i128)
            }
            Constraint::Clause { literals } => literals
                .iter()
                .any(|lit| values[lit.var().get()] == lit.satisfying_value()),
            Constraint::SupplyBalance(balance) => {
                let available: i128 = values[balance.opening.get()] as i128
                    + balance
                        .inflows
                        .iter()
                        .map(|var| values[var.get()] as i128)
                        .sum::<i128>();
                let demand = balance.demand as i128;
                values[balance.closing.get()] as i128 == (available - demand).max(0)
                    && values[balance.shortfall.get()] as i128 == (demand - available).max(0)
            }
        }
    }
}

/// Whether a variable is boolean or a general integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Bool,
    Int,
}

/// A structural defect of a `CpModel`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("variable `{name}` has an empty declared domain [{lower}, {upper}]")]
    EmptyDomain { name: String, lower: i64, upper: i64 },

    #[error("constraint {constraint} references unknown variable {var}")]
    UnknownVariable {
        constraint: ConstraintIndex,
        var: VarId,
    },

    #[error("constraint {constraint} uses non-boolean variable `{name}` as a literal")]
    NonBooleanLiteral {
        constraint: ConstraintIndex,
        name: String,
    },

    #[error("constraint {constraint} has an empty range [{lo}, {hi}]")]
    EmptyRange {
        constraint: ConstraintIndex,
        lo: i64,
        hi: i64,
    },

    #[error("constraint {constraint} has negative demand {demand}")]
    NegativeDemand {
        constraint: ConstraintIndex,
        demand: i64,
    },

    #[error("objective references unknown variable {var}")]
    UnknownObjectiveVariable { var: VarId },

    #[error("objective range does not fit in a 64-bit integer")]
    ObjectiveOverflow,
}

/// A finite-domain minimization model.
#[derive(Debug, Clone, Default)]
pub struct CpModel {
    lower: Vec<i64>,
    upper: Vec<i64>,
    kinds: Vec<VarKind>,
    names: Vec<String>,
    constraints: Vec<Constraint>,
    constraint_families: Vec<FamilyId>,
    family_names: Vec<String>,
    objective: LinearExpr,
    decision_order: Vec<VarId>,
}

impl CpModel {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a constraint family and returns its id.
    pub fn declare_family(&mut self, name: impl Into<String>) -> FamilyId {
        let id = FamilyId::new(self.family_names.len());
        self.family_names.push(name.into());
        id
    }

    #[inline]
    pub fn num_families(&self) -> usize {
        self.family_names.len()
    }

    #[inline]
    pub fn family_name(&self, family: FamilyId) -> &str {
        &self.family_names[family.get()]
    }

    #[inline]
    fn push_var(&mut self, lower: i64, upper: i64, kind: VarKind, name: String) -> VarId {
        let id = VarId::new(self.lower.len());
        self.lower.push(lower);
        self.upper.push(upper);
        self.kinds.push(kind);
        self.names.push(name);
        id
    }

    pub fn new_bool_var(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(0, 1, VarKind::Bool, name.into())
    }

    pub fn new_int_var(&mut self, lower: i64, upper: i64, name: impl Into<String>) -> VarId {
        self.push_var(lower, upper, VarKind::Int, name.into())
    }

    /// A variable whose domain is the single value `value`.
    pub fn new_constant(&mut self, value: i64, name: impl Into<String>) -> VarId {
        self.push_var(value, value, VarKind::Int, name.into())
    }

    #[inline]
    pub fn num_vars(&self) -> usize {
        self.lower.len()
    }

    #[inline]
    pub fn var_bounds(&self, var: VarId) -> (i64, i64) {
        (self.lower[var.get()], self.upper[var.get()])
    }

    #[inline]
    pub fn lower_bounds(&self) -> &[i64] {
        &self.lower
    }

    #[inline]
    pub fn upper_bounds(&self) -> &[i64] {
        &self.upper
    }

    #[inline]
    pub fn var_kind(&self, var: VarId) -> VarKind {
        self.kinds[var.get()]
    }

    #[inline]
    pub fn var_name(&self, var: VarId) -> &str {
        &self.names[var.get()]
    }

    fn push_constraint(&mut self, constraint: Constraint, family: FamilyId) -> ConstraintIndex {
        debug_assert!(
            family.get() < self.family_names.len(),
            "called `CpModel::push_constraint` with family out of bounds: the len is {} but the index is {}",
            self.family_names.len(),
            family.get()
        );
        let index = ConstraintIndex::new(self.constraints.len());
        self.constraints.push(constraint);
        self.constraint_families.push(family);
        index
    }

    /// Adds `lo <= expr <= hi`. The expression's constant moves to the bounds.
    pub fn add_linear(
        &mut self,
        expr: LinearExpr,
        lo: Option<i64>,
        hi: Option<i64>,
        family: FamilyId,
    ) -> ConstraintIndex {
        let constant = expr.constant;
        self.push_constraint(
            Constraint::Linear {
                terms: expr.terms,
                lo: lo.map(|lo| lo.saturating_sub(constant)),
                hi: hi.map(|hi| hi.saturating_sub(constant)),
            },
            family,
        )
    }

    #[inline]
    pub fn add_le(&mut self, expr: LinearExpr, rhs: i64, family: FamilyId) -> ConstraintIndex {
        self.add_linear(expr, None, Some(rhs), family)
    }

    #[inline]
    pub fn add_ge(&mut self, expr: LinearExpr, rhs: i64, family: FamilyId) -> ConstraintIndex {
        self.add_linear(expr, Some(rhs), None, family)
    }

    #[inline]
    pub fn add_eq(&mut self, expr: LinearExpr, rhs: i64, family: FamilyId) -> ConstraintIndex {
        self.add_linear(expr, Some(rhs), Some(rhs), family)
    }

    /// Fixes `var` to `value` through a unary constraint of `family`.
    #[inline]
    pub fn add_fixed(&mut self, var: VarId, value: i64, family: FamilyId) -> ConstraintIndex {
        self.add_eq(LinearExpr::new().term(var, 1), value, family)
    }

    pub fn add_clause<I>(&mut self, literals: I, family: FamilyId) -> ConstraintIndex
    where
        I: IntoIterator<Item = Literal>,
    {
        self.push_constraint(
            Constraint::Clause {
                literals: literals.into_iter().collect(),
            },
            family,
        )
    }

    /// Adds `premise -> conclusion`.
    #[inline]
    pub fn add_implication(
        &mut self,
        premise: Literal,
        conclusion: Literal,
        family: FamilyId,
    ) -> ConstraintIndex {
        self.add_clause([premise.negated(), conclusion], family)
    }

    pub fn add_supply_balance(
        &mut self,
        balance: SupplyBalance,
        family: FamilyId,
    ) -> ConstraintIndex {
        self.push_constraint(Constraint::SupplyBalance(balance), family)
    }

    /// Sets the expression to minimize.
    #[inline]
    pub fn minimize(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    #[inline]
    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Appends variables to the branching order hint.
    pub fn add_decision_vars<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = VarId>,
    {
        self.decision_order.extend(vars);
    }

    #[inline]
    pub fn decision_order(&self) -> &[VarId] {
        &self.decision_order
    }

    #[inline]
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    #[inline]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[inline]
    pub fn constraint(&self, index: ConstraintIndex) -> &Constraint {
        &self.constraints[index.get()]
    }

    #[inline]
    pub fn constraint_family(&self, index: ConstraintIndex) -> FamilyId {
        self.constraint_families[index.get()]
    }

    /// Returns `true` if `values` lies in every declared domain and satisfies
    /// every constraint.
    pub fn is_feasible(&self, values: &[i64]) -> bool {
        values.len() == self.num_vars()
            && values
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(&v, (&lo, &hi))| lo <= v && v <= hi)
            && self.constraints.iter().all(|c| c.is_satisfied_by(values))
    }

    /// Checks the structural soundness of the model.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (index, (&lower, &upper)) in self.lower.iter().zip(&self.upper).enumerate() {
            if lower > upper {
                return Err(ModelError::EmptyDomain {
                    name: self.names[index].clone(),
                    lower,
                    upper,
                });
            }
        }

        let num_vars = self.num_vars();
        for (position, constraint) in self.constraints.iter().enumerate() {
            let index = ConstraintIndex::new(position);

            let mut dangling = None;
            constraint.for_each_var(|var| {
                if var.get() >= num_vars && dangling.is_none() {
                    dangling = Some(var);
                }
            });
            if let Some(var) = dangling {
                return Err(ModelError::UnknownVariable {
                    constraint: index,
                    var,
                });
            }

            match constraint {
                Constraint::Linear {
                    lo: Some(lo),
                    hi: Some(hi),
                    ..
                } if lo > hi => {
                    return Err(ModelError::EmptyRange {
                        constraint: index,
                        lo: *lo,
                        hi: *hi,
                    });
                }
                Constraint::Clause { literals } => {
                    if let Some(lit) = literals
                        .iter()
                        .find(|lit| self.kinds[lit.var().get()] != VarKind::Bool)
                    {
                        return Err(ModelError::NonBooleanLiteral {
                            constraint: index,
                            name: self.names[lit.var().get()].clone(),
                        });
                    }
                }
                Constraint::SupplyBalance(balance) if balance.demand < 0 => {
                    return Err(ModelError::NegativeDemand {
                        constraint: index,
                        demand: balance.demand,
                    });
                }
                _ => {}
            }
        }

        let mut min = self.objective.constant as i128;
        let mut max = self.objective.constant as i128;
        for &(var, coef) in self.objective.terms() {
            if var.get() >= num_vars {
                return Err(ModelError::UnknownObjectiveVariable { var });
            }
            let a = coef as i128 * self.lower[var.get()] as i128;
            let b = coef as i128 * self.upper[var.get()] as i128;
            min += a.min(b);
            max += a.max(b);
        }
        if min < i64::MIN as i128 || max > i64::MAX as i128 {
            return Err(ModelError::ObjectiveOverflow);
        }

        Ok(())
    }
}

impl std::fmt::Display for CpModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CpModel(vars: {}, constraints: {}, families: {})",
            self.num_vars(),
            self.num_constraints(),
            self.num_families()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_linear_folds_constant() {
        let mut model = CpModel::new();
        let family = model.declare_family("capacity");
        let x = model.new_int_var(0, 10, "x");

        let mut expr = LinearExpr::new().term(x, 2);
        expr.add_constant(3);
        let c = model.add_linear(expr, Some(5), Some(9), family);

        match model.constraint(c) {
            Constraint::Linear { terms, lo, hi } => {
                assert_eq!(terms, &vec![(x, 2)]);
                assert_eq!(*lo, Some(2));
                assert_eq!(*hi, Some(6));
            }
            other => panic!("expected Linear, got {:?}", other),
        }
        assert_eq!(model.constraint_family(c), family);
        assert_eq!(model.family_name(family), "capacity");
    }

    #[test]
    fn test_zero_coefficients_are_dropped() {
        let x = VarId::new(0);
        let expr: LinearExpr = [(x, 0), (x, 4)].into_iter().collect();
        assert_eq!(expr.terms(), &[(x, 4)]);
    }

    #[test]
    fn test_literal_helpers() {
        let b = VarId::new(3);
        assert_eq!(Literal::pos(b).negated(), Literal::neg(b));
        assert_eq!(Literal::neg(b).satisfying_value(), 0);
        assert_eq!(format!("{}", Literal::neg(b)), "!VarId(3)");
    }

    #[test]
    fn test_supply_balance_satisfaction() {
        let mut model = CpModel::new();
        let family = model.declare_family("balance");
        let open = model.new_int_var(0, 100, "open");
        let made = model.new_int_var(0, 100, "made");
        let close = model.new_int_var(0, 100, "close");
        let short = model.new_int_var(0, 100, "short");
        model.add_supply_balance(
            SupplyBalance {
                opening: open,
                inflows: vec![made],
                demand: 50,
                closing: close,
                shortfall: short,
            },
            family,
        );

        // 20 + 10 against 50: 20 short, nothing left.
        assert!(model.is_feasible(&[20, 10, 0, 20]));
        assert!(!model.is_feasible(&[20, 10, 0, 10]));
        // 40 + 30 against 50: 20 carried over.
        assert!(model.is_feasible(&[40, 30, 20, 0]));
    }

    #[test]
    fn test_validate_accepts_well_formed_model() {
        let mut model = CpModel::new();
        let family = model.declare_family("f");
        let b = model.new_bool_var("b");
        let x = model.new_int_var(0, 5, "x");
        model.add_implication(Literal::pos(b), Literal::pos(b), family);
        model.add_le(LinearExpr::new().term(x, 1).term(b, -5), 0, family);
        model.minimize(LinearExpr::new().term(x, 3));
        assert_eq!(model.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_non_boolean_literal() {
        let mut model = CpModel::new();
        let family = model.declare_family("f");
        let x = model.new_int_var(0, 5, "x");
        model.add_clause([Literal::pos(x)], family);
        assert!(matches!(
            model.validate(),
            Err(ModelError::NonBooleanLiteral { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_domain() {
        let mut model = CpModel::new();
        model.new_int_var(3, 1, "x");
        assert!(matches!(
            model.validate(),
            Err(ModelError::EmptyDomain { lower: 3, upper: 1, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_dangling_variable() {
        let mut model = CpModel::new();
        let family = model.declare_family("f");
        model.add_fixed(VarId::new(7), 1, family);
        assert!(matches!(
            model.validate(),
            Err(ModelError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_objective_overflow() {
        let mut model = CpModel::new();
        let x = model.new_int_var(0, i64::MAX, "x");
        model.minimize(LinearExpr::new().term(x, 4));
        assert_eq!(model.validate(), Err(ModelError::ObjectiveOverflow));
    }
}
