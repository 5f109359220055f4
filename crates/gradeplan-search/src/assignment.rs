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

//! # Assignments
//!
//! A complete value for every variable of a `CpModel`, together with the
//! objective value it achieves.

use crate::{index::VarId, model::Literal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    objective: i64,
    values: Vec<i64>,
}

impl Assignment {
    #[inline]
    pub fn new(objective: i64, values: Vec<i64>) -> Self {
        Self { objective, values }
    }

    #[inline]
    pub fn objective(&self) -> i64 {
        self.objective
    }

    #[inline]
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    #[inline]
    pub fn num_vars(&self) -> usize {
        self.values.len()
    }

    /// Returns the value of `var`.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `var` is out of bounds.
    #[inline]
    pub fn value(&self, var: VarId) -> i64 {
        let index = var.get();
        debug_assert!(
            index < self.values.len(),
            "called `Assignment::value` with variable out of bounds: the len is {} but the index is {}",
            self.values.len(),
            index
        );
        self.values[index]
    }

    /// Returns `true` if the boolean literal holds.
    #[inline]
    pub fn is_true(&self, literal: Literal) -> bool {
        self.value(literal.var()) == literal.satisfying_value()
    }

    #[inline]
    pub fn into_values(self) -> Vec<i64> {
        self.values
    }
}

impl std::fmt::Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Assignment(objective: {}, vars: {})",
            self.objective,
            self.values.len()
        )
    }
}
