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

use gradeplan_search::index::VarId;

/// A pending child node: restrict `var` to `[lo, hi]` after restoring the
/// domains to `mark`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    pub var: VarId,
    pub lo: i64,
    pub hi: i64,
    pub mark: usize,
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Branch({} in [{}, {}], mark: {})",
            self.var, self.lo, self.hi, self.mark
        )
    }
}

/// LIFO stack of open branches. Depth-first order falls out of pushing the
/// preferred child last.
#[derive(Debug, Clone, Default)]
pub struct SearchStack {
    entries: Vec<Branch>,
}

impl SearchStack {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn preallocated(num_vars: usize) -> Self {
        Self {
            entries: Vec::with_capacity(num_vars.saturating_mul(2)),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pushes the two children of a node; `first` is explored first.
    #[inline]
    pub fn push_children(&mut self, first: Branch, second: Branch) {
        self.entries.push(second);
        self.entries.push(first);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Branch> {
        self.entries.pop()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_child_is_popped_first() {
        let mut stack = SearchStack::preallocated(4);
        let var = VarId::new(0);
        stack.push_children(
            Branch { var, lo: 0, hi: 0, mark: 0 },
            Branch { var, lo: 1, hi: 1, mark: 0 },
        );
        assert_eq!(stack.pop().map(|b| b.lo), Some(0));
        assert_eq!(stack.pop().map(|b| b.lo), Some(1));
        assert!(stack.is_empty());
    }
}
