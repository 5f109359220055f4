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

/// The bounds a variable had before one mutation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TrailEntry {
    var: VarId,
    old_lo: i64,
    old_hi: i64,
}

impl TrailEntry {
    #[inline(always)]
    pub fn new(var: VarId, old_lo: i64, old_hi: i64) -> Self {
        Self {
            var,
            old_lo,
            old_hi,
        }
    }

    #[inline]
    pub fn var(&self) -> VarId {
        self.var
    }

    #[inline]
    pub fn old_lo(&self) -> i64 {
        self.old_lo
    }

    #[inline]
    pub fn old_hi(&self) -> i64 {
        self.old_hi
    }
}

impl std::fmt::Display for TrailEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TrailEntry(var: {}, old: [{}, {}])",
            self.var, self.old_lo, self.old_hi
        )
    }
}

/// A linear undo log of domain mutations.
///
/// A mark is the log length at some point of the search; `pop_to` undoes
/// every entry recorded after it in reverse order.
#[derive(Debug, Clone, Default)]
pub struct DomainTrail {
    entries: Vec<TrailEntry>,
}

impl DomainTrail {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
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

    /// The current position, to be passed to `pop_to` later.
    #[inline(always)]
    pub fn mark(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn push(&mut self, entry: TrailEntry) {
        self.entries.push(entry);
    }

    /// Pops every entry after `mark`, newest first, handing each to `undo`.
    #[inline]
    pub fn pop_to<F>(&mut self, mark: usize, mut undo: F)
    where
        F: FnMut(TrailEntry),
    {
        debug_assert!(
            mark <= self.entries.len(),
            "called `DomainTrail::pop_to` with mark out of bounds: the len is {} but the mark is {}",
            self.entries.len(),
            mark
        );
        while self.entries.len() > mark {
            if let Some(entry) = self.entries.pop() {
                undo(entry);
            }
        }
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
    fn test_pop_to_undoes_newest_first() {
        let mut trail = DomainTrail::new();
        trail.push(TrailEntry::new(VarId::new(0), 0, 5));
        let mark = trail.mark();
        trail.push(TrailEntry::new(VarId::new(1), 0, 1));
        trail.push(TrailEntry::new(VarId::new(2), 3, 9));

        let mut undone = Vec::new();
        trail.pop_to(mark, |e| undone.push(e.var().get()));
        assert_eq!(undone, vec![2, 1]);
        assert_eq!(trail.len(), 1);
    }
}
