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

//! # Interval Domains
//!
//! Every variable keeps a closed interval `[lo, hi]`. Domains only shrink
//! during a dive; each shrink is recorded on a `DomainTrail` so the search
//! can restore any earlier node in time linear in the number of changes.

use crate::trail::{DomainTrail, TrailEntry};
use gradeplan_search::{index::VarId, model::CpModel};

/// A domain became empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wipeout {
    pub var: VarId,
}

#[derive(Debug, Clone)]
pub struct Domains {
    lo: Vec<i64>,
    hi: Vec<i64>,
    num_unfixed: usize,
    trail: DomainTrail,
}

impl Domains {
    /// Domains initialised to the declared bounds of `model`.
    pub fn from_model(model: &CpModel) -> Self {
        let lo = model.lower_bounds().to_vec();
        let hi = model.upper_bounds().to_vec();
        let num_unfixed = lo.iter().zip(&hi).filter(|(l, h)| l < h).count();
        Self {
            trail: DomainTrail::with_capacity(lo.len() * 2),
            lo,
            hi,
            num_unfixed,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lo.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lo.is_empty()
    }

    #[inline(always)]
    pub fn lo(&self, var: VarId) -> i64 {
        self.lo[var.get()]
    }

    #[inline(always)]
    pub fn hi(&self, var: VarId) -> i64 {
        self.hi[var.get()]
    }

    #[inline(always)]
    pub fn is_fixed(&self, var: VarId) -> bool {
        self.lo[var.get()] == self.hi[var.get()]
    }

    /// The value of a fixed variable.
    #[inline(always)]
    pub fn fixed_value(&self, var: VarId) -> Option<i64> {
        let (lo, hi) = (self.lo[var.get()], self.hi[var.get()]);
        (lo == hi).then_some(lo)
    }

    #[inline]
    pub fn num_unfixed(&self) -> usize {
        self.num_unfixed
    }

    #[inline]
    pub fn all_fixed(&self) -> bool {
        self.num_unfixed == 0
    }

    /// The lower bounds, which are the values once every domain is fixed.
    #[inline]
    pub fn lower_bounds(&self) -> &[i64] {
        &self.lo
    }

    /// Shrinks the domain of `var` to its intersection with `[lo, hi]`.
    ///
    /// Returns `Ok(true)` if the domain changed. On `Err` the domain is left
    /// untouched; the caller is expected to backtrack.
    #[inline]
    pub fn restrict(&mut self, var: VarId, lo: i64, hi: i64) -> Result<bool, Wipeout> {
        let index = var.get();
        let (old_lo, old_hi) = (self.lo[index], self.hi[index]);
        let new_lo = old_lo.max(lo);
        let new_hi = old_hi.min(hi);
        if new_lo > new_hi {
            return Err(Wipeout { var });
        }
        if new_lo == old_lo && new_hi == old_hi {
            return Ok(false);
        }

        self.trail.push(TrailEntry::new(var, old_lo, old_hi));
        self.lo[index] = new_lo;
        self.hi[index] = new_hi;
        if new_lo == new_hi {
            self.num_unfixed -= 1;
        }
        Ok(true)
    }

    #[inline(always)]
    pub fn mark(&self) -> usize {
        self.trail.mark()
    }

    /// Restores every domain to its state at `mark`.
    pub fn backtrack_to(&mut self, mark: usize) {
        let (lo, hi, num_unfixed) = (&mut self.lo, &mut self.hi, &mut self.num_unfixed);
        self.trail.pop_to(mark, |entry| {
            let index = entry.var().get();
            if lo[index] == hi[index] && entry.old_lo() < entry.old_hi() {
                *num_unfixed += 1;
            }
            lo[index] = entry.old_lo();
            hi[index] = entry.old_hi();
        });
    }
}

impl std::fmt::Display for Domains {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Domains(vars: {}, unfixed: {}, trail: {})",
            self.len(),
            self.num_unfixed,
            self.trail.len()
        )
    }
}
