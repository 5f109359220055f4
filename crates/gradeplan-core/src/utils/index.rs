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

//! # Strongly Typed Indices
//!
//! Phantom-typed wrappers around `usize`. A production plan juggles several
//! index spaces at once (grades, lines, days, solver variables), and a raw
//! `usize` makes it far too easy to index a per-line table with a grade.
//! `TypedIndex<T>` carries a tag type `T: TypedIndexTag` and compiles down
//! to a transparent `usize`.
//!
//! ```rust
//! use gradeplan_core::utils::index::{TypedIndex, TypedIndexTag};
//!
//! #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
//! struct GradeTag;
//! impl TypedIndexTag for GradeTag { const NAME: &'static str = "GradeIndex"; }
//!
//! type GradeIndex = TypedIndex<GradeTag>;
//! let g = GradeIndex::new(3);
//! assert_eq!(g.get(), 3);
//! assert_eq!(format!("{}", g), "GradeIndex(3)");
//! assert_eq!(GradeIndex::range(2).map(|g| g.get()).collect::<Vec<_>>(), vec![0, 1]);
//! ```

/// Names a typed index space for `Debug` and `Display`.
pub trait TypedIndexTag: Clone {
    const NAME: &'static str;
}

/// A `usize` index tagged with the index space `T` it belongs to.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypedIndex<T> {
    index: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T> TypedIndex<T> {
    /// Creates a new `TypedIndex` wrapping `index`.
    #[inline(always)]
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            _marker: std::marker::PhantomData,
        }
    }

    /// Returns the underlying `usize` index.
    #[inline(always)]
    pub const fn get(&self) -> usize {
        self.index
    }

    /// Returns `true` if this is the first index of its space.
    #[inline(always)]
    pub const fn is_zero(&self) -> bool {
        self.index == 0
    }

    /// Returns the preceding index, or `None` at zero.
    #[inline]
    pub const fn prev(&self) -> Option<Self> {
        match self.index.checked_sub(1) {
            Some(index) => Some(Self::new(index)),
            None => None,
        }
    }

    /// Returns the index `offset` positions after this one.
    #[inline]
    pub const fn offset(&self, offset: usize) -> Self {
        Self::new(self.index + offset)
    }

    /// Iterates all indices `0..len` of this space in ascending order.
    #[inline]
    pub fn range(len: usize) -> TypedRange<T> {
        TypedRange::new(0, len)
    }

    /// Iterates the indices in `self..end`.
    #[inline]
    pub fn until(self, end: Self) -> TypedRange<T> {
        TypedRange::new(self.index, end.index)
    }
}

impl<T> std::fmt::Debug for TypedIndex<T>
where
    T: TypedIndexTag,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", T::NAME, self.index)
    }
}

impl<T> std::fmt::Display for TypedIndex<T>
where
    T: TypedIndexTag,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", T::NAME, self.index)
    }
}

impl<T> From<usize> for TypedIndex<T> {
    #[inline(always)]
    fn from(index: usize) -> Self {
        Self::new(index)
    }
}

impl<T> From<TypedIndex<T>> for usize {
    #[inline(always)]
    fn from(typed_index: TypedIndex<T>) -> Self {
        typed_index.index
    }
}

/// A half-open range `[start, end)` of typed indices.
#[derive(Clone, Debug)]
pub struct TypedRange<T> {
    next: usize,
    end: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T> TypedRange<T> {
    #[inline]
    fn new(start: usize, end: usize) -> Self {
        Self {
            next: start,
            end: end.max(start),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> Iterator for TypedRange<T> {
    type Item = TypedIndex<T>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let index = TypedIndex::new(self.next);
        self.next += 1;
        Some(index)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for TypedRange<T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        self.end -= 1;
        Some(TypedIndex::new(self.end))
    }
}

impl<T> ExactSizeIterator for TypedRange<T> {}
impl<T> std::iter::FusedIterator for TypedRange<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
    struct TestTag;

    impl TypedIndexTag for TestTag {
        const NAME: &'static str = "TestIdx";
    }

    type TestIndex = TypedIndex<TestTag>;

    #[test]
    fn test_new_and_get() {
        let idx = TestIndex::new(10);
        assert_eq!(idx.get(), 10);
        assert!(!idx.is_zero());
        assert!(TestIndex::new(0).is_zero());
    }

    #[test]
    fn test_conversions() {
        let idx: TestIndex = 42.into();
        assert_eq!(idx.get(), 42);

        let val: usize = idx.into();
        assert_eq!(val, 42);
    }

    #[test]
    fn test_debug_and_display() {
        let idx = TestIndex::new(7);
        assert_eq!(format!("{}", idx), "TestIdx(7)");
        assert_eq!(format!("{:?}", idx), "TestIdx(7)");
    }

    #[test]
    fn test_prev_and_offset() {
        assert_eq!(TestIndex::new(0).prev(), None);
        assert_eq!(TestIndex::new(4).prev(), Some(TestIndex::new(3)));
        assert_eq!(TestIndex::new(4).offset(3), TestIndex::new(7));
    }

    #[test]
    fn test_range_iterates_in_order() {
        let all: Vec<usize> = TestIndex::range(4).map(|i| i.get()).collect();
        assert_eq!(all, vec![0, 1, 2, 3]);

        let back: Vec<usize> = TestIndex::range(3).rev().map(|i| i.get()).collect();
        assert_eq!(back, vec![2, 1, 0]);

        assert_eq!(TestIndex::range(5).len(), 5);
        assert_eq!(TestIndex::range(0).next(), None);
    }

    #[test]
    fn test_until_handles_inverted_bounds() {
        let span: Vec<usize> = TestIndex::new(2)
            .until(TestIndex::new(5))
            .map(|i| i.get())
            .collect();
        assert_eq!(span, vec![2, 3, 4]);
        assert_eq!(TestIndex::new(5).until(TestIndex::new(2)).count(), 0);
    }
}
