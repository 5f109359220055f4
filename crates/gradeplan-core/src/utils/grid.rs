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

//! Row-major two dimensional table over a single flattened `Vec`.
//!
//! Used for the dense `(entity, day)` tables of the scheduler, where every
//! cell exists. Out-of-range access is a logic error; it is caught by
//! `debug_assert!` in the unchecked accessors and reported as `None` by the
//! checked ones.

/// A dense `rows x cols` table stored row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct DenseGrid<V> {
    rows: usize,
    cols: usize,
    data: Vec<V>,
}

impl<V> DenseGrid<V>
where
    V: Clone,
{
    /// Creates a grid with every cell set to `fill`.
    #[inline]
    pub fn filled(rows: usize, cols: usize, fill: V) -> Self {
        Self {
            rows,
            cols,
            data: vec![fill; rows.saturating_mul(cols)],
        }
    }
}

impl<V> DenseGrid<V> {
    /// Builds a grid from a row-major vector.
    ///
    /// Returns `None` if `data.len() != rows * cols`.
    #[inline]
    pub fn from_vec(rows: usize, cols: usize, data: Vec<V>) -> Option<Self> {
        if rows.checked_mul(cols)? != data.len() {
            return None;
        }
        Some(Self { rows, cols, data })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    fn flat(&self, row: usize, col: usize) -> usize {
        debug_assert!(
            row < self.rows,
            "called `DenseGrid::flat` with row out of bounds: the rows are {} but the row is {}",
            self.rows,
            row
        );
        debug_assert!(
            col < self.cols,
            "called `DenseGrid::flat` with col out of bounds: the cols are {} but the col is {}",
            self.cols,
            col
        );
        row * self.cols + col
    }

    /// Returns the cell at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &V {
        &self.data[self.flat(row, col)]
    }

    /// Returns the cell at `(row, col)`, or `None` if out of bounds.
    #[inline]
    pub fn try_get(&self, row: usize, col: usize) -> Option<&V> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col)
    }

    /// Returns a mutable reference to the cell at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is out of bounds.
    #[inline]
    pub fn get_mut(&mut self, row: usize, col: usize) -> &mut V {
        let flat = self.flat(row, col);
        &mut self.data[flat]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: V) {
        *self.get_mut(row, col) = value;
    }

    /// Returns the cells of `row` as a slice.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    #[inline]
    pub fn row(&self, row: usize) -> &[V] {
        debug_assert!(
            row < self.rows,
            "called `DenseGrid::row` with row out of bounds: the rows are {} but the row is {}",
            self.rows,
            row
        );
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Iterates the rows in order.
    #[inline]
    pub fn iter_rows(&self) -> impl Iterator<Item = &[V]> + '_ {
        // `chunks_exact(0)` panics, an empty grid has no rows to yield anyway.
        let width = self.cols.max(1);
        self.data.chunks_exact(width).take(self.rows)
    }

    #[inline]
    pub fn as_slice(&self) -> &[V] {
        &self.data
    }
}

impl<V> std::fmt::Debug for DenseGrid<V>
where
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseGrid")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("data", &self.data)
            .finish()
    }
}
