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

use gradeplan_core::utils::index::{TypedIndex, TypedIndexTag};

/// A tag type for grade indices.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct GradeIndexTag;

impl TypedIndexTag for GradeIndexTag {
    const NAME: &'static str = "GradeIndex";
}

/// A typed index for grades.
pub type GradeIndex = TypedIndex<GradeIndexTag>;

/// A tag type for line indices.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LineIndexTag;

impl TypedIndexTag for LineIndexTag {
    const NAME: &'static str = "LineIndex";
}

/// A typed index for production lines.
pub type LineIndex = TypedIndex<LineIndexTag>;

/// A tag type for day indices.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct DayIndexTag;

impl TypedIndexTag for DayIndexTag {
    const NAME: &'static str = "DayIndex";
}

/// A typed index for days of the planning horizon, zero-based.
pub type DayIndex = TypedIndex<DayIndexTag>;
