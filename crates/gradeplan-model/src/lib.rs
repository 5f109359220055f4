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

//! # Gradeplan Model
//!
//! The canonical, immutable input of the production scheduler and the
//! configuration of a solve.
//!
//! * **`index`**: typed indices (`GradeIndex`, `LineIndex`, `DayIndex`).
//! * **`calendar`**: maps contiguous calendar dates to zero-based day indices.
//! * **`instance`**: the `Instance` (immutable, validated) and the
//!   `InstanceBuilder` (mutable, used by loaders and tests).
//! * **`config`**: `SolveConfig` with its defaults and policies.
//! * **`error`**: `ConfigurationError`, raised before any solve is attempted.
//! * **`loading`**: a JSON document loader that fills in defaults for
//!   optional fields.
//!
//! Grade and line data are kept in flattened vectors keyed by typed indices.
//! Builders validate eagerly so the encoder never sees an invalid instance.

pub mod calendar;
pub mod config;
pub mod error;
pub mod index;
pub mod instance;
pub mod loading;
