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

//! # Gradeplan Search
//!
//! The abstract combinatorial-solver capability the scheduler encodes
//! against, plus the machinery shared by every search backend.
//!
//! * **`model`**: `CpModel`, a finite-domain model of integer and boolean
//!   variables with linear constraints, clauses and supply-balance
//!   constraints. Every constraint carries a `FamilyId` so conflicts can be
//!   attributed back to the modelling concept that produced it.
//! * **`assignment`**: a complete variable assignment with its objective.
//! * **`monitor`**: search monitors (time limit, interrupt, progress log)
//!   and their composite.
//! * **`incumbent`**: the shared best solution with the improvement
//!   callback that observes every strict improvement.
//! * **`portfolio`** / **`solver`**: the worker trait and the parallel
//!   orchestrator running a portfolio of workers.
//! * **`backend`**: the `SolverBackend` trait the scheduler drives.
//! * **`result`** / **`stats`**: outcomes and statistics.

pub mod assignment;
pub mod backend;
pub mod incumbent;
pub mod index;
pub mod model;
pub mod monitor;
pub mod portfolio;
pub mod result;
pub mod solver;
pub mod stats;
