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

//! Gradeplan-BnB: a propagation-based branch-and-bound backend
//!
//! Searches a `gradeplan_search::model::CpModel` depth-first. Every node
//! restricts one variable, propagates the model's constraints to a fixpoint
//! and backtracks through a trail of domain changes.
//!
//! Core flow
//! - `domain`/`trail`: interval domains with an undo log.
//! - `propagation`: bound propagation for linear constraints, unit
//!   propagation for clauses and the supply-balance rule, plus the objective
//!   cutoff against the shared incumbent.
//! - `branching`: variable selection (decision variables first) and value
//!   ordering (ascending, descending or seeded random).
//! - `bnb`: the search loop.
//! - `portfolio`: `BnbWorker` for the portfolio and `BnbBackend`, the
//!   `SolverBackend` the scheduler drives.
//!
//! Guarantees
//! - Propagation never removes a value that belongs to a feasible
//!   assignment, so an exhausted tree is a proof.
//! - A worker with a fixed value order and seed explores the same tree on
//!   every run as long as it is alone in the portfolio.

pub mod bnb;
pub mod branching;
pub mod domain;
pub mod portfolio;
pub mod propagation;
mod stack;
mod trail;
