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

//! # Shared Incumbent
//!
//! The best assignment found so far by any worker of a portfolio, plus the
//! improvement callback that observes it.
//!
//! - A relaxed `AtomicI64` upper bound lets workers prune against the best
//!   known objective without taking the lock. `i64::MAX` means "none yet".
//! - The `Mutex` holds the authoritative assignment. `try_install` only
//!   accepts a candidate that is strictly better than the locked value, so
//!   the sequence of installed objectives is strictly decreasing.
//! - The improvement callback runs while the lock is held. Invocations are
//!   therefore serialized and observed in improvement order, and the callback
//!   is never entered concurrently from two workers.
//!
//! ```rust
//! use gradeplan_search::assignment::Assignment;
//! use gradeplan_search::incumbent::SharedIncumbent;
//!
//! let mut seen = Vec::new();
//! let mut record = |a: &Assignment, _elapsed: std::time::Duration| seen.push(a.objective());
//! {
//!     let inc = SharedIncumbent::with_callback(&mut record);
//!     assert!(inc.try_install(&Assignment::new(100, vec![])));
//!     assert!(!inc.try_install(&Assignment::new(100, vec![])));
//!     assert!(inc.try_install(&Assignment::new(40, vec![])));
//! }
//! assert_eq!(seen, vec![100, 40]);
//! ```

use crate::assignment::Assignment;
use std::{
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicI64, Ordering},
    },
    time::{Duration, Instant},
};

/// Observes every strict improvement of the shared incumbent.
pub trait ImprovementCallback {
    /// Called with the newly installed assignment and the time elapsed since
    /// the incumbent was created.
    fn on_improvement(&mut self, assignment: &Assignment, elapsed: Duration);
}

impl<F> ImprovementCallback for F
where
    F: FnMut(&Assignment, Duration),
{
    #[inline]
    fn on_improvement(&mut self, assignment: &Assignment, elapsed: Duration) {
        self(assignment, elapsed)
    }
}

/// Discards every improvement.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreImprovements;

impl ImprovementCallback for IgnoreImprovements {
    #[inline]
    fn on_improvement(&mut self, _assignment: &Assignment, _elapsed: Duration) {}
}

struct IncumbentState<'cb> {
    best: Option<Assignment>,
    improvements: u64,
    callback: Option<&'cb mut (dyn ImprovementCallback + Send)>,
}

/// A concurrent holder for the best assignment found during search.
pub struct SharedIncumbent<'cb> {
    upper_bound: AtomicI64,
    state: Mutex<IncumbentState<'cb>>,
    start_time: Instant,
}

impl Default for SharedIncumbent<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedIncumbent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedIncumbent")
            .field("upper_bound", &self.upper_bound())
            .field("improvements", &self.improvements())
            .finish()
    }
}

impl std::fmt::Display for SharedIncumbent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Incumbent(upper_bound: {})", self.upper_bound())
    }
}

impl<'cb> SharedIncumbent<'cb> {
    /// Creates an incumbent without an improvement callback.
    #[inline]
    pub fn new() -> Self {
        Self::from_parts(None)
    }

    /// Creates an incumbent that reports every strict improvement to `callback`.
    #[inline]
    pub fn with_callback(callback: &'cb mut (dyn ImprovementCallback + Send)) -> Self {
        Self::from_parts(Some(callback))
    }

    fn from_parts(callback: Option<&'cb mut (dyn ImprovementCallback + Send)>) -> Self {
        Self {
            upper_bound: AtomicI64::new(i64::MAX),
            state: Mutex::new(IncumbentState {
                best: None,
                improvements: 0,
                callback,
            }),
            start_time: Instant::now(),
        }
    }

    /// The objective of the incumbent, or `i64::MAX` if there is none.
    #[inline]
    pub fn upper_bound(&self) -> i64 {
        self.upper_bound.load(Ordering::Relaxed)
    }

    /// Time since the incumbent was created.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Number of installed improvements.
    #[inline]
    pub fn improvements(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .improvements
    }

    /// A copy of the current incumbent, if any.
    #[inline]
    pub fn snapshot(&self) -> Option<Assignment> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .best
            .clone()
    }

    /// Consumes the incumbent and returns the best assignment.
    #[inline]
    pub fn into_best(self) -> Option<Assignment> {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .best
    }

    /// Installs `candidate` if it is strictly better than the incumbent.
    /// Returns `true` if the candidate was installed.
    pub fn try_install(&self, candidate: &Assignment) -> bool {
        let objective = candidate.objective();
        if objective >= self.upper_bound() {
            return false;
        }

        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        // The atomic is only a hint; the locked value decides.
        if let Some(current) = guard.best.as_ref() {
            if objective >= current.objective() {
                return false;
            }
        }

        guard.best = Some(candidate.clone());
        guard.improvements += 1;
        self.upper_bound.store(objective, Ordering::Relaxed);

        let elapsed = self.start_time.elapsed();
        if let Some(callback) = guard.callback.as_mut() {
            callback.on_improvement(candidate, elapsed);
        }
        tracing::debug!(objective, elapsed_ms = elapsed.as_millis() as u64, "incumbent improved");

        true
    }
}
