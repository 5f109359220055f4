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

//! Calendar of the planning horizon.
//!
//! Day `0` is the first demand date; every following day index is exactly
//! one calendar day later. Indices past the last core day (the buffer tail
//! appended at solve time) extrapolate the same way.

use crate::{error::ConfigurationError, index::DayIndex};
use chrono::{Days, NaiveDate};

/// A contiguous run of calendar dates starting at `start`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Calendar {
    start: NaiveDate,
    core_days: usize,
}

impl Calendar {
    /// Creates a calendar of `core_days` consecutive days beginning at `start`.
    #[inline]
    pub fn new(start: NaiveDate, core_days: usize) -> Self {
        Self { start, core_days }
    }

    /// Derives the calendar from a set of demand dates.
    ///
    /// The dates may arrive unsorted and with repetitions; after sorting
    /// they must form one contiguous span.
    pub fn from_dates<I>(dates: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
        dates.sort_unstable();
        dates.dedup();

        let Some(&start) = dates.first() else {
            return Err(ConfigurationError::EmptyCalendar);
        };

        for pair in dates.windows(2) {
            if pair[0].succ_opt() != Some(pair[1]) {
                return Err(ConfigurationError::CalendarGap {
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }

        Ok(Self::new(start, dates.len()))
    }

    #[inline]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Returns the number of committed (non-buffer) days.
    #[inline]
    pub fn core_days(&self) -> usize {
        self.core_days
    }

    /// Returns the date of `day`. Days past the core span extrapolate.
    ///
    /// `None` only if the date leaves the range `chrono` can represent.
    #[inline]
    pub fn date(&self, day: DayIndex) -> Option<NaiveDate> {
        self.start.checked_add_days(Days::new(day.get() as u64))
    }

    /// Returns the core day index of `date`, or `None` if it falls outside
    /// the core span.
    #[inline]
    pub fn day_of(&self, date: NaiveDate) -> Option<DayIndex> {
        let offset = date.signed_duration_since(self.start).num_days();
        if offset < 0 {
            return None;
        }
        let offset = offset as usize;
        (offset < self.core_days).then(|| DayIndex::new(offset))
    }
}

impl std::fmt::Debug for Calendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Calendar")
            .field("start", &self.start)
            .field("core_days", &self.core_days)
            .finish()
    }
}

impl std::fmt::Display for Calendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Calendar({} + {} days)", self.start, self.core_days)
    }
}
