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

//! Configuration of a single solve.
//!
//! Every field has a default, so a partial JSON document (or an empty one)
//! deserializes into a usable configuration. `SolveConfig::validate` must be
//! called before solving; the scheduler does so on entry.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Whether the per-day min/max inventory band is enforced.
///
/// Minimum closing inventory is always enforced regardless of this policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryBoundPolicy {
    /// The band bounds every `inventory[g, d]` for `d >= 1`.
    #[default]
    Hard,
    /// The band is not a constraint; excursions are reported with the result.
    Advisory,
}

impl std::fmt::Display for InventoryBoundPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InventoryBoundPolicy::Hard => write!(f, "hard"),
            InventoryBoundPolicy::Advisory => write!(f, "advisory"),
        }
    }
}

/// How long a run already in progress at day 0 blocks its line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarryOverPolicy {
    /// Pin only the observed remaining days.
    #[default]
    Remaining,
    /// Pin until the run reaches its minimum run length, counting the days
    /// it had already been producing, and at least the remaining days.
    FullRun,
}

impl CarryOverPolicy {
    /// Returns the number of leading days pinned to the carried grade.
    ///
    /// The result is not clipped to the horizon.
    #[inline]
    pub fn pinned_days(
        &self,
        remaining_days: usize,
        elapsed_days: usize,
        min_run_days: usize,
    ) -> usize {
        match self {
            CarryOverPolicy::Remaining => remaining_days,
            CarryOverPolicy::FullRun => {
                remaining_days.max(min_run_days.saturating_sub(elapsed_days))
            }
        }
    }
}

impl std::fmt::Display for CarryOverPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CarryOverPolicy::Remaining => write!(f, "remaining"),
            CarryOverPolicy::FullRun => write!(f, "full_run"),
        }
    }
}

/// Parameters of a solve.
///
/// | Field | Default |
/// | :--- | :--- |
/// | `time_limit_minutes` | `10` |
/// | `time_limit_seconds` | none (overrides minutes when set) |
/// | `stockout_penalty` | `10` |
/// | `transition_penalty` | `10` |
/// | `buffer_days` | `3` |
/// | `worker_count` | `8` |
/// | `random_seed` | `42` |
/// | `inventory_bounds` | `hard` |
/// | `carry_over` | `remaining` |
/// | `log_search_progress` | `false` |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolveConfig {
    pub time_limit_minutes: u64,
    pub time_limit_seconds: Option<u64>,
    pub stockout_penalty: i64,
    pub transition_penalty: i64,
    pub buffer_days: usize,
    pub worker_count: usize,
    pub random_seed: u64,
    pub inventory_bounds: InventoryBoundPolicy,
    pub carry_over: CarryOverPolicy,
    pub log_search_progress: bool,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            time_limit_minutes: 10,
            time_limit_seconds: None,
            stockout_penalty: 10,
            transition_penalty: 10,
            buffer_days: 3,
            worker_count: 8,
            random_seed: 42,
            inventory_bounds: InventoryBoundPolicy::Hard,
            carry_over: CarryOverPolicy::Remaining,
            log_search_progress: false,
        }
    }
}

impl SolveConfig {
    /// Returns the wall-clock deadline of the solve.
    #[inline]
    pub fn time_limit(&self) -> Duration {
        match self.time_limit_seconds {
            Some(seconds) => Duration::from_secs(seconds),
            None => Duration::from_secs(self.time_limit_minutes.saturating_mul(60)),
        }
    }

    #[inline]
    pub fn with_time_limit_minutes(mut self, minutes: u64) -> Self {
        self.time_limit_minutes = minutes;
        self.time_limit_seconds = None;
        self
    }

    #[inline]
    pub fn with_time_limit_seconds(mut self, seconds: u64) -> Self {
        self.time_limit_seconds = Some(seconds);
        self
    }

    #[inline]
    pub fn with_penalties(mut self, stockout_penalty: i64, transition_penalty: i64) -> Self {
        self.stockout_penalty = stockout_penalty;
        self.transition_penalty = transition_penalty;
        self
    }

    #[inline]
    pub fn with_buffer_days(mut self, buffer_days: usize) -> Self {
        self.buffer_days = buffer_days;
        self
    }

    #[inline]
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    #[inline]
    pub fn with_random_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = random_seed;
        self
    }

    #[inline]
    pub fn with_inventory_bounds(mut self, policy: InventoryBoundPolicy) -> Self {
        self.inventory_bounds = policy;
        self
    }

    #[inline]
    pub fn with_carry_over(mut self, policy: CarryOverPolicy) -> Self {
        self.carry_over = policy;
        self
    }

    #[inline]
    pub fn with_search_logging(mut self, enabled: bool) -> Self {
        self.log_search_progress = enabled;
        self
    }

    /// Parses a configuration from JSON; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Checks the value ranges of every field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.time_limit_minutes == 0 {
            return Err(ConfigurationError::InvalidConfig {
                field: "time_limit_minutes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.time_limit_seconds == Some(0) {
            return Err(ConfigurationError::InvalidConfig {
                field: "time_limit_seconds",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.stockout_penalty < 0 {
            return Err(ConfigurationError::InvalidConfig {
                field: "stockout_penalty",
                reason: format!("must be non-negative, got {}", self.stockout_penalty),
            });
        }
        if self.transition_penalty < 0 {
            return Err(ConfigurationError::InvalidConfig {
                field: "transition_penalty",
                reason: format!("must be non-negative, got {}", self.transition_penalty),
            });
        }
        if self.worker_count == 0 {
            return Err(ConfigurationError::InvalidConfig {
                field: "worker_count",
                reason: "at least one worker is required".to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for SolveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SolveConfig(time_limit: {:?}, penalties: {}/{}, buffer_days: {}, workers: {}, seed: {}, bounds: {}, carry_over: {})",
            self.time_limit(),
            self.stockout_penalty,
            self.transition_penalty,
            self.buffer_days,
            self.worker_count,
            self.random_seed,
            self.inventory_bounds,
            self.carry_over
        )
    }
}
