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

//! # Solver Driver
//!
//! Runs one solve of an instance: validates the configuration, encodes the
//! instance, hands the model to a `SolverBackend` together with an
//! `IncumbentRecorder`, and classifies the outcome.
//!
//! A driver is single use. Its state moves from `NotStarted` through
//! `Searching` to a terminal status, or to `Failed` when the backend errors.
//! Calling `solve` again is rejected with `ScheduleError::AlreadySolved`.

use crate::{
    diagnostics::{InfeasibilityReport, diagnose},
    encoding::{ConstraintFamily, ModelBuilder},
    error::ScheduleError,
    objective::ObjectiveFunction,
    snapshot::{IncumbentRecorder, IncumbentSnapshot, SnapshotLayout},
};
use gradeplan_bnb::portfolio::BnbBackend;
use gradeplan_model::{config::SolveConfig, instance::Instance};
use gradeplan_search::{
    backend::{SearchParameters, SolverBackend},
    index::FamilyId,
    result::{SolveStatus, TerminationReason},
    stats::SolverStatistics,
};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    NotStarted,
    Searching,
    Finished(SolveStatus),
    /// The backend returned an error; the driver cannot be reused.
    Failed,
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverState::NotStarted => write!(f, "NotStarted"),
            DriverState::Searching => write!(f, "Searching"),
            DriverState::Finished(status) => write!(f, "Finished({})", status),
            DriverState::Failed => write!(f, "Failed"),
        }
    }
}

/// Everything one solve produced.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    status: SolveStatus,
    reason: TerminationReason,
    num_days: usize,
    incumbents: Vec<IncumbentSnapshot>,
    statistics: SolverStatistics,
    diagnostics: Option<InfeasibilityReport>,
}

impl ScheduleOutcome {
    #[inline]
    pub fn status(&self) -> SolveStatus {
        self.status
    }

    #[inline]
    pub fn reason(&self) -> &TerminationReason {
        &self.reason
    }

    /// Core days plus buffer days of the encoded horizon.
    #[inline]
    pub fn num_days(&self) -> usize {
        self.num_days
    }

    /// The last, and therefore best, improving snapshot.
    #[inline]
    pub fn best(&self) -> Option<&IncumbentSnapshot> {
        self.incumbents.last()
    }

    /// Every improvement in the order it was found; objectives strictly
    /// decrease.
    #[inline]
    pub fn incumbents(&self) -> &[IncumbentSnapshot] {
        &self.incumbents
    }

    #[inline]
    pub fn objective(&self) -> Option<i64> {
        self.best().map(IncumbentSnapshot::objective)
    }

    #[inline]
    pub fn statistics(&self) -> &SolverStatistics {
        &self.statistics
    }

    /// Present when the status is `Infeasible`.
    #[inline]
    pub fn diagnostics(&self) -> Option<&InfeasibilityReport> {
        self.diagnostics.as_ref()
    }
}

impl std::fmt::Display for ScheduleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.objective() {
            Some(objective) => write!(
                f,
                "ScheduleOutcome({}, objective: {}, incumbents: {}, {})",
                self.status,
                objective,
                self.incumbents.len(),
                self.reason
            ),
            None => write!(f, "ScheduleOutcome({}, {})", self.status, self.reason),
        }
    }
}

/// Drives a single solve of `instance` under `config`.
pub struct SolverDriver<'a, B = BnbBackend> {
    instance: &'a Instance,
    config: &'a SolveConfig,
    backend: B,
    time_limit: Option<Duration>,
    state: DriverState,
}

impl<'a> SolverDriver<'a, BnbBackend> {
    /// A driver using the branch-and-bound portfolio backend.
    #[inline]
    pub fn new(instance: &'a Instance, config: &'a SolveConfig) -> Self {
        Self::with_backend(instance, config, BnbBackend::new())
    }
}

impl<'a, B> SolverDriver<'a, B>
where
    B: SolverBackend,
{
    #[inline]
    pub fn with_backend(instance: &'a Instance, config: &'a SolveConfig, backend: B) -> Self {
        Self {
            instance,
            config,
            backend,
            time_limit: None,
            state: DriverState::NotStarted,
        }
    }

    /// Replaces the configured deadline, including with `Duration::ZERO`,
    /// which the configuration itself does not accept.
    #[inline]
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }

    #[inline]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Encodes and searches the instance.
    ///
    /// # Errors
    ///
    /// `Configuration` for an invalid `SolveConfig`, `Build` if the encoding
    /// breaks an internal invariant, `ModelInvalid` if the backend rejects
    /// the model and `AlreadySolved` on every call after the first.
    #[tracing::instrument(
        skip_all,
        fields(
            grades = self.instance.num_grades(),
            lines = self.instance.num_lines(),
            backend = self.backend.name()
        )
    )]
    pub fn solve(&mut self) -> Result<ScheduleOutcome, ScheduleError> {
        if self.state != DriverState::NotStarted {
            return Err(ScheduleError::AlreadySolved);
        }
        self.config.validate()?;

        let mut encoding = ModelBuilder::new(self.instance, self.config).build()?;
        let objective = ObjectiveFunction::from_config(self.config);
        encoding.set_objective(objective.expression(&encoding));

        let parameters = SearchParameters {
            time_limit: self.time_limit.unwrap_or_else(|| self.config.time_limit()),
            num_workers: self.config.worker_count,
            seed: self.config.random_seed,
            log_progress: self.config.log_search_progress,
        };
        tracing::info!(
            encoding = %encoding,
            objective = %objective,
            parameters = %parameters,
            "solving schedule"
        );

        let layout = SnapshotLayout::new(&encoding);
        let mut recorder = IncumbentRecorder::new(&layout);
        self.state = DriverState::Searching;
        let outcome = match self
            .backend
            .solve(encoding.model(), &parameters, &mut recorder)
        {
            Ok(outcome) => outcome,
            Err(error) => {
                self.state = DriverState::Failed;
                tracing::warn!(%error, "backend failed");
                return Err(error.into());
            }
        };
        let incumbents = recorder.into_log();

        let status = outcome.status();
        debug_assert_eq!(
            outcome.result.assignment().map(|a| a.objective()),
            incumbents.last().map(IncumbentSnapshot::objective),
            "the recorded log must end with the backend's best assignment"
        );
        debug_assert!(
            incumbents
                .last()
                .is_none_or(|best| objective.evaluate(best) == best.objective()),
            "the search objective must match the objective recomputed from the snapshot"
        );

        let diagnostics = (status == SolveStatus::Infeasible).then(|| {
            let conflicts: Vec<(ConstraintFamily, u64)> = outcome
                .statistics
                .family_conflicts
                .iter()
                .enumerate()
                .filter_map(|(index, &count)| {
                    encoding
                        .family_of(FamilyId::new(index))
                        .map(|family| (family, count))
                })
                .collect();
            diagnose(self.instance, self.config, &conflicts)
        });

        self.state = DriverState::Finished(status);
        tracing::info!(
            status = %status,
            reason = %outcome.reason,
            incumbents = incumbents.len(),
            objective = ?incumbents.last().map(IncumbentSnapshot::objective),
            "schedule solve finished"
        );

        Ok(ScheduleOutcome {
            status,
            reason: outcome.reason,
            num_days: encoding.num_days(),
            incumbents,
            statistics: outcome.statistics,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use gradeplan_model::{calendar::Calendar, index::DayIndex, instance::InstanceBuilder};
    use gradeplan_search::{
        backend::BackendError, incumbent::ImprovementCallback, model::{CpModel, ModelError},
        result::{SolverOutcome, SolverResult},
    };

    fn small_instance() -> Instance {
        let calendar = Calendar::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 3);
        let mut builder = InstanceBuilder::new(calendar);
        let a = builder.add_grade("A");
        let line = builder.add_line("L1", 10);
        builder.allow_line(a, line);
        builder.set_demand(a, DayIndex::new(1), 10);
        builder.build().unwrap()
    }

    fn config() -> SolveConfig {
        SolveConfig::default()
            .with_buffer_days(0)
            .with_worker_count(2)
            .with_time_limit_seconds(30)
    }

    struct RejectingBackend;

    impl SolverBackend for RejectingBackend {
        fn name(&self) -> &str {
            "RejectingBackend"
        }

        fn solve(
            &mut self,
            _model: &CpModel,
            _parameters: &SearchParameters,
            _callback: &mut (dyn ImprovementCallback + Send),
        ) -> Result<SolverOutcome, BackendError> {
            Err(BackendError::ModelInvalid(ModelError::ObjectiveOverflow))
        }
    }

    struct GivingUpBackend;

    impl SolverBackend for GivingUpBackend {
        fn name(&self) -> &str {
            "GivingUpBackend"
        }

        fn solve(
            &mut self,
            _model: &CpModel,
            _parameters: &SearchParameters,
            _callback: &mut (dyn ImprovementCallback + Send),
        ) -> Result<SolverOutcome, BackendError> {
            Ok(SolverOutcome::new(
                SolverResult::Unknown,
                TerminationReason::Aborted("time limit reached".to_string()),
                SolverStatistics::default(),
            ))
        }
    }

    #[test]
    fn test_solve_reaches_optimum_and_finishes() {
        let instance = small_instance();
        let config = config();
        let mut driver = SolverDriver::new(&instance, &config);
        assert_eq!(driver.state(), DriverState::NotStarted);

        let outcome = driver.solve().unwrap();
        assert_eq!(outcome.status(), SolveStatus::Optimal);
        assert_eq!(outcome.objective(), Some(0));
        assert_eq!(driver.state(), DriverState::Finished(SolveStatus::Optimal));
        assert!(outcome.diagnostics().is_none());

        let objectives: Vec<i64> = outcome.incumbents().iter().map(|s| s.objective()).collect();
        assert!(objectives.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_second_solve_is_rejected() {
        let instance = small_instance();
        let config = config();
        let mut driver = SolverDriver::new(&instance, &config);
        driver.solve().unwrap();
        match driver.solve() {
            Err(ScheduleError::AlreadySolved) => {}
            other => panic!("expected AlreadySolved, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected_before_search() {
        let instance = small_instance();
        let config = config().with_worker_count(0);
        let mut driver = SolverDriver::new(&instance, &config);
        match driver.solve() {
            Err(ScheduleError::Configuration(_)) => {}
            other => panic!("expected Configuration error, got {:?}", other),
        }
        assert_eq!(driver.state(), DriverState::NotStarted);
    }

    #[test]
    fn test_model_rejection_surfaces_as_model_invalid() {
        let instance = small_instance();
        let config = config();
        let mut driver = SolverDriver::with_backend(&instance, &config, RejectingBackend);
        match driver.solve() {
            Err(ScheduleError::ModelInvalid(ModelError::ObjectiveOverflow)) => {}
            other => panic!("expected ModelInvalid, got {:?}", other),
        }
        assert_eq!(driver.state(), DriverState::Failed);
        match driver.solve() {
            Err(ScheduleError::AlreadySolved) => {}
            other => panic!("expected AlreadySolved, got {:?}", other),
        }
    }

    #[test]
    fn test_aborted_search_without_incumbent_is_unknown() {
        let instance = small_instance();
        let config = config();
        let mut driver = SolverDriver::with_backend(&instance, &config, GivingUpBackend);
        let outcome = driver.solve().unwrap();
        assert_eq!(outcome.status(), SolveStatus::Unknown);
        assert!(outcome.best().is_none());
        assert!(outcome.incumbents().is_empty());
    }

    #[test]
    fn test_zero_deadline_is_unknown() {
        let instance = small_instance();
        let config = config();
        let mut driver = SolverDriver::new(&instance, &config).with_time_limit(Duration::ZERO);
        let outcome = driver.solve().unwrap();
        assert_eq!(outcome.status(), SolveStatus::Unknown);
        assert_eq!(outcome.objective(), None);
    }
}
