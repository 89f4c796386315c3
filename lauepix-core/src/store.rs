//! Per-stage state records and the stage-enablement state machine.
//!
//! ```text
//! Disabled ──(previous stage result)──▶ Idle ──run──▶ Running
//!                                        ▲               │
//!                                        └──terminal─────┘
//! ```
//!
//! A terminal message is one that carries a result payload. A log-only
//! message never finishes a run and never enables the next stage. Messages
//! that arrive after a terminal one are still applied, last write wins.

use crate::error::{Error, Result};
use crate::protocol::{ExperimentUpdate, StageResult};
use crate::stage::Stage;

/// Outcome kept from the most recent successful run of a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Experiment(ExperimentUpdate),
    Reflections(StageResult),
}

/// UI-facing status derived from a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Disabled,
    Idle,
    Running,
}

/// State of one pipeline stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageRecord {
    pub enabled: bool,
    pub loading: bool,
    /// Backend log text, replaced on every update. May contain simple markup.
    pub log: String,
    pub last_result: Option<StageOutcome>,
    /// Whether a result has arrived since the last run was issued.
    pub succeeded: bool,
}

impl StageRecord {
    #[must_use]
    pub fn status(&self) -> StageStatus {
        if self.loading {
            StageStatus::Running
        } else if self.enabled {
            StageStatus::Idle
        } else {
            StageStatus::Disabled
        }
    }
}

/// Owner of all five stage records.
#[derive(Debug, Clone, PartialEq)]
pub struct StageStore {
    records: [StageRecord; 5],
}

impl Default for StageStore {
    fn default() -> Self {
        let mut records: [StageRecord; 5] = Default::default();
        records[Stage::Import.index()].enabled = true;
        Self { records }
    }
}

impl StageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn record(&self, stage: Stage) -> &StageRecord {
        &self.records[stage.index()]
    }

    fn record_mut(&mut self, stage: Stage) -> &mut StageRecord {
        &mut self.records[stage.index()]
    }

    #[must_use]
    pub fn status(&self, stage: Stage) -> StageStatus {
        self.record(stage).status()
    }

    /// Whether the stage has ever produced a result this session.
    #[must_use]
    pub fn has_result(&self, stage: Stage) -> bool {
        self.record(stage).last_result.is_some()
    }

    /// Stages with a run in flight.
    pub fn running(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL
            .into_iter()
            .filter(|stage| self.record(*stage).loading)
    }

    /// Check that a run may be issued for `stage`.
    ///
    /// # Errors
    ///
    /// [`Error::StageDisabled`] before the previous stage has succeeded,
    /// [`Error::StageBusy`] while a run is in flight.
    pub fn check_runnable(&self, stage: Stage) -> Result<()> {
        match self.status(stage) {
            StageStatus::Idle => Ok(()),
            StageStatus::Running => Err(Error::StageBusy(stage)),
            StageStatus::Disabled => Err(Error::StageDisabled(stage)),
        }
    }

    /// Enter `Running` after the run command went out.
    ///
    /// Clears the log and withdraws the next stage until this run reports a
    /// result.
    ///
    /// # Errors
    ///
    /// Same as [`StageStore::check_runnable`].
    pub fn begin_run(&mut self, stage: Stage) -> Result<()> {
        self.check_runnable(stage)?;
        let record = self.record_mut(stage);
        record.loading = true;
        record.succeeded = false;
        record.log.clear();
        if let Some(next) = stage.next() {
            self.record_mut(next).enabled = false;
        }
        log::debug!("{stage} running");
        Ok(())
    }

    /// Check that cancel makes sense for `stage`.
    ///
    /// Cancelling does not change local state; the backend's terminal message
    /// does.
    ///
    /// # Errors
    ///
    /// [`Error::StageNotRunning`] if nothing is in flight.
    pub fn check_cancellable(&self, stage: Stage) -> Result<()> {
        if self.record(stage).loading {
            Ok(())
        } else {
            Err(Error::StageNotRunning(stage))
        }
    }

    /// Replace the stage log.
    pub fn apply_log(&mut self, stage: Stage, log: String) {
        self.record_mut(stage).log = log;
    }

    /// Terminal message for a processing stage.
    pub fn apply_result(&mut self, stage: Stage, result: StageResult) {
        self.finish(stage, StageOutcome::Reflections(result));
    }

    /// Terminal message for the import stage.
    pub fn apply_experiment(&mut self, experiment: ExperimentUpdate) {
        self.finish(Stage::Import, StageOutcome::Experiment(experiment));
    }

    fn finish(&mut self, stage: Stage, outcome: StageOutcome) {
        let record = self.record_mut(stage);
        record.loading = false;
        record.succeeded = true;
        record.last_result = Some(outcome);
        if let Some(next) = stage.next() {
            self.record_mut(next).enabled = true;
        }
        log::debug!("{stage} finished");
    }
}
