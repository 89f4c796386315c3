//! One console session: the stage store, reflection registry and views wired
//! to a backend transport.
//!
//! All mutation goes through [`Session`], one event at a time: user commands
//! via the `run_*`/`cancel`/`select_*` methods and backend pushes via
//! [`Session::dispatch`].

use crate::error::Result;
use crate::options::OptionSet;
use crate::protocol::{Command, ExperimentUpdate, Inbound, StageLog, StageResult};
use crate::reflection::{ReflectionId, ReflectionRegistry};
use crate::stage::Stage;
use crate::store::StageStore;
use crate::transport::Transport;
use crate::views::{ViewComposer, ViewKind};

/// Summary lines shown above the views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentSummary {
    pub instrument_name: String,
    pub experiment_description: String,
    pub reflections_summary: String,
    pub crystal_summary: String,
    pub integration_summary: String,
}

impl ExperimentSummary {
    fn apply_experiment(&mut self, experiment: &ExperimentUpdate) {
        self.instrument_name.clone_from(&experiment.instrument_name);
        self.experiment_description
            .clone_from(&experiment.experiment_description);
    }

    fn apply_result(&mut self, result: &StageResult) {
        self.reflections_summary = format!("Identified {}", result.reflections_summary);
        if let Some(crystal) = &result.crystal_summary {
            self.crystal_summary.clone_from(crystal);
        }
        if let Some(integration) = &result.integration_summary {
            self.integration_summary.clone_from(integration);
        }
    }
}

/// Client-side state of the operator console.
#[derive(Debug)]
pub struct Session<T> {
    transport: T,
    stages: StageStore,
    reflections: ReflectionRegistry,
    views: ViewComposer,
    summary: ExperimentSummary,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            stages: StageStore::new(),
            reflections: ReflectionRegistry::new(),
            views: ViewComposer::new(),
            summary: ExperimentSummary::default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn stages(&self) -> &StageStore {
        &self.stages
    }

    pub fn reflections(&self) -> &ReflectionRegistry {
        &self.reflections
    }

    pub fn views(&self) -> &ViewComposer {
        &self.views
    }

    /// Mutable view state for gestures that stay inside one view.
    pub fn views_mut(&mut self) -> &mut ViewComposer {
        &mut self.views
    }

    pub fn summary(&self) -> &ExperimentSummary {
        &self.summary
    }

    fn send(&self, command: &Command) -> Result<()> {
        log::debug!("sending {}", command.name());
        self.transport.send(&command.to_message())
    }

    /// Run a processing stage with its merged options.
    ///
    /// The stage only enters `Running` once the command has gone out.
    ///
    /// # Errors
    ///
    /// Stage gating errors from the store, or [`crate::Error::NotConnected`].
    pub fn run_stage(&mut self, stage: Stage, options: &OptionSet) -> Result<()> {
        self.start(
            stage,
            &Command::RunStage {
                stage,
                args: options.merged(),
            },
        )
    }

    /// Upload a local file and import it.
    ///
    /// # Errors
    ///
    /// See [`Session::run_stage`].
    pub fn import_file(&mut self, filename: String, data_url: String, options: &OptionSet) -> Result<()> {
        self.start(
            Stage::Import,
            &Command::ImportFile {
                filename,
                data_url,
                args: options.merged(),
            },
        )
    }

    /// Let the backend pick the file to import.
    ///
    /// # Errors
    ///
    /// See [`Session::run_stage`].
    pub fn browse_for_import(&mut self, options: &OptionSet) -> Result<()> {
        self.start(
            Stage::Import,
            &Command::BrowseForImport {
                args: options.merged(),
            },
        )
    }

    fn start(&mut self, stage: Stage, command: &Command) -> Result<()> {
        self.stages.check_runnable(stage)?;
        self.send(command)?;
        self.stages.begin_run(stage)
    }

    /// Ask the backend to stop the running task.
    ///
    /// Local state is left alone until the backend's terminal message.
    ///
    /// # Errors
    ///
    /// [`crate::Error::StageNotRunning`] or [`crate::Error::NotConnected`].
    pub fn cancel(&self, stage: Stage) -> Result<()> {
        self.stages.check_cancellable(stage)?;
        self.send(&Command::CancelActiveTask)
    }

    /// Restrict experiment images to a time-of-flight window.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotConnected`].
    pub fn update_tof_range(&self, min: f64, max: f64) -> Result<()> {
        self.send(&Command::UpdateExperimentImages {
            tof_range: (min, max),
        })
    }

    /// Store the planner's current orientation.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotConnected`]; the planner is unchanged on error.
    pub fn store_planner_orientation(&mut self) -> Result<()> {
        self.send(&Command::StorePlannerReflections)?;
        self.views.planner.store();
        Ok(())
    }

    /// Drop every stored planner orientation but the current one.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotConnected`]; the planner is unchanged on error.
    pub fn clear_planner(&mut self) -> Result<()> {
        self.send(&Command::ClearPlannerReflections {
            orientation: self.views.planner.current(),
        })?;
        self.views.planner.clear();
        Ok(())
    }

    /// Ask the backend for the orientation that adds the most reflections.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotConnected`].
    pub fn request_next_planner_orientation(&self) -> Result<()> {
        self.send(&Command::NextBestPlannerOrientation {
            orientations: self.views.planner.orientations().to_vec(),
        })
    }

    /// Switch the visible view.
    ///
    /// # Errors
    ///
    /// [`crate::Error::ViewDisabled`] if the view is still gated.
    pub fn select_view(&mut self, view: ViewKind) -> Result<()> {
        self.views.activate(view, &self.stages)
    }

    #[must_use]
    pub fn is_view_enabled(&self, view: ViewKind) -> bool {
        ViewComposer::is_enabled(view, &self.stages)
    }

    /// The reflection table is usable once any stage produced reflections.
    #[must_use]
    pub fn reflection_table_enabled(&self) -> bool {
        Stage::ALL[1..].iter().any(|s| self.stages.has_result(*s))
    }

    pub fn select_reflection(&mut self, id: ReflectionId) {
        self.reflections.select(id);
    }

    pub fn clear_selection(&mut self) {
        self.reflections.clear();
    }

    /// Plot click at data coordinate `x`.
    pub fn click_plot(&mut self, x: f64) -> Option<ReflectionId> {
        self.views.experiment.click(x, &mut self.reflections)
    }

    /// Apply one backend push.
    pub fn dispatch(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::StageLog(StageLog { stage, log, result }) => {
                self.stages.apply_log(stage, log);
                if let Some(result) = result {
                    self.summary.apply_result(&result);
                    if let Some(table) = &result.reflection_table {
                        self.reflections.refresh(table);
                    }
                    self.stages.apply_result(stage, result);
                }
            }
            Inbound::Experiment(experiment) => {
                self.summary.apply_experiment(&experiment);
                self.stages.apply_experiment(experiment);
            }
            Inbound::Lineplot(update) => {
                if let Some(id) = update.table_selection() {
                    self.reflections.select(id.clone());
                }
                self.views.experiment.replace(update);
            }
            Inbound::IntegrationProfile(profile) => {
                self.views.profile = Some(profile);
            }
            Inbound::Planner(update) => self.views.planner.apply(update),
        }
    }

    /// Decode and apply one text frame, logging anything that is dropped.
    pub fn dispatch_text(&mut self, text: &str) {
        match Inbound::decode(text) {
            Ok(Some(inbound)) => self.dispatch(inbound),
            Ok(None) => log::trace!("ignoring message for another channel"),
            Err(e) => log::warn!("dropping message: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::RecordingTransport;

    #[test]
    fn test_run_sends_merged_options() {
        let mut session = Session::new(RecordingTransport::new());
        let mut options = OptionSet::new();
        options.set_basic("a", "1");
        options.set_advanced("a=2");

        session.run_stage(Stage::Import, &options).unwrap();

        let sent = session.transport().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].command, "dials.import");
        assert_eq!(sent[0].payload["args"]["a"], "2");
        assert!(session.stages().record(Stage::Import).loading);
    }

    #[test]
    fn test_disconnected_run_stays_idle() {
        let mut session = Session::new(RecordingTransport::disconnected());
        assert!(matches!(
            session.run_stage(Stage::Import, &OptionSet::new()),
            Err(Error::NotConnected)
        ));
        assert!(!session.stages().record(Stage::Import).loading);
    }

    #[test]
    fn test_cancel_waits_for_backend() {
        let mut session = Session::new(RecordingTransport::new());
        session.browse_for_import(&OptionSet::new()).unwrap();
        session.cancel(Stage::Import).unwrap();

        assert!(session.stages().record(Stage::Import).loading);
        assert_eq!(
            session.transport().commands(),
            ["browse_files_for_import", "cancel_active_task"]
        );
    }

    #[test]
    fn test_planner_not_changed_when_offline() {
        let mut session = Session::new(RecordingTransport::disconnected());
        assert!(session.store_planner_orientation().is_err());
        assert_eq!(session.views().planner.orientations().len(), 1);
    }
}
