//! Mutually exclusive full-size views.
//!
//! Every view owns private state that lives for the whole session. Switching
//! views only changes which one is drawn; hidden views keep their state (plot
//! zoom, planner orientations, integration profile) until they are shown again.

use std::fmt;

use crate::error::{Error, Result};
use crate::plot::PlotState;
use crate::protocol::{IntegrationProfile, PlannerUpdate};
use crate::stage::Stage;
use crate::store::StageStore;

/// Names of the sub-views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewKind {
    #[default]
    ExperimentViewer,
    ReciprocalLattice,
    ExperimentPlanner,
    IntegrationProfiler,
}

impl ViewKind {
    pub const ALL: [ViewKind; 4] = [
        ViewKind::ExperimentViewer,
        ViewKind::ReciprocalLattice,
        ViewKind::ExperimentPlanner,
        ViewKind::IntegrationProfiler,
    ];

    /// Stage that must have produced a result before the view opens.
    #[must_use]
    pub fn gate(self) -> Option<Stage> {
        match self {
            ViewKind::ExperimentViewer | ViewKind::IntegrationProfiler => None,
            ViewKind::ReciprocalLattice => Some(Stage::FindSpots),
            ViewKind::ExperimentPlanner => Some(Stage::Index),
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ViewKind::ExperimentViewer => "Experiment",
            ViewKind::ReciprocalLattice => "Reciprocal Lattice",
            ViewKind::ExperimentPlanner => "Experiment Planner",
            ViewKind::IntegrationProfiler => "Integration Profiler",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Orientations stored in the experiment planner and their reflection counts.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerState {
    orientations: Vec<f64>,
    reflections: Vec<u64>,
}

impl Default for PlannerState {
    fn default() -> Self {
        Self {
            orientations: vec![0.0],
            reflections: vec![0],
        }
    }
}

impl PlannerState {
    #[must_use]
    pub fn orientations(&self) -> &[f64] {
        &self.orientations
    }

    #[must_use]
    pub fn reflections(&self) -> &[u64] {
        &self.reflections
    }

    /// Orientation currently being explored.
    #[must_use]
    pub fn current(&self) -> f64 {
        self.orientations.last().copied().unwrap_or_default()
    }

    /// Lock in the current orientation and start a new one from it.
    pub fn store(&mut self) {
        self.orientations.push(self.current());
        self.reflections.push(0);
    }

    /// Forget stored orientations, keeping only the current one.
    pub fn clear(&mut self) {
        self.orientations = vec![self.current()];
        self.reflections = vec![0];
    }

    /// Backend reported counts for the current orientation.
    pub fn apply(&mut self, update: PlannerUpdate) {
        if let Some(last) = self.orientations.last_mut() {
            *last = update.orientation;
        }
        if let Some(last) = self.reflections.last_mut() {
            *last = update.reflections;
        }
    }
}

/// Toggles of the reciprocal-lattice view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatticeViewState {
    pub indexed_only: bool,
}

/// Active view and the private state of every view.
#[derive(Debug, Default)]
pub struct ViewComposer {
    active: ViewKind,
    pub experiment: PlotState,
    pub lattice: LatticeViewState,
    pub planner: PlannerState,
    pub profile: Option<IntegrationProfile>,
}

impl ViewComposer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active(&self) -> ViewKind {
        self.active
    }

    /// Whether the view's tab can be opened given the stage results so far.
    #[must_use]
    pub fn is_enabled(view: ViewKind, stages: &StageStore) -> bool {
        view.gate().map_or(true, |stage| stages.has_result(stage))
    }

    /// Make `view` the visible one.
    ///
    /// # Errors
    ///
    /// [`Error::ViewDisabled`] if the view's gating stage has no result yet.
    pub fn activate(&mut self, view: ViewKind, stages: &StageStore) -> Result<()> {
        if !Self::is_enabled(view, stages) {
            return Err(Error::ViewDisabled(view));
        }
        self.active = view;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{LineplotUpdate, PlotSeries};
    use crate::protocol::StageResult;

    #[test]
    fn test_gated_views() {
        let mut stages = StageStore::new();
        let mut views = ViewComposer::new();

        assert!(matches!(
            views.activate(ViewKind::ReciprocalLattice, &stages),
            Err(Error::ViewDisabled(ViewKind::ReciprocalLattice))
        ));
        views.activate(ViewKind::IntegrationProfiler, &stages).unwrap();

        stages.apply_result(Stage::FindSpots, StageResult::default());
        views.activate(ViewKind::ReciprocalLattice, &stages).unwrap();
        assert_eq!(views.active(), ViewKind::ReciprocalLattice);
        assert!(!ViewComposer::is_enabled(ViewKind::ExperimentPlanner, &stages));
    }

    #[test]
    fn test_hidden_view_keeps_state() {
        let stages = StageStore::new();
        let mut views = ViewComposer::new();
        views.experiment.replace(LineplotUpdate {
            series: PlotSeries::from_xy(&[0.0, 500.0, 1000.0], &[1.0, 9.0, 2.0]).unwrap(),
            ..LineplotUpdate::default()
        });
        views.experiment.pointer_down(Some(0.0));
        views.experiment.pointer_move(Some(500.0));
        views.experiment.pointer_up();
        views.planner.store();

        views.activate(ViewKind::IntegrationProfiler, &stages).unwrap();
        views.activate(ViewKind::ExperimentViewer, &stages).unwrap();

        assert!(views.experiment.can_zoom_out());
        assert_eq!(views.planner.orientations().len(), 2);
    }

    #[test]
    fn test_planner_store_and_clear() {
        let mut planner = PlannerState::default();
        planner.apply(PlannerUpdate {
            orientation: 30.0,
            reflections: 120,
        });
        planner.store();
        assert_eq!(planner.orientations(), [30.0, 30.0]);
        assert_eq!(planner.reflections(), [120, 0]);

        planner.apply(PlannerUpdate {
            orientation: 45.0,
            reflections: 80,
        });
        planner.clear();
        assert_eq!(planner.orientations(), [45.0]);
        assert_eq!(planner.reflections(), [0]);
    }
}
