//! UI state for the stage panels and their option controls.

use lauepix_core::{OptionSet, Stage};

/// Threshold algorithm used by spot finding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThresholdAlgorithm {
    #[default]
    Dispersion,
    RadialProfile,
}

impl ThresholdAlgorithm {
    pub const ALL: [ThresholdAlgorithm; 2] =
        [ThresholdAlgorithm::Dispersion, ThresholdAlgorithm::RadialProfile];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ThresholdAlgorithm::Dispersion => "Dispersion",
            ThresholdAlgorithm::RadialProfile => "Radial profile",
        }
    }

    #[must_use]
    pub fn value(self) -> &'static str {
        match self {
            ThresholdAlgorithm::Dispersion => "dispersion",
            ThresholdAlgorithm::RadialProfile => "radial_profile",
        }
    }
}

const DISPERSION_KEYS: [&str; 6] = [
    "gain",
    "sigma_strong",
    "sigma_background",
    "global_threshold",
    "kernel_size",
    "min_local",
];
const RADIAL_PROFILE_KEYS: [&str; 2] = ["n_iqr", "blur"];

/// Spot-finding controls.
#[derive(Clone, Debug, PartialEq)]
pub struct FindSpotsParams {
    pub algorithm: ThresholdAlgorithm,
    pub gain: f64,
    pub sigma_strong: f64,
    pub sigma_background: f64,
    pub global_threshold: f64,
    pub kernel_size: u32,
    pub min_local: u32,
    pub n_iqr: u32,
    pub blur: bool,
}

impl Default for FindSpotsParams {
    fn default() -> Self {
        Self {
            algorithm: ThresholdAlgorithm::Dispersion,
            gain: 1.0,
            sigma_strong: 3.0,
            sigma_background: 6.0,
            global_threshold: 0.0,
            kernel_size: 3,
            min_local: 2,
            n_iqr: 6,
            blur: false,
        }
    }
}

impl FindSpotsParams {
    /// Write the controls into the basic options.
    ///
    /// Only the keys of the selected algorithm are kept; the other
    /// algorithm's keys are removed.
    pub fn apply(&self, options: &mut OptionSet) {
        options.set_basic("threshold.algorithm", self.algorithm.value());
        match self.algorithm {
            ThresholdAlgorithm::Dispersion => {
                for key in RADIAL_PROFILE_KEYS {
                    options.remove_basic(key);
                }
                options.set_basic("gain", self.gain.to_string());
                options.set_basic("sigma_strong", self.sigma_strong.to_string());
                options.set_basic("sigma_background", self.sigma_background.to_string());
                options.set_basic("global_threshold", self.global_threshold.to_string());
                options.set_basic("kernel_size", format!("{0},{0}", self.kernel_size));
                options.set_basic("min_local", self.min_local.to_string());
            }
            ThresholdAlgorithm::RadialProfile => {
                for key in DISPERSION_KEYS {
                    options.remove_basic(key);
                }
                options.set_basic("n_iqr", self.n_iqr.to_string());
                options.set_basic("blur", if self.blur { "narrow" } else { "None" });
            }
        }
    }
}

/// UI panel state that is not part of the session.
pub struct UiState {
    /// Basic options per stage, filled in as controls are touched.
    pub options: [OptionSet; 5],
    /// Advanced option text per stage.
    pub advanced: [String; 5],
    pub find_spots: FindSpotsParams,
    /// Stage whose panel is shown in the side bar.
    pub active_stage: Stage,
    /// Time-of-flight window picked for the experiment images (µs).
    pub tof_range: Option<(f64, f64)>,
    /// Inline error of the import panel.
    pub import_error: Option<String>,
    /// Last refused action, shown in the status line.
    pub notice: Option<String>,
    /// Scroll the reflection table to the selection on the next frame.
    pub scroll_to_selection: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            options: Default::default(),
            advanced: Default::default(),
            find_spots: FindSpotsParams::default(),
            active_stage: Stage::Import,
            tof_range: None,
            import_error: None,
            notice: None,
            scroll_to_selection: false,
        }
    }
}

impl UiState {
    /// Options to send with a run of `stage`.
    #[must_use]
    pub fn options_for(&self, stage: Stage) -> OptionSet {
        let mut options = self.options[stage.index()].clone();
        options.set_advanced(self.advanced[stage.index()].clone());
        options
    }

    /// Record a change of the spot-finding controls.
    pub fn find_spots_changed(&mut self) {
        self.find_spots
            .apply(&mut self.options[Stage::FindSpots.index()]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_controls_send_nothing() {
        let state = UiState::default();
        assert!(state.options_for(Stage::FindSpots).merged().is_empty());
    }

    #[test]
    fn test_advanced_overrides_controls() {
        let mut state = UiState::default();
        state.find_spots.gain = 2.5;
        state.find_spots_changed();
        state.advanced[Stage::FindSpots.index()] = "gain=4 d_min=1.2".into();

        let merged = state.options_for(Stage::FindSpots).merged();
        assert_eq!(merged["gain"], "4");
        assert_eq!(merged["d_min"], "1.2");
        assert_eq!(merged["threshold.algorithm"], "dispersion");
        assert_eq!(merged["kernel_size"], "3,3");
    }

    #[test]
    fn test_switching_algorithm_drops_other_keys() {
        let mut state = UiState::default();
        state.find_spots_changed();
        state.find_spots.algorithm = ThresholdAlgorithm::RadialProfile;
        state.find_spots_changed();

        let merged = state.options_for(Stage::FindSpots).merged();
        assert_eq!(merged["threshold.algorithm"], "radial_profile");
        assert_eq!(merged["n_iqr"], "6");
        assert!(!merged.contains_key("gain"));
        assert!(!merged.contains_key("sigma_strong"));
    }

    #[test]
    fn test_options_are_per_stage() {
        let mut state = UiState::default();
        state.advanced[Stage::Index.index()] = "method=fft1d".into();
        assert!(state.options_for(Stage::Refine).merged().is_empty());
        assert_eq!(state.options_for(Stage::Index).merged()["method"], "fft1d");
    }
}
