//! Pipeline stages and their wire names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of the fixed five-step processing pipeline, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Import,
    FindSpots,
    Index,
    Refine,
    Integrate,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Import,
        Stage::FindSpots,
        Stage::Index,
        Stage::Refine,
        Stage::Integrate,
    ];

    /// Position of the stage in the pipeline, starting at 0.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Stage::Import => 0,
            Stage::FindSpots => 1,
            Stage::Index => 2,
            Stage::Refine => 3,
            Stage::Integrate => 4,
        }
    }

    /// The stage enabled by a successful run of this one.
    #[must_use]
    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// The stage whose result enables this one.
    #[must_use]
    pub fn previous(self) -> Option<Stage> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Backend command that runs this stage.
    #[must_use]
    pub fn run_command(self) -> &'static str {
        match self {
            Stage::Import => "dials.import",
            Stage::FindSpots => "dials.find_spots",
            Stage::Index => "dials.index",
            Stage::Refine => "dials.refine",
            Stage::Integrate => "dials.integrate",
        }
    }

    /// Inbound command carrying this stage's log text.
    #[must_use]
    pub fn log_command(self) -> &'static str {
        match self {
            Stage::Import => "update_import_log",
            Stage::FindSpots => "update_find_spots_log",
            Stage::Index => "update_index_log",
            Stage::Refine => "update_refine_log",
            Stage::Integrate => "update_integrate_log",
        }
    }

    /// Resolve an inbound log command back to its stage.
    #[must_use]
    pub fn from_log_command(command: &str) -> Option<Stage> {
        Self::ALL.into_iter().find(|s| s.log_command() == command)
    }

    /// Short label for tabs and tables.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Stage::Import => "Import",
            Stage::FindSpots => "Find Spots",
            Stage::Index => "Index",
            Stage::Refine => "Refine",
            Stage::Integrate => "Integrate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_order() {
        assert_eq!(Stage::Import.next(), Some(Stage::FindSpots));
        assert_eq!(Stage::Integrate.next(), None);
        assert_eq!(Stage::Import.previous(), None);
        assert_eq!(Stage::Refine.previous(), Some(Stage::Index));
        assert!(Stage::FindSpots < Stage::Index);
    }

    #[test]
    fn test_log_command_lookup() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_log_command(stage.log_command()), Some(stage));
        }
        assert_eq!(Stage::from_log_command("update_lineplot"), None);
    }
}
