//! lauepix-core: State and protocol logic for the lauepix operator console.
//!
//! This crate holds everything the console does that is not drawing or
//! networking: the stage pipeline state machine, option merging, the
//! reflection registry, the interactive line plot and view gating.

pub mod error;
pub mod markup;
pub mod options;
pub mod plot;
pub mod protocol;
pub mod reflection;
pub mod session;
pub mod stage;
pub mod store;
pub mod transport;
pub mod views;

pub use error::{Error, ProtocolError, Result};
pub use markup::markup_to_plain;
pub use options::{parse_advanced, AlgorithmArgs, OptionSet};
pub use plot::{
    AxisDomain, LineplotUpdate, OverlayPoint, OverlayRegion, PlotSeries, PlotState, Sample,
    ZoomOutcome, ZoomWindow,
};
pub use protocol::{
    ChannelMessage, Command, ExperimentUpdate, Inbound, IntegrationProfile, PlannerUpdate,
    StageLog, StageResult,
};
pub use reflection::{RawReflection, RawReflectionTable, Reflection, ReflectionId, ReflectionRegistry};
pub use session::{ExperimentSummary, Session};
pub use stage::Stage;
pub use store::{StageOutcome, StageRecord, StageStatus, StageStore};
pub use transport::{RecordingTransport, Transport};
pub use views::{LatticeViewState, PlannerState, ViewComposer, ViewKind};
