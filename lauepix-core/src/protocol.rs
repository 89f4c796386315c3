//! Channel message envelope and the closed set of commands on each side.
//!
//! Every frame on the wire is a JSON object with a `channel`, a `command` and
//! any number of command-specific keys at the top level. Outbound frames go
//! to the `server` channel; the console only listens on `gui`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::options::AlgorithmArgs;
use crate::plot::{LineplotUpdate, OverlayPoint, OverlayRegion, PlotSeries};
use crate::reflection::RawReflectionTable;
use crate::stage::Stage;

/// Channel the backend listens on.
pub const SERVER_CHANNEL: &str = "server";
/// Channel this console subscribes to.
pub const GUI_CHANNEL: &str = "gui";

/// Raw message as it travels over the connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub command: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ChannelMessage {
    #[must_use]
    pub fn new(channel: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            command: command.into(),
            payload: Map::new(),
        }
    }

    /// Add a payload field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Parse a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Json`] if the frame is not a JSON object.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Json`] if a payload value cannot be encoded.
    pub fn to_text(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Commands the console sends to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Sent once after every successful connect.
    RecordConnection { id: String },
    /// Run a stage with merged options.
    RunStage { stage: Stage, args: AlgorithmArgs },
    /// Upload an experiment file and import it.
    ImportFile {
        filename: String,
        data_url: String,
        args: AlgorithmArgs,
    },
    /// Ask the backend to open its own file browser and import the choice.
    BrowseForImport { args: AlgorithmArgs },
    CancelActiveTask,
    /// Restrict the experiment images to a time-of-flight window (µs).
    UpdateExperimentImages { tof_range: (f64, f64) },
    StorePlannerReflections,
    ClearPlannerReflections { orientation: f64 },
    NextBestPlannerOrientation { orientations: Vec<f64> },
}

impl Command {
    /// Wire name of the command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::RecordConnection { .. } => "record_connection",
            Command::RunStage { stage, .. } => stage.run_command(),
            Command::ImportFile { .. } => Stage::Import.run_command(),
            Command::BrowseForImport { .. } => "browse_files_for_import",
            Command::CancelActiveTask => "cancel_active_task",
            Command::UpdateExperimentImages { .. } => "update_experiment_images",
            Command::StorePlannerReflections => "store_planner_reflections",
            Command::ClearPlannerReflections { .. } => "clear_planner_reflections",
            Command::NextBestPlannerOrientation { .. } => "get_next_best_planner_orientation",
        }
    }

    /// Build the envelope addressed to the server channel.
    #[must_use]
    pub fn to_message(&self) -> ChannelMessage {
        let message = ChannelMessage::new(SERVER_CHANNEL, self.name());
        match self {
            Command::RecordConnection { id } => message.with("id", id.as_str()),
            Command::RunStage { args, .. } | Command::BrowseForImport { args } => {
                message.with("args", args_value(args))
            }
            Command::ImportFile {
                filename,
                data_url,
                args,
            } => message
                .with("filename", filename.as_str())
                .with("file", data_url.as_str())
                .with("args", args_value(args)),
            Command::UpdateExperimentImages { tof_range } => {
                message.with("tof_range", vec![tof_range.0, tof_range.1])
            }
            Command::ClearPlannerReflections { orientation } => message
                .with("orientations", vec![*orientation])
                .with("reflections", vec![0]),
            Command::NextBestPlannerOrientation { orientations } => {
                message.with("orientations", orientations.clone())
            }
            Command::CancelActiveTask | Command::StorePlannerReflections => message,
        }
    }
}

fn args_value(args: &AlgorithmArgs) -> Value {
    Value::Object(
        args.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// Experiment description pushed when an import completes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExperimentUpdate {
    pub instrument_name: String,
    pub experiment_description: String,
}

/// Result fields of a stage log message; presence means the run succeeded.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StageResult {
    pub reflections_summary: String,
    #[serde(default)]
    pub crystal_summary: Option<String>,
    #[serde(default)]
    pub integration_summary: Option<String>,
    #[serde(default)]
    pub reflection_table: Option<RawReflectionTable>,
}

/// Log push for one stage, with the result when the run has finished.
#[derive(Debug, Clone, PartialEq)]
pub struct StageLog {
    pub stage: Stage,
    pub log: String,
    pub result: Option<StageResult>,
}

/// Planner reflection count for the newest orientation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PlannerUpdate {
    pub orientation: f64,
    pub reflections: u64,
}

/// Integrated profile of one reflection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationProfile {
    #[serde(default)]
    pub title: String,
    pub tof: Vec<f64>,
    pub intensity: Vec<f64>,
    #[serde(default)]
    pub background: Vec<f64>,
    #[serde(default)]
    pub line_profile: Vec<f64>,
    #[serde(default)]
    pub line_profile_value: Option<f64>,
    #[serde(default)]
    pub line_profile_variance: Option<f64>,
}

/// Messages the console acts on, validated at the channel boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    StageLog(StageLog),
    Experiment(ExperimentUpdate),
    Lineplot(LineplotUpdate),
    IntegrationProfile(IntegrationProfile),
    Planner(PlannerUpdate),
}

#[derive(Deserialize)]
struct LogPayload {
    log: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineplotPayload {
    x: Vec<f64>,
    y: Vec<f64>,
    #[serde(default)]
    bbox_pos: Vec<OverlayRegion>,
    #[serde(default)]
    centroid_pos: Vec<OverlayPoint>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    update_table_selection: bool,
}

impl Inbound {
    /// Decode a text frame.
    ///
    /// Returns `Ok(None)` for frames addressed to another channel.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] for malformed frames, unknown commands and
    /// payloads missing required fields.
    pub fn decode(text: &str) -> Result<Option<Self>, ProtocolError> {
        Self::from_message(ChannelMessage::parse(text)?)
    }

    /// Interpret an envelope addressed to this console.
    ///
    /// # Errors
    ///
    /// See [`Inbound::decode`].
    pub fn from_message(message: ChannelMessage) -> Result<Option<Self>, ProtocolError> {
        if message.channel != GUI_CHANNEL {
            return Ok(None);
        }
        let ChannelMessage {
            command, payload, ..
        } = message;

        let inbound = if let Some(stage) = Stage::from_log_command(&command) {
            let LogPayload { log } = payload_as(&command, &payload)?;
            let result = if payload.contains_key("reflections_summary") {
                Some(payload_as(&command, &payload)?)
            } else {
                None
            };
            Inbound::StageLog(StageLog { stage, log, result })
        } else {
            match command.as_str() {
                "update_experiment" => Inbound::Experiment(payload_as(&command, &payload)?),
                "update_lineplot" => {
                    let p: LineplotPayload = payload_as(&command, &payload)?;
                    Inbound::Lineplot(LineplotUpdate {
                        title: p.title,
                        series: PlotSeries::from_xy(&p.x, &p.y)?,
                        regions: p.bbox_pos,
                        points: p.centroid_pos,
                        update_table_selection: p.update_table_selection,
                    })
                }
                "update_integration_profiler" => {
                    Inbound::IntegrationProfile(payload_as(&command, &payload)?)
                }
                "update_experiment_planner" => Inbound::Planner(payload_as(&command, &payload)?),
                _ => return Err(ProtocolError::UnknownCommand(command)),
            }
        };
        Ok(Some(inbound))
    }
}

fn payload_as<T: serde::de::DeserializeOwned>(
    command: &str,
    payload: &Map<String, Value>,
) -> Result<T, ProtocolError> {
    T::deserialize(Value::Object(payload.clone())).map_err(|source| ProtocolError::InvalidPayload {
        command: command.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_other_channel_ignored() {
        let text = json!({"channel": "rlv", "command": "update_import_log", "log": "x"});
        assert_eq!(Inbound::decode(&text.to_string()).unwrap(), None);

        let text = json!({"command": "update_import_log", "log": "x"});
        assert_eq!(Inbound::decode(&text.to_string()).unwrap(), None);
    }

    #[test]
    fn test_unknown_command_rejected() {
        let text = json!({"channel": "gui", "command": "launch_rockets"});
        assert!(matches!(
            Inbound::decode(&text.to_string()),
            Err(ProtocolError::UnknownCommand(c)) if c == "launch_rockets"
        ));
    }

    #[test]
    fn test_missing_log_is_invalid() {
        let text = json!({"channel": "gui", "command": "update_index_log"});
        assert!(matches!(
            Inbound::decode(&text.to_string()),
            Err(ProtocolError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_log_without_result() {
        let text = json!({"channel": "gui", "command": "update_refine_log", "log": "cycle 3"});
        let Some(Inbound::StageLog(log)) = Inbound::decode(&text.to_string()).unwrap() else {
            panic!("expected a stage log");
        };
        assert_eq!(log.stage, Stage::Refine);
        assert_eq!(log.log, "cycle 3");
        assert!(log.result.is_none());
    }

    #[test]
    fn test_lineplot_decoded() {
        let text = json!({
            "channel": "gui",
            "command": "update_lineplot",
            "x": [1.0, 2.0],
            "y": [3.0, 4.0],
            "bboxPos": [{"id": "0", "x1": 1.0, "x2": 2.0}],
            "centroidPos": [{"id": 0, "x": 1.5, "y": 4.0, "millerIdx": [0, 0, 1]}],
            "title": "panel0",
            "updateTableSelection": true
        });
        let Some(Inbound::Lineplot(update)) = Inbound::decode(&text.to_string()).unwrap() else {
            panic!("expected a lineplot");
        };
        assert_eq!(update.series.samples().len(), 2);
        assert_eq!(update.table_selection().map(|id| id.as_str()), Some("0"));
    }

    #[test]
    fn test_run_command_envelope() {
        let mut args = AlgorithmArgs::new();
        args.insert("gain".into(), "2".into());
        let message = Command::RunStage {
            stage: Stage::FindSpots,
            args,
        }
        .to_message();

        let value: Value = serde_json::from_str(&message.to_text().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"channel": "server", "command": "dials.find_spots", "args": {"gain": "2"}})
        );
    }

    #[test]
    fn test_cancel_and_tof_envelopes() {
        let cancel = Command::CancelActiveTask.to_message();
        assert_eq!(cancel.command, "cancel_active_task");
        assert!(cancel.payload.is_empty());

        let tof = Command::UpdateExperimentImages {
            tof_range: (100.0, 900.0),
        }
        .to_message();
        assert_eq!(tof.payload["tof_range"], json!([100.0, 900.0]));
    }
}
