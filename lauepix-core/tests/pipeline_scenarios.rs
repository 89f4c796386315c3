//! End-to-end behaviour of a session driven by backend pushes.

use lauepix_core::{
    Error, OptionSet, RecordingTransport, ReflectionId, Session, Stage, StageStatus, ViewKind,
    ZoomOutcome,
};
use serde_json::json;

fn push(session: &mut Session<RecordingTransport>, frame: &serde_json::Value) {
    session.dispatch_text(&frame.to_string());
}

fn stage_log(stage: &str, log: &str) -> serde_json::Value {
    json!({"channel": "gui", "command": format!("update_{stage}_log"), "log": log})
}

fn stage_result(stage: &str, table: &serde_json::Value) -> serde_json::Value {
    json!({
        "channel": "gui",
        "command": format!("update_{stage}_log"),
        "log": "done",
        "reflections_summary": "120 reflections",
        "reflection_table": table,
    })
}

fn imported() -> Session<RecordingTransport> {
    let mut session = Session::new(RecordingTransport::new());
    session.run_stage(Stage::Import, &OptionSet::new()).unwrap();
    push(
        &mut session,
        &json!({
            "channel": "gui",
            "command": "update_experiment",
            "instrument_name": "SXD",
            "experiment_description": "NaCl",
        }),
    );
    session
}

#[test]
fn test_find_spots_result_populates_table() {
    let mut session = imported();
    session.run_stage(Stage::FindSpots, &OptionSet::new()).unwrap();

    push(
        &mut session,
        &stage_result(
            "find_spots",
            &json!({"panel0": [{"panelName": "panel0", "xyzObs": [10.4, 20.6]}]}),
        ),
    );

    assert!(!session.stages().record(Stage::FindSpots).loading);
    assert!(session.stages().record(Stage::Index).enabled);

    let rows = session.reflections().reflections();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id.as_str(), "0");
    assert_eq!(rows[0].xyz_obs, "(21, 10)");
    assert_eq!(rows[0].miller_idx, "-");
    assert_eq!(session.summary().reflections_summary, "Identified 120 reflections");
    assert_eq!(session.summary().instrument_name, "SXD");
}

#[test]
fn test_ids_follow_panel_then_record_order() {
    let mut session = imported();
    push(
        &mut session,
        &stage_result(
            "find_spots",
            &json!({
                "panel1": [{"xyzObs": [1.0, 1.0]}, {"xyzObs": [2.0, 2.0]}],
                "panel0": [{"xyzObs": [3.0, 3.0]}],
            }),
        ),
    );

    let rows = session.reflections().reflections();
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["0", "1", "2"]);
    let panels: Vec<&str> = rows.iter().map(|r| r.panel.as_str()).collect();
    assert_eq!(panels, ["panel1", "panel1", "panel0"]);
}

#[test]
fn test_next_stage_tracks_latest_run() {
    let mut session = imported();
    let table = json!({"panel0": []});

    assert_eq!(session.stages().status(Stage::Index), StageStatus::Disabled);
    session.run_stage(Stage::FindSpots, &OptionSet::new()).unwrap();
    push(&mut session, &stage_log("find_spots", "working"));
    assert_eq!(session.stages().status(Stage::Index), StageStatus::Disabled);

    push(&mut session, &stage_result("find_spots", &table));
    assert_eq!(session.stages().status(Stage::Index), StageStatus::Idle);

    session.run_stage(Stage::FindSpots, &OptionSet::new()).unwrap();
    assert!(matches!(
        session.run_stage(Stage::Index, &OptionSet::new()),
        Err(Error::StageDisabled(Stage::Index))
    ));
    push(&mut session, &stage_result("find_spots", &table));
    session.run_stage(Stage::Index, &OptionSet::new()).unwrap();
}

#[test]
fn test_repeated_terminal_message_is_idempotent() {
    let mut session = imported();
    session.run_stage(Stage::FindSpots, &OptionSet::new()).unwrap();
    let frame = stage_result("find_spots", &json!({"panel0": [{"xyzObs": [1.0, 2.0]}]}));

    push(&mut session, &frame);
    let once = session.stages().clone();
    let rows_once = session.reflections().reflections().to_vec();

    push(&mut session, &frame);
    assert_eq!(session.stages(), &once);
    assert_eq!(session.reflections().reflections(), rows_once.as_slice());
    assert_eq!(session.reflections().revision(), 2);
}

#[test]
fn test_malformed_frames_are_dropped() {
    let mut session = imported();
    session.dispatch_text("not json");
    push(&mut session, &json!({"channel": "gui", "command": "self_destruct"}));
    push(
        &mut session,
        &json!({"channel": "gui", "command": "update_lineplot", "x": [1.0], "y": []}),
    );

    assert_eq!(session.stages().status(Stage::FindSpots), StageStatus::Idle);
    assert_eq!(session.views().experiment.title(), "-");
}

#[test]
fn test_new_lineplot_resets_zoom_and_keeps_selection_inert() {
    let mut session = imported();
    let x: Vec<f64> = (0..=10).map(|i| f64::from(i) * 100.0).collect();
    let y: Vec<f64> = vec![0.0, 5.0, 50.0, 20.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    push(
        &mut session,
        &json!({
            "channel": "gui",
            "command": "update_lineplot",
            "x": x,
            "y": y,
            "bboxPos": [{"id": "7", "x1": 150.0, "x2": 250.0}],
            "centroidPos": [{"id": "7", "x": 200.0, "y": 50.0, "millerIdx": [1, 0, 0]}],
            "title": "panel0",
        }),
    );

    let plot = &mut session.views_mut().experiment;
    plot.pointer_down(Some(100.0));
    plot.pointer_move(Some(500.0));
    assert_eq!(plot.pointer_up(), ZoomOutcome::Zoomed);
    let window = plot.window();
    assert_eq!((window.x.min, window.x.max), (100.0, 500.0));
    assert_eq!(window.y.max, 60.0);

    assert_eq!(session.click_plot(200.0), Some(ReflectionId::from("7")));

    push(
        &mut session,
        &json!({
            "channel": "gui",
            "command": "update_lineplot",
            "x": [0.0, 1000.0],
            "y": [1.0, 2.0],
            "centroidPos": [{"id": "3", "x": 10.0, "y": 1.0, "millerIdx": [0, 0, 0]}],
            "title": "panel1",
        }),
    );

    let plot = &session.views().experiment;
    assert!(plot.window().full_extent);
    assert_eq!(session.reflections().selected(), Some(&ReflectionId::from("7")));
    assert!(plot.highlighted_point(session.reflections()).is_none());
    assert!(plot.highlighted_region(session.reflections()).is_none());
    assert!(plot.points()[0].label().is_none());
}

#[test]
fn test_new_lineplot_highlights_kept_selection() {
    let mut session = imported();
    let frame = |title: &str, x1: f64| {
        json!({
            "channel": "gui",
            "command": "update_lineplot",
            "x": [0.0, 500.0, 1000.0],
            "y": [1.0, 30.0, 2.0],
            "bboxPos": [{"id": "7", "x1": x1, "x2": x1 + 100.0}],
            "centroidPos": [{"id": "7", "x": x1 + 50.0, "y": 30.0, "millerIdx": [1, 1, 0]}],
            "title": title,
        })
    };
    push(&mut session, &frame("panel0", 100.0));
    session.select_reflection(ReflectionId::from("7"));

    let plot = &mut session.views_mut().experiment;
    plot.pointer_down(Some(0.0));
    plot.pointer_move(Some(500.0));
    assert_eq!(plot.pointer_up(), ZoomOutcome::Zoomed);

    push(&mut session, &frame("panel1", 450.0));

    let plot = &session.views().experiment;
    assert!(plot.window().full_extent);
    let region = plot.highlighted_region(session.reflections()).unwrap();
    assert_eq!(region.id, ReflectionId::from("7"));
    assert_eq!((region.x1, region.x2), (450.0, 550.0));
    let point = plot.highlighted_point(session.reflections()).unwrap();
    assert_eq!(point.id, ReflectionId::from("7"));
    assert_eq!(point.x, 500.0);
}

#[test]
fn test_lineplot_can_drive_table_selection() {
    let mut session = imported();
    push(
        &mut session,
        &json!({
            "channel": "gui",
            "command": "update_lineplot",
            "x": [0.0, 1.0],
            "y": [0.0, 1.0],
            "centroidPos": [{"id": 4, "x": 1.0, "y": 1.0, "millerIdx": [1, 1, 0]}],
            "updateTableSelection": true,
        }),
    );
    assert_eq!(session.reflections().selected(), Some(&ReflectionId::from("4")));
}

#[test]
fn test_view_tabs_unlock_with_results() {
    let mut session = imported();
    assert!(session.is_view_enabled(ViewKind::IntegrationProfiler));
    assert!(!session.is_view_enabled(ViewKind::ReciprocalLattice));
    assert!(!session.reflection_table_enabled());

    push(&mut session, &stage_result("find_spots", &json!({})));
    session.select_view(ViewKind::ReciprocalLattice).unwrap();
    assert!(session.reflection_table_enabled());
    assert!(matches!(
        session.select_view(ViewKind::ExperimentPlanner),
        Err(Error::ViewDisabled(ViewKind::ExperimentPlanner))
    ));

    push(&mut session, &stage_result("index", &json!({})));
    session.select_view(ViewKind::ExperimentPlanner).unwrap();
    assert_eq!(session.views().active(), ViewKind::ExperimentPlanner);
}

#[test]
fn test_planner_round_trip_with_backend() {
    let mut session = imported();
    push(
        &mut session,
        &json!({
            "channel": "gui",
            "command": "update_experiment_planner",
            "orientation": 15.0,
            "reflections": 300,
        }),
    );
    session.store_planner_orientation().unwrap();
    session.request_next_planner_orientation().unwrap();

    let sent = session.transport().sent();
    let last = sent.last().unwrap();
    assert_eq!(last.command, "get_next_best_planner_orientation");
    assert_eq!(last.payload["orientations"], json!([15.0, 15.0]));
}
