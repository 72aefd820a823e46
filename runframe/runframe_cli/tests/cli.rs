#[macro_use]
extern crate util;

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use indoc::indoc;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;
use util::test::{build_trace_log_path, contains_message, prepare_args, print, read_to_string, write_temp_file};

const CIRCUIT_JSON: &str = indoc! {r#"
    [
        { "type": "source_component", "source_component_id": "source_component_0", "name": "R1" },
        { "type": "source_component", "source_component_id": "source_component_1", "name": "C1" },
        { "type": "pcb_component", "pcb_component_id": "pcb_component_0", "source_component_id": "source_component_0" },
        { "type": "pcb_component", "pcb_component_id": "pcb_component_1", "source_component_id": "source_component_1" },
        { "type": "pcb_trace_error", "pcb_trace_error_id": "pcb_trace_error_0", "message": "trace too close to pad" }
    ]
"#};

const EDIT_EVENTS_JSON: &str = indoc! {r#"
    [
        {
            "edit_event_id": "ee_1",
            "edit_event_type": "edit_pcb_component_location",
            "in_progress": false,
            "pcb_component_id": "pcb_component_0",
            "original_center": { "x": 0, "y": 0 },
            "new_center": { "x": 5, "y": 2.5 }
        },
        {
            "edit_event_id": "ee_2",
            "edit_event_type": "edit_pcb_component_location",
            "in_progress": false,
            "pcb_component_id": "pcb_component_1",
            "original_center": { "x": 0, "y": 0 },
            "new_center": { "x": -3, "y": 1 }
        }
    ]
"#};

fn placements(path: &Path) -> Vec<(String, f64)> {
    let document: Value = serde_json::from_str(&read_to_string(path).unwrap()).unwrap();
    document["pcb_placements"]
        .as_array()
        .unwrap()
        .iter()
        .map(|placement| {
            (
                placement["selector"]
                    .as_str()
                    .unwrap()
                    .to_string(),
                placement["center"]["x"].as_f64().unwrap(),
            )
        })
        .collect()
}

#[test]
fn payload_lists_circuit_errors() -> Result<(), anyhow::Error> {
    // given
    let temp_dir = tempdir()?;
    let circuit_path = write_temp_file(&temp_dir, "circuit", "json", CIRCUIT_JSON)?;
    let (_trace_log_path, trace_log_arg) = build_trace_log_path(&temp_dir, "trace");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_runframe_cli"));
    let circuit_arg = format!("--circuit {}", circuit_path.to_str().unwrap());
    let args = prepare_args(vec![trace_log_arg.as_str(), "payload", circuit_arg.as_str()]);

    // when
    cmd.args(args)
        // then
        .assert()
        .success()
        .stderr(print("stderr"))
        .stdout(print("stdout"))
        .stdout(contains_message(r#""hasExecutionError": false"#))
        .stdout(contains_message("trace too close to pad"));

    Ok(())
}

#[test]
fn payload_with_execution_error() -> Result<(), anyhow::Error> {
    // given
    let temp_dir = tempdir()?;
    let (_trace_log_path, trace_log_arg) = build_trace_log_path(&temp_dir, "trace");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_runframe_cli"));

    // when
    cmd.args([
        trace_log_arg.as_str(),
        "payload",
        "--execution-error",
        "TypeError=x is undefined",
    ])
    // then
    .assert()
    .success()
    .stderr(print("stderr"))
    .stdout(print("stdout"))
    .stdout(contains_message(r#""hasExecutionError": true"#))
    .stdout(contains_message(r#""message": "x is undefined""#));

    Ok(())
}

#[test]
fn apply_edits_to_a_local_file_is_idempotent() -> Result<(), anyhow::Error> {
    // given
    let temp_dir = tempdir()?;
    let circuit_path = write_temp_file(&temp_dir, "circuit", "json", CIRCUIT_JSON)?;
    let events_path = write_temp_file(&temp_dir, "events", "json", EDIT_EVENTS_JSON)?;
    let manual_edits_path = temp_dir.path().join("manual-edits.json");
    let (trace_log_path, trace_log_arg) = build_trace_log_path(&temp_dir, "trace");

    let circuit_arg = format!("--circuit {}", circuit_path.to_str().unwrap());
    let events_arg = format!("--events {}", events_path.to_str().unwrap());
    let manual_edits_arg = format!("--manual-edits {}", manual_edits_path.to_str().unwrap());
    let args = prepare_args(vec![
        trace_log_arg.as_str(),
        "-vv",
        "apply-edits",
        events_arg.as_str(),
        circuit_arg.as_str(),
        manual_edits_arg.as_str(),
    ]);

    // when
    Command::new(env!("CARGO_BIN_EXE_runframe_cli"))
        .args(&args)
        // then
        .assert()
        .success()
        .stderr(print("stderr"))
        .stdout(print("stdout"));

    // and
    let trace_content = read_to_string(&trace_log_path)?;
    println!("{}", trace_content);
    assert_contains_inorder!(trace_content, [
        "Loaded edit events. count: 2",
        "Loaded circuit output. elements: 5",
        "Saving manual edits.",
        "Applied edit events. pcb_placements: 2",
    ]);

    let first_content = read_to_string(&manual_edits_path)?;
    assert_eq!(placements(&manual_edits_path), vec![
        ("R1".to_string(), 5.0),
        ("C1".to_string(), -3.0)
    ]);
    assert!(first_content.contains(r#""_edit_event_id": "ee_1""#));

    // when applied again
    Command::new(env!("CARGO_BIN_EXE_runframe_cli"))
        .args(&args)
        .assert()
        .success();

    // then
    assert_eq!(read_to_string(&manual_edits_path)?, first_content);

    Ok(())
}

#[test]
fn apply_edits_replaces_a_malformed_file() -> Result<(), anyhow::Error> {
    // given
    let temp_dir = tempdir()?;
    let circuit_path = write_temp_file(&temp_dir, "circuit", "json", CIRCUIT_JSON)?;
    let events_path = write_temp_file(&temp_dir, "events", "json", EDIT_EVENTS_JSON)?;
    let manual_edits_path = write_temp_file(&temp_dir, "manual-edits", "json", "{ not json")?;
    let (trace_log_path, trace_log_arg) = build_trace_log_path(&temp_dir, "trace");

    // when
    Command::new(env!("CARGO_BIN_EXE_runframe_cli"))
        .args([
            trace_log_arg.as_str(),
            "apply-edits",
            "--events",
            events_path.to_str().unwrap(),
            "--circuit",
            circuit_path.to_str().unwrap(),
            "--manual-edits",
            manual_edits_path.to_str().unwrap(),
        ])
        // then
        .assert()
        .success()
        .stderr(print("stderr"))
        .stdout(print("stdout"));

    // and
    let trace_content = read_to_string(&trace_log_path)?;
    assert!(contains_message("Malformed manual edits have been replaced").eval(&trace_content));
    assert_eq!(placements(&manual_edits_path).len(), 2);

    Ok(())
}

#[test]
fn replay_persists_the_batch_and_renders_once_per_batch() -> Result<(), anyhow::Error> {
    // given
    let temp_dir = tempdir()?;
    let project_dir = temp_dir.path().join("project");
    fs::create_dir_all(project_dir.join("assets"))?;
    fs::write(project_dir.join("index.tsx"), "export default () => <board width=\"10mm\" />")?;
    fs::write(project_dir.join("assets/logo.png"), [0x89, 0x50, 0x4e, 0x47])?;

    let circuit_path = write_temp_file(&temp_dir, "circuit", "json", CIRCUIT_JSON)?;
    let events_path = write_temp_file(&temp_dir, "events", "json", EDIT_EVENTS_JSON)?;
    let (trace_log_path, trace_log_arg) = build_trace_log_path(&temp_dir, "trace");

    let project_arg = format!("--project {}", project_dir.to_str().unwrap());
    let circuit_arg = format!("--circuit {}", circuit_path.to_str().unwrap());
    let events_arg = format!("--events {}", events_path.to_str().unwrap());
    let args = prepare_args(vec![
        trace_log_arg.as_str(),
        "-vv",
        "replay",
        project_arg.as_str(),
        events_arg.as_str(),
        circuit_arg.as_str(),
        "--debounce 20",
    ]);

    // when
    let output = Command::new(env!("CARGO_BIN_EXE_runframe_cli"))
        .args(args)
        // then
        .assert()
        .success()
        .stderr(print("stderr"))
        .stdout(print("stdout"))
        .get_output()
        .stdout
        .clone();

    // and
    let summary: Value = serde_json::from_slice(&output)?;
    assert_eq!(summary["renders"], 2);
    assert_eq!(summary["render_trigger_count"], 2);
    assert_eq!(summary["last_payload"]["hasExecutionError"], false);

    let trace_content = read_to_string(&trace_log_path)?;
    println!("{}", trace_content);
    assert_contains_inorder!(trace_content, [
        "Rendering. trigger: 1",
        "Executing. execution: 1, entrypoint: index.tsx, files: 2, pcb_placements: 0",
        "Writing manual edits.",
        "Rendering. trigger: 2",
        "Executing. execution: 2, entrypoint: index.tsx, files: 3, pcb_placements: 2",
        "Replay finished. renders: 2",
    ]);

    assert_eq!(placements(&project_dir.join("manual-edits.json")), vec![
        ("R1".to_string(), 5.0),
        ("C1".to_string(), -3.0)
    ]);

    Ok(())
}

#[test]
fn replay_without_auto_render_only_persists() -> Result<(), anyhow::Error> {
    // given
    let temp_dir = tempdir()?;
    let project_dir = temp_dir.path().join("project");
    fs::create_dir_all(&project_dir)?;
    fs::write(project_dir.join("index.tsx"), "export default () => <board />")?;

    let circuit_path = write_temp_file(&temp_dir, "circuit", "json", CIRCUIT_JSON)?;
    let events_path = write_temp_file(&temp_dir, "events", "json", EDIT_EVENTS_JSON)?;
    let (_trace_log_path, trace_log_arg) = build_trace_log_path(&temp_dir, "trace");

    // when
    Command::new(env!("CARGO_BIN_EXE_runframe_cli"))
        .args([
            trace_log_arg.as_str(),
            "replay",
            "--project",
            project_dir.to_str().unwrap(),
            "--events",
            events_path.to_str().unwrap(),
            "--circuit",
            circuit_path.to_str().unwrap(),
            "--debounce",
            "20",
            "--no-auto-render",
        ])
        // then
        .assert()
        .success()
        .stderr(print("stderr"))
        .stdout(print("stdout"))
        .stdout(contains_message(r#""renders": 1"#));

    // and
    assert_eq!(placements(&project_dir.join("manual-edits.json")).len(), 2);

    Ok(())
}

#[test]
fn replay_of_an_empty_project_fails() -> Result<(), anyhow::Error> {
    // given
    let temp_dir = tempdir()?;
    let project_dir = temp_dir.path().join("empty");
    fs::create_dir_all(&project_dir)?;
    let circuit_path = write_temp_file(&temp_dir, "circuit", "json", CIRCUIT_JSON)?;
    let events_path = write_temp_file(&temp_dir, "events", "json", "[]")?;
    let (_trace_log_path, trace_log_arg) = build_trace_log_path(&temp_dir, "trace");

    // when
    Command::new(env!("CARGO_BIN_EXE_runframe_cli"))
        .args([
            trace_log_arg.as_str(),
            "replay",
            "--project",
            project_dir.to_str().unwrap(),
            "--events",
            events_path.to_str().unwrap(),
            "--circuit",
            circuit_path.to_str().unwrap(),
        ])
        // then
        .assert()
        .failure()
        .stderr(print("stderr"))
        .stderr(contains_message("No files in project"));

    Ok(())
}

#[test]
fn sync_fails_when_the_server_is_unreachable() -> Result<(), anyhow::Error> {
    // given
    let temp_dir = tempdir()?;
    let output_path = temp_dir.path().join("fs-map.json");
    let (_trace_log_path, trace_log_arg) = build_trace_log_path(&temp_dir, "trace");

    // when
    Command::new(env!("CARGO_BIN_EXE_runframe_cli"))
        .args([
            trace_log_arg.as_str(),
            "sync",
            "--server",
            "http://127.0.0.1:9",
            "--output",
            output_path.to_str().unwrap(),
        ])
        // then
        .assert()
        .failure()
        .stderr(print("stderr"))
        .stderr(contains_message("Request failed. url: http://127.0.0.1:9/files/list"));

    // and
    assert!(!output_path.exists());

    Ok(())
}
