use circuit_output::CircuitOutput;
use indoc::indoc;
use rstest::rstest;
use serde_json::json;

use crate::{
    apply_edit_events, apply_edit_events_with_recovery, apply_pcb_edit_events, apply_schematic_edit_events,
    EditEvent, ManualEditState, ManualEditsError, PcbPlacement, Point, RelativeTo,
};

fn build_circuit_output() -> CircuitOutput {
    CircuitOutput::from_json_str(indoc! {r#"
        [
            { "type": "source_component", "source_component_id": "source_component_0", "name": "R1" },
            { "type": "source_component", "source_component_id": "source_component_1", "name": "C1" },
            { "type": "source_port", "source_port_id": "source_port_0", "source_component_id": "source_component_0", "name": "pin1" },
            { "type": "pcb_component", "pcb_component_id": "pcb_component_0", "source_component_id": "source_component_0" },
            { "type": "pcb_component", "pcb_component_id": "pcb_component_1", "source_component_id": "source_component_1" },
            { "type": "schematic_component", "schematic_component_id": "schematic_component_0", "source_component_id": "source_component_0" },
            { "type": "pcb_port", "pcb_port_id": "pcb_port_0", "source_port_id": "source_port_0" }
        ]
    "#})
    .unwrap()
}

fn pcb_location(edit_event_id: Option<&str>, pcb_component_id: &str, x: f64, y: f64, in_progress: bool) -> EditEvent {
    serde_json::from_value(json!({
        "edit_event_id": edit_event_id,
        "edit_event_type": "edit_pcb_component_location",
        "in_progress": in_progress,
        "pcb_component_id": pcb_component_id,
        "original_center": { "x": 0, "y": 0 },
        "new_center": { "x": x, "y": y },
    }))
    .unwrap()
}

fn schematic_location(edit_event_id: &str, schematic_component_id: &str, x: f64, y: f64) -> EditEvent {
    serde_json::from_value(json!({
        "edit_event_id": edit_event_id,
        "edit_event_type": "edit_schematic_component_location",
        "in_progress": false,
        "schematic_component_id": schematic_component_id,
        "new_center": { "x": x, "y": y },
    }))
    .unwrap()
}

fn trace_hint(edit_event_id: &str, pcb_port_id: &str, x: f64) -> EditEvent {
    serde_json::from_value(json!({
        "edit_event_id": edit_event_id,
        "edit_event_type": "edit_pcb_trace_hint",
        "in_progress": false,
        "pcb_port_id": pcb_port_id,
        "pcb_trace_hint_id": "pcb_trace_hint_0",
        "route": [{ "x": x, "y": 1.0, "via": false }],
    }))
    .unwrap()
}

#[test]
fn applying_the_same_event_twice_is_idempotent() {
    // given
    let circuit_output = build_circuit_output();
    let event = pcb_location(Some("ee_1"), "pcb_component_0", 5.0, 6.0, false);

    // when
    let once = apply_edit_events(&[event.clone()], &circuit_output, None).unwrap();
    let twice_in_one_batch = apply_edit_events(&[event.clone(), event.clone()], &circuit_output, None).unwrap();
    let once_content = once.to_json_string().unwrap();
    let replayed = apply_edit_events(&[event], &circuit_output, Some(&once_content)).unwrap();

    // then
    assert_eq!(twice_in_one_batch, once);
    assert_eq!(replayed, once);
}

#[test]
fn at_most_one_placement_per_selector() {
    // given
    let circuit_output = build_circuit_output();
    let events = vec![
        pcb_location(Some("ee_1"), "pcb_component_0", 1.0, 1.0, false),
        pcb_location(Some("ee_2"), "pcb_component_1", 9.0, 9.0, false),
        pcb_location(Some("ee_3"), "pcb_component_0", 2.0, 2.0, false),
        pcb_location(Some("ee_4"), "pcb_component_0", 3.0, 4.0, false),
    ];

    // when
    let state = apply_edit_events(&events, &circuit_output, None).unwrap();

    // then
    let r1_placements = state
        .pcb_placements
        .iter()
        .filter(|placement| placement.selector == "R1")
        .collect::<Vec<_>>();
    assert_eq!(r1_placements, vec![&PcbPlacement {
        selector: "R1".to_string(),
        center: Point::new(3.0, 4.0),
        relative_to: RelativeTo::GroupCenter,
        edit_event_id: Some("ee_4".to_string()),
    }]);
    assert_eq!(state.pcb_placements.len(), 2);
}

#[test]
fn trace_hint_for_the_same_port_is_replaced() {
    // given
    let circuit_output = build_circuit_output();
    let events = vec![
        trace_hint("ee_1", "pcb_port_0", 1.0),
        trace_hint("ee_2", "pcb_port_0", 2.0),
    ];

    // when
    let state = apply_edit_events(&events, &circuit_output, None).unwrap();

    // then
    assert_eq!(state.manual_trace_hints.len(), 1);
    let hint = &state.manual_trace_hints[0];
    assert_eq!(hint.pcb_port_selector, ".R1 > .pin1");
    assert_eq!(hint.edit_event_id.as_deref(), Some("ee_2"));
    assert_eq!(hint.offsets[0].x, 2.0);
}

#[test]
fn preview_events_are_never_recorded() {
    // given
    let circuit_output = build_circuit_output();
    let preview_pass_through: EditEvent = serde_json::from_value(json!({
        "edit_event_type": "edit_pcb_group_location",
        "in_progress": true,
    }))
    .unwrap();
    let events = vec![
        pcb_location(None, "pcb_component_0", 1.0, 1.0, true),
        preview_pass_through,
    ];

    // when
    let state = apply_edit_events(&events, &circuit_output, None).unwrap();

    // then
    assert!(state.is_empty());
}

#[test]
fn in_progress_event_with_an_id_is_recorded() {
    // given
    let circuit_output = build_circuit_output();
    let events = vec![pcb_location(Some("ee_1"), "pcb_component_0", 1.0, 1.0, true)];

    // when
    let state = apply_edit_events(&events, &circuit_output, None).unwrap();

    // then
    assert!(state.pcb_placement("R1").is_some());
}

#[test]
fn unresolvable_component_is_dropped() {
    // given
    let circuit_output = build_circuit_output();
    let existing = apply_edit_events(
        &[pcb_location(Some("ee_1"), "pcb_component_0", 1.0, 1.0, false)],
        &circuit_output,
        None,
    )
    .unwrap();
    let content = existing.to_json_string().unwrap();

    // when
    let state = apply_edit_events(
        &[
            pcb_location(Some("ee_2"), "pcb_component_missing", 7.0, 7.0, false),
            trace_hint("ee_3", "pcb_port_missing", 1.0),
        ],
        &circuit_output,
        Some(&content),
    )
    .unwrap();

    // then
    assert_eq!(state.pcb_placements, existing.pcb_placements);
    assert!(state.manual_trace_hints.is_empty());
}

#[test]
fn other_events_are_passed_through() {
    // given
    let circuit_output = build_circuit_output();
    let other: EditEvent = serde_json::from_value(json!({
        "edit_event_id": "ee_9",
        "edit_event_type": "edit_pcb_group_location",
        "in_progress": false,
        "pcb_group_id": "pcb_group_0",
        "new_center": { "x": 1, "y": 1 },
    }))
    .unwrap();

    // when
    let state = apply_edit_events(&[other.clone()], &circuit_output, None).unwrap();
    let content = state.to_json_string().unwrap();
    let replayed = apply_edit_events(&[other.clone()], &circuit_output, Some(&content)).unwrap();

    // then
    assert_eq!(state.edit_events, vec![other]);
    assert_eq!(replayed, state);
}

#[test]
fn schematic_events_produce_schematic_placements() {
    // given
    let circuit_output = build_circuit_output();

    // when
    let state = apply_edit_events(
        &[schematic_location("ee_1", "schematic_component_0", 2.5, -1.0)],
        &circuit_output,
        None,
    )
    .unwrap();

    // then
    assert!(state.pcb_placements.is_empty());
    assert_eq!(
        state
            .schematic_placement("R1")
            .map(|placement| placement.position),
        Some(Point::new(2.5, -1.0))
    );
}

#[test]
fn view_family_reducers_ignore_other_families() {
    // given
    let circuit_output = build_circuit_output();
    let events = vec![
        pcb_location(Some("ee_1"), "pcb_component_0", 1.0, 1.0, false),
        schematic_location("ee_2", "schematic_component_0", 2.0, 2.0),
        trace_hint("ee_3", "pcb_port_0", 1.0),
    ];

    // when
    let pcb_state = apply_pcb_edit_events(ManualEditState::default(), &events, &circuit_output);
    let schematic_state = apply_schematic_edit_events(ManualEditState::default(), &events, &circuit_output);

    // then
    assert_eq!(pcb_state.pcb_placements.len(), 1);
    assert_eq!(pcb_state.manual_trace_hints.len(), 1);
    assert!(pcb_state.schematic_placements.is_empty());

    assert!(schematic_state.pcb_placements.is_empty());
    assert!(schematic_state.manual_trace_hints.is_empty());
    assert_eq!(schematic_state.schematic_placements.len(), 1);
}

#[rstest]
#[case("{not json")]
#[case("null")]
#[case(r#"{ "pcb_placements": "not an array" }"#)]
fn malformed_document(#[case] content: &str) {
    // given
    let circuit_output = build_circuit_output();
    let events = vec![pcb_location(Some("ee_1"), "pcb_component_0", 1.0, 1.0, false)];

    // when
    let strict = apply_edit_events(&events, &circuit_output, Some(content));
    let recovered = apply_edit_events_with_recovery(&events, &circuit_output, Some(content));
    let from_nothing = apply_edit_events_with_recovery(&events, &circuit_output, None);

    // then
    assert!(matches!(strict, Err(ManualEditsError::MalformedPersistedState(_))));

    // the recovered result is the same as for a missing document, but the corruption is reported
    assert_eq!(recovered.state, from_nothing.state);
    assert!(matches!(
        recovered.warning,
        Some(ManualEditsError::MalformedPersistedState(_))
    ));
    assert!(from_nothing.warning.is_none());
}
