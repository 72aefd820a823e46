use circuit_output::CircuitOutput;
use indoc::indoc;
use manual_edits::EditEvent;
use serde_json::json;


pub fn build_circuit_output() -> CircuitOutput {
    CircuitOutput::from_json_str(indoc! {r#"
        [
            { "type": "source_component", "source_component_id": "source_component_0", "name": "R1" },
            { "type": "source_component", "source_component_id": "source_component_1", "name": "C1" },
            { "type": "pcb_component", "pcb_component_id": "pcb_component_0", "source_component_id": "source_component_0" },
            { "type": "pcb_component", "pcb_component_id": "pcb_component_1", "source_component_id": "source_component_1" }
        ]
    "#})
    .unwrap()
}

pub fn pcb_location(edit_event_id: Option<&str>, pcb_component_id: &str, x: f64, in_progress: bool) -> EditEvent {
    serde_json::from_value(json!({
        "edit_event_id": edit_event_id,
        "edit_event_type": "edit_pcb_component_location",
        "in_progress": in_progress,
        "pcb_component_id": pcb_component_id,
        "original_center": { "x": 0, "y": 0 },
        "new_center": { "x": x, "y": 0 },
    }))
    .unwrap()
}
