use circuit_output::CircuitOutput;
use tracing::debug;

use crate::document::{ManualEditState, SchematicPlacement};
use crate::event::SchematicComponentLocationEvent;

pub(crate) fn apply_component_location(
    state: &mut ManualEditState,
    event: &SchematicComponentLocationEvent,
    circuit_output: &CircuitOutput,
) {
    let Some(selector) = circuit_output.schematic_component_selector(&event.schematic_component_id) else {
        debug!(
            "Dropping schematic location edit, component not found. schematic_component_id: {}, edit_event_id: {:?}",
            event.schematic_component_id, event.edit_event_id
        );
        return;
    };

    state.upsert_schematic_placement(SchematicPlacement {
        selector,
        position: event.new_center,
        edit_event_id: event.edit_event_id.clone(),
    });
}
