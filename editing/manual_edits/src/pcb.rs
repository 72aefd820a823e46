use circuit_output::CircuitOutput;
use tracing::debug;

use crate::document::{ManualEditState, ManualTraceHint, PcbPlacement, RelativeTo};
use crate::event::{PcbComponentLocationEvent, PcbTraceHintEvent};

pub(crate) fn apply_component_location(
    state: &mut ManualEditState,
    event: &PcbComponentLocationEvent,
    circuit_output: &CircuitOutput,
) {
    let Some(selector) = circuit_output.pcb_component_selector(&event.pcb_component_id) else {
        debug!(
            "Dropping pcb location edit, component not found. pcb_component_id: {}, edit_event_id: {:?}",
            event.pcb_component_id, event.edit_event_id
        );
        return;
    };

    state.upsert_pcb_placement(PcbPlacement {
        selector,
        center: event.new_center,
        relative_to: RelativeTo::GroupCenter,
        edit_event_id: event.edit_event_id.clone(),
    });
}

pub(crate) fn apply_trace_hint(state: &mut ManualEditState, event: &PcbTraceHintEvent, circuit_output: &CircuitOutput) {
    let Some(hint) = manual_trace_hint_from_event(event, circuit_output) else {
        debug!(
            "Dropping trace hint edit, port not found. pcb_port_id: {}, edit_event_id: {:?}",
            event.pcb_port_id, event.edit_event_id
        );
        return;
    };

    state.upsert_manual_trace_hint(hint);
}

/// Derive a trace hint for the port the event refers to, the route points become the hint offsets.
pub fn manual_trace_hint_from_event(
    event: &PcbTraceHintEvent,
    circuit_output: &CircuitOutput,
) -> Option<ManualTraceHint> {
    let pcb_port_selector = circuit_output.pcb_port_selector(&event.pcb_port_id)?;

    Some(ManualTraceHint {
        pcb_port_selector,
        offsets: event.route.clone(),
        edit_event_id: event.edit_event_id.clone(),
    })
}
