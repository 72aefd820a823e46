//! Manual edits are user placements and routing hints that override the default layout on every render.
//!
//! Views emit [`EditEvent`]s, the reducers here fold them onto the persisted [`ManualEditState`] document.
//! The reducers are pure, the caller is responsible for reading and writing the document.
use circuit_output::CircuitOutput;
use thiserror::Error;
use tracing::{trace, warn};

pub use crate::document::{ManualEditState, ManualTraceHint, PcbPlacement, RelativeTo, SchematicPlacement};
pub use crate::event::{
    EditEvent, OtherEditEvent, PcbComponentLocationEvent, PcbTraceHintEvent, Point, RoutePoint,
    SchematicComponentLocationEvent, EDIT_PCB_COMPONENT_LOCATION, EDIT_PCB_TRACE_HINT,
    EDIT_SCHEMATIC_COMPONENT_LOCATION,
};
pub use crate::ledger::HandledEditEvents;
pub use crate::pcb::manual_trace_hint_from_event;

pub mod document;
pub mod event;
pub mod file;
pub mod ledger;
mod pcb;
mod schematic;

#[cfg(test)]
mod tests;

pub const DEFAULT_MANUAL_EDITS_FILE_PATH: &str = "manual-edits.json";

#[derive(Error, Debug)]
pub enum ManualEditsError {
    #[error("Malformed persisted manual edits, cause: {0}")]
    MalformedPersistedState(serde_json::Error),
    #[error("Unable to serialize manual edits, cause: {0}")]
    Serialization(serde_json::Error),
    #[error("IO error. cause: {0}")]
    IoError(std::io::Error),
}

/// Fold `edit_events` onto the document given by `existing_document_text`.
///
/// * `None`, or blank text, is the empty document.
/// * Unparsable text fails with [`ManualEditsError::MalformedPersistedState`], see
///   [`apply_edit_events_with_recovery`] for the recovering variant.
pub fn apply_edit_events(
    edit_events: &[EditEvent],
    circuit_output: &CircuitOutput,
    existing_document_text: Option<&str>,
) -> Result<ManualEditState, ManualEditsError> {
    let state = ManualEditState::from_optional_json_str(existing_document_text)?;

    Ok(fold_edit_events(state, edit_events, circuit_output, |_| true))
}

#[derive(Debug)]
pub struct RecoveredManualEdits {
    pub state: ManualEditState,
    /// Present when the existing document could not be parsed and was replaced by the empty document.
    pub warning: Option<ManualEditsError>,
}

/// As [`apply_edit_events`], but a malformed document is replaced by the empty document.
///
/// The parse error is returned as a warning so that a corrupt document can be told apart from a missing one.
pub fn apply_edit_events_with_recovery(
    edit_events: &[EditEvent],
    circuit_output: &CircuitOutput,
    existing_document_text: Option<&str>,
) -> RecoveredManualEdits {
    let (state, warning) = match ManualEditState::from_optional_json_str(existing_document_text) {
        Ok(state) => (state, None),
        Err(error) => {
            warn!("Existing manual edits are malformed, replacing with an empty document. cause: {}", error);
            (ManualEditState::default(), Some(error))
        }
    };

    RecoveredManualEdits {
        state: fold_edit_events(state, edit_events, circuit_output, |_| true),
        warning,
    }
}

/// Fold only the pcb events (component locations and trace hints), other events are ignored.
pub fn apply_pcb_edit_events(
    state: ManualEditState,
    edit_events: &[EditEvent],
    circuit_output: &CircuitOutput,
) -> ManualEditState {
    fold_edit_events(state, edit_events, circuit_output, EditEvent::is_pcb_event)
}

/// Fold only the schematic events, other events are ignored.
pub fn apply_schematic_edit_events(
    state: ManualEditState,
    edit_events: &[EditEvent],
    circuit_output: &CircuitOutput,
) -> ManualEditState {
    fold_edit_events(state, edit_events, circuit_output, EditEvent::is_schematic_event)
}

fn fold_edit_events(
    mut state: ManualEditState,
    edit_events: &[EditEvent],
    circuit_output: &CircuitOutput,
    include: impl Fn(&EditEvent) -> bool,
) -> ManualEditState {
    let mut handled = HandledEditEvents::seed_from(&state);

    for edit_event in edit_events
        .iter()
        .filter(|edit_event| include(edit_event))
    {
        if edit_event.is_preview() {
            trace!("Skipping preview edit event. type: {}", edit_event.edit_event_type());
            continue;
        }

        if let Some(edit_event_id) = edit_event.edit_event_id() {
            if handled.contains(edit_event_id) {
                trace!("Skipping handled edit event. edit_event_id: {}", edit_event_id);
                continue;
            }
        }

        match edit_event {
            EditEvent::PcbComponentLocation(event) => pcb::apply_component_location(&mut state, event, circuit_output),
            EditEvent::SchematicComponentLocation(event) => {
                schematic::apply_component_location(&mut state, event, circuit_output)
            }
            EditEvent::PcbTraceHint(event) => pcb::apply_trace_hint(&mut state, event, circuit_output),
            EditEvent::Other(_) => state
                .edit_events
                .push(edit_event.clone()),
        }

        // immediately, so a duplicate later in the same batch is skipped too
        if let Some(edit_event_id) = edit_event.edit_event_id() {
            handled.mark(edit_event_id);
        }
    }

    state
}
