use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::event::{EditEvent, Point, RoutePoint};
use crate::ManualEditsError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelativeTo {
    #[default]
    #[serde(rename = "group_center")]
    GroupCenter,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PcbPlacement {
    pub selector: String,
    pub center: Point,
    #[serde(default)]
    pub relative_to: RelativeTo,
    #[serde(rename = "_edit_event_id")]
    pub edit_event_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SchematicPlacement {
    pub selector: String,
    /// Older documents used `center`.
    #[serde(alias = "center")]
    pub position: Point,
    #[serde(rename = "_edit_event_id")]
    pub edit_event_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ManualTraceHint {
    pub pcb_port_selector: String,
    #[serde(default)]
    pub offsets: Vec<RoutePoint>,
    #[serde(rename = "_edit_event_id")]
    pub edit_event_id: Option<String>,
}

/// The persisted manual edits document.
///
/// Placements are keyed by selector and trace hints by port selector, at most one entry per key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)] // absent collections are empty, not malformed
pub struct ManualEditState {
    pub pcb_placements: Vec<PcbPlacement>,
    pub schematic_placements: Vec<SchematicPlacement>,
    pub edit_events: Vec<EditEvent>,
    pub manual_trace_hints: Vec<ManualTraceHint>,
}

impl ManualEditState {
    pub fn from_json_str(content: &str) -> Result<Self, ManualEditsError> {
        serde_json::from_str(content).map_err(ManualEditsError::MalformedPersistedState)
    }

    /// `None` and blank content are both treated as the empty document.
    pub fn from_optional_json_str(content: Option<&str>) -> Result<Self, ManualEditsError> {
        match content {
            Some(content) if !content.trim().is_empty() => Self::from_json_str(content),
            _ => Ok(Self::default()),
        }
    }

    /// Pretty printed, 2-space indent, with a trailing newline.
    pub fn to_json_string(&self) -> Result<String, ManualEditsError> {
        let mut content = serde_json::to_string_pretty(self).map_err(ManualEditsError::Serialization)?;
        content.push('\n');
        Ok(content)
    }

    pub fn is_empty(&self) -> bool {
        self.pcb_placements.is_empty()
            && self.schematic_placements.is_empty()
            && self.edit_events.is_empty()
            && self.manual_trace_hints.is_empty()
    }

    pub fn pcb_placement(&self, selector: &str) -> Option<&PcbPlacement> {
        self.pcb_placements
            .iter()
            .find(|placement| placement.selector == selector)
    }

    pub fn schematic_placement(&self, selector: &str) -> Option<&SchematicPlacement> {
        self.schematic_placements
            .iter()
            .find(|placement| placement.selector == selector)
    }

    pub fn manual_trace_hint(&self, pcb_port_selector: &str) -> Option<&ManualTraceHint> {
        self.manual_trace_hints
            .iter()
            .find(|hint| hint.pcb_port_selector == pcb_port_selector)
    }

    /// Every `_edit_event_id` recorded in the document.
    pub fn recorded_edit_event_ids(&self) -> impl Iterator<Item = &str> {
        let pcb = self
            .pcb_placements
            .iter()
            .filter_map(|placement| placement.edit_event_id.as_deref());
        let schematic = self
            .schematic_placements
            .iter()
            .filter_map(|placement| placement.edit_event_id.as_deref());
        let hints = self
            .manual_trace_hints
            .iter()
            .filter_map(|hint| hint.edit_event_id.as_deref());
        let events = self
            .edit_events
            .iter()
            .filter_map(EditEvent::edit_event_id);

        pcb.chain(schematic)
            .chain(hints)
            .chain(events)
    }

    pub(crate) fn upsert_pcb_placement(&mut self, placement: PcbPlacement) {
        upsert_by_key(&mut self.pcb_placements, placement, |item| item.selector.as_str());
    }

    pub(crate) fn upsert_schematic_placement(&mut self, placement: SchematicPlacement) {
        upsert_by_key(&mut self.schematic_placements, placement, |item| item.selector.as_str());
    }

    pub(crate) fn upsert_manual_trace_hint(&mut self, hint: ManualTraceHint) {
        upsert_by_key(&mut self.manual_trace_hints, hint, |item| item.pcb_port_selector.as_str());
    }
}

/// Removes any item with the same key, then appends, so the most recent edit is last.
fn upsert_by_key<T>(items: &mut Vec<T>, item: T, key: impl Fn(&T) -> &str) {
    let new_key = key(&item).to_string();
    items.retain(|existing| key(existing) != new_key);
    items.push(item);
}
