use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

pub const EDIT_PCB_COMPONENT_LOCATION: &str = "edit_pcb_component_location";
pub const EDIT_SCHEMATIC_COMPONENT_LOCATION: &str = "edit_schematic_component_location";
pub const EDIT_PCB_TRACE_HINT: &str = "edit_pcb_trace_hint";

const EDIT_EVENT_TYPE_FIELD: &str = "edit_event_type";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
        }
    }
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RoutePoint {
    pub x: f64,
    pub y: f64,
    pub via: Option<bool>,
    pub to_layer: Option<String>,
    pub trace_width: Option<f64>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PcbComponentLocationEvent {
    pub edit_event_id: Option<String>,
    #[serde(default)]
    pub in_progress: bool,
    pub created_at: Option<f64>,
    pub pcb_component_id: String,
    pub original_center: Option<Point>,
    pub new_center: Point,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SchematicComponentLocationEvent {
    pub edit_event_id: Option<String>,
    #[serde(default)]
    pub in_progress: bool,
    pub created_at: Option<f64>,
    pub schematic_component_id: String,
    pub original_center: Option<Point>,
    pub new_center: Point,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PcbTraceHintEvent {
    pub edit_event_id: Option<String>,
    #[serde(default)]
    pub in_progress: bool,
    pub created_at: Option<f64>,
    pub pcb_port_id: String,
    pub pcb_trace_hint_id: Option<String>,
    #[serde(default)]
    pub route: Vec<RoutePoint>,
}

/// An edit event of a kind that is not folded into placements or hints.
///
/// All fields are retained so the event can be passed through to the persisted document unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OtherEditEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_event_id: Option<String>,
    pub edit_event_type: String,
    #[serde(default)]
    pub in_progress: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A user-originated mutation intent emitted by a view.
///
/// On the wire an edit event is a JSON object discriminated by `edit_event_type`.
#[derive(Debug, Clone, PartialEq)]
pub enum EditEvent {
    PcbComponentLocation(PcbComponentLocationEvent),
    SchematicComponentLocation(SchematicComponentLocationEvent),
    PcbTraceHint(PcbTraceHintEvent),
    Other(OtherEditEvent),
}

impl EditEvent {
    pub fn edit_event_id(&self) -> Option<&str> {
        match self {
            EditEvent::PcbComponentLocation(event) => event.edit_event_id.as_deref(),
            EditEvent::SchematicComponentLocation(event) => event.edit_event_id.as_deref(),
            EditEvent::PcbTraceHint(event) => event.edit_event_id.as_deref(),
            EditEvent::Other(event) => event.edit_event_id.as_deref(),
        }
    }

    pub fn in_progress(&self) -> bool {
        match self {
            EditEvent::PcbComponentLocation(event) => event.in_progress,
            EditEvent::SchematicComponentLocation(event) => event.in_progress,
            EditEvent::PcbTraceHint(event) => event.in_progress,
            EditEvent::Other(event) => event.in_progress,
        }
    }

    pub fn edit_event_type(&self) -> &str {
        match self {
            EditEvent::PcbComponentLocation(_) => EDIT_PCB_COMPONENT_LOCATION,
            EditEvent::SchematicComponentLocation(_) => EDIT_SCHEMATIC_COMPONENT_LOCATION,
            EditEvent::PcbTraceHint(_) => EDIT_PCB_TRACE_HINT,
            EditEvent::Other(event) => &event.edit_event_type,
        }
    }

    /// A preview is an in-progress event without an id, it only drives live feedback in a view and is never
    /// recorded.
    pub fn is_preview(&self) -> bool {
        self.in_progress() && self.edit_event_id().is_none()
    }

    pub fn is_pcb_event(&self) -> bool {
        matches!(self, EditEvent::PcbComponentLocation(_) | EditEvent::PcbTraceHint(_))
    }

    pub fn is_schematic_event(&self) -> bool {
        matches!(self, EditEvent::SchematicComponentLocation(_))
    }
}

impl Serialize for EditEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = match self {
            EditEvent::Other(event) => return event.serialize(serializer),
            EditEvent::PcbComponentLocation(event) => serde_json::to_value(event),
            EditEvent::SchematicComponentLocation(event) => serde_json::to_value(event),
            EditEvent::PcbTraceHint(event) => serde_json::to_value(event),
        }
        .map_err(S::Error::custom)?;

        // the tag goes first, so persisted documents read naturally
        let mut tagged = Map::new();
        tagged.insert(
            EDIT_EVENT_TYPE_FIELD.to_string(),
            Value::String(self.edit_event_type().to_string()),
        );
        if let Value::Object(fields) = fields {
            tagged.extend(fields);
        }

        Value::Object(tagged).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EditEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;

        let edit_event_type = value
            .get(EDIT_EVENT_TYPE_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::missing_field(EDIT_EVENT_TYPE_FIELD))?
            .to_string();

        let event = match edit_event_type.as_str() {
            EDIT_PCB_COMPONENT_LOCATION => serde_json::from_value(value).map(EditEvent::PcbComponentLocation),
            EDIT_SCHEMATIC_COMPONENT_LOCATION => {
                serde_json::from_value(value).map(EditEvent::SchematicComponentLocation)
            }
            EDIT_PCB_TRACE_HINT => serde_json::from_value(value).map(EditEvent::PcbTraceHint),
            _ => serde_json::from_value(value).map(EditEvent::Other),
        };

        event.map_err(D::Error::custom)
    }
}
