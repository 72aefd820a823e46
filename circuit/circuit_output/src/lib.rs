//! The circuit output is the structured result of evaluating user circuit code.
//!
//! It is a flat JSON array of elements, each element carrying a `type` tag (e.g. `source_component`,
//! `pcb_component`, `pcb_port`) and element specific fields. Elements reference each other by id, e.g. a
//! `pcb_component` references its `source_component` via `source_component_id`.
//!
//! Only the lookups required for resolving edit events and classifying errors are modelled here, all other
//! elements are carried through unchanged.
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

pub type CircuitElement = Value;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct CircuitOutput(Vec<CircuitElement>);

#[derive(Error, Debug)]
pub enum CircuitOutputError {
    #[error("Malformed circuit output, cause: {0}")]
    Malformed(serde_json::Error),
}

impl CircuitOutput {
    pub fn new(elements: Vec<CircuitElement>) -> Self {
        Self(elements)
    }

    pub fn from_json_str(content: &str) -> Result<Self, CircuitOutputError> {
        serde_json::from_str(content).map_err(CircuitOutputError::Malformed)
    }

    pub fn elements(&self) -> &[CircuitElement] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Find the first element of the given type whose `id_field` equals `id`.
    fn find_element(&self, element_type: &str, id_field: &str, id: &str) -> Option<&CircuitElement> {
        self.0.iter().find(|element| {
            element_type_of(element) == Some(element_type) && str_field(element, id_field) == Some(id)
        })
    }

    pub fn source_component_name(&self, source_component_id: &str) -> Option<&str> {
        self.find_element("source_component", "source_component_id", source_component_id)
            .and_then(|element| str_field(element, "name"))
    }

    /// Resolve a `pcb_component_id` to the selector of the component, i.e. the source component name.
    pub fn pcb_component_selector(&self, pcb_component_id: &str) -> Option<String> {
        self.component_selector("pcb_component", "pcb_component_id", pcb_component_id)
    }

    /// Resolve a `schematic_component_id` to the selector of the component, i.e. the source component name.
    pub fn schematic_component_selector(&self, schematic_component_id: &str) -> Option<String> {
        self.component_selector("schematic_component", "schematic_component_id", schematic_component_id)
    }

    fn component_selector(&self, element_type: &str, id_field: &str, id: &str) -> Option<String> {
        let element = self.find_element(element_type, id_field, id)?;
        let source_component_id = str_field(element, "source_component_id")?;
        let name = self.source_component_name(source_component_id)?;

        trace!(
            "Resolved component selector. element_type: {}, id: {}, selector: {}",
            element_type, id, name
        );

        Some(name.to_string())
    }

    /// Resolve a `pcb_port_id` to a port selector, e.g. `.R1 > .pin1`.
    pub fn pcb_port_selector(&self, pcb_port_id: &str) -> Option<String> {
        let pcb_port = self.find_element("pcb_port", "pcb_port_id", pcb_port_id)?;
        let source_port_id = str_field(pcb_port, "source_port_id")?;
        let source_port = self.find_element("source_port", "source_port_id", source_port_id)?;
        let port_name = str_field(source_port, "name")?;
        let source_component_id = str_field(source_port, "source_component_id")?;
        let component_name = self.source_component_name(source_component_id)?;

        Some(format!(".{} > .{}", component_name, port_name))
    }

    /// All elements that represent an error, in output order.
    pub fn error_elements(&self) -> impl Iterator<Item = &CircuitElement> {
        self.0
            .iter()
            .filter(|element| is_error_element(element))
    }
}

impl From<Vec<CircuitElement>> for CircuitOutput {
    fn from(value: Vec<CircuitElement>) -> Self {
        Self(value)
    }
}

/// An element is an error when it has an `error_type`, or when its `type` contains `error`.
///
/// Both conventions are produced by the circuit evaluator, e.g. `{ "type": "pcb_trace_error", ... }` and
/// `{ "type": "source_failed_to_create_component", "error_type": "...", ... }`.
pub fn is_error_element(element: &CircuitElement) -> bool {
    if element.get("error_type").is_some_and(|value| !value.is_null()) {
        return true;
    }

    element_type_of(element).is_some_and(|element_type| element_type.contains("error"))
}

pub fn element_type_of(element: &CircuitElement) -> Option<&str> {
    str_field(element, "type")
}

fn str_field<'a>(element: &'a CircuitElement, field: &str) -> Option<&'a str> {
    element
        .get(field)
        .and_then(Value::as_str)
}
