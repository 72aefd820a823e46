use circuit_output::{CircuitElement, CircuitOutput};
use serde_json::{json, Value};
use serde_with::skip_serializing_none;

/// An error raised while executing user code, reported alongside the render result.
#[skip_serializing_none]
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ExecutionError {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl ExecutionError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    fn as_element(&self) -> CircuitElement {
        let mut element = json!({
            "type": "execution_error",
            "error_type": self.name,
            "name": self.name,
            "message": self.message,
        });
        if let (Some(stack), Some(object)) = (&self.stack, element.as_object_mut()) {
            object.insert("stack".to_string(), Value::String(stack.clone()));
        }
        element
    }
}

/// Emitted to the host once per completed render.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RenderCompletedPayload {
    pub has_execution_error: bool,
    /// The execution error (if any) first, then the error elements of the circuit output in output order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<CircuitElement>,
}

pub fn build_run_completed_payload(
    circuit_output: Option<&CircuitOutput>,
    execution_error: Option<&ExecutionError>,
) -> RenderCompletedPayload {
    let errors = execution_error
        .map(ExecutionError::as_element)
        .into_iter()
        .chain(
            circuit_output
                .into_iter()
                .flat_map(|circuit_output| circuit_output.error_elements())
                .cloned(),
        )
        .collect::<Vec<_>>();

    RenderCompletedPayload {
        has_execution_error: execution_error.is_some(),
        errors,
    }
}
